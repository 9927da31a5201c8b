use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::PdfDocument;
use super::outline::strip_outline;
use crate::model::Section;

pub trait PageRangeWriter {
    fn write_range(&self, section: &Section, output_path: &Path) -> Result<()>;
}

pub struct LopdfRangeWriter<'a> {
    source: &'a PdfDocument,
}

impl<'a> LopdfRangeWriter<'a> {
    pub fn new(source: &'a PdfDocument) -> Self {
        Self { source }
    }
}

impl PageRangeWriter for LopdfRangeWriter<'_> {
    fn write_range(&self, section: &Section, output_path: &Path) -> Result<()> {
        let page_count = self.source.page_count();
        if section.start_page >= section.end_page || section.end_page > page_count {
            bail!(
                "invalid page range {}..{} for a {}-page document",
                section.start_page,
                section.end_page,
                page_count
            );
        }

        let mut doc = self.source.inner().clone();
        let first_kept = section.start_page as u32 + 1;
        let last_kept = section.end_page as u32;
        let doomed = (1..=page_count as u32)
            .filter(|page_number| *page_number < first_kept || *page_number > last_kept)
            .collect::<Vec<u32>>();

        if !doomed.is_empty() {
            doc.delete_pages(&doomed);
        }
        strip_outline(&mut doc)?;
        let pruned = doc.prune_objects();
        debug!(
            removed_pages = doomed.len(),
            pruned_objects = pruned.len(),
            "prepared section document"
        );

        doc.save(output_path)
            .with_context(|| format!("failed to write section PDF: {}", output_path.display()))?;
        Ok(())
    }
}
