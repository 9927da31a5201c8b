use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lopdf::{Document, ObjectId};
use thiserror::Error;

use crate::headings::{PageRef, PageResolver};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("input PDF not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open {} (corrupt or password-protected PDF)", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
}

pub struct PdfDocument {
    path: PathBuf,
    inner: Document,
    page_ids: Vec<ObjectId>,
    page_lookup: HashMap<ObjectId, usize>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        if !path.is_file() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }

        let inner = Document::load(path).map_err(|source| DocumentError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_document(path, inner))
    }

    pub fn from_document(path: impl Into<PathBuf>, inner: Document) -> Self {
        let pages: BTreeMap<u32, ObjectId> = inner.get_pages();
        let page_ids = pages.into_values().collect::<Vec<ObjectId>>();
        let page_lookup = page_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        Self {
            path: path.into(),
            inner,
            page_ids,
            page_lookup,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_id(&self, page_index: usize) -> Option<ObjectId> {
        self.page_ids.get(page_index).copied()
    }

    pub fn page_index_of(&self, id: ObjectId) -> Option<usize> {
        self.page_lookup.get(&id).copied()
    }

    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.inner
            .save(path)
            .with_context(|| format!("failed to write PDF: {}", path.display()))?;
        Ok(())
    }
}

impl PageResolver for PdfDocument {
    fn resolve(&self, target: &PageRef) -> Option<usize> {
        match target {
            PageRef::Object(number, generation) => self.page_index_of((*number, *generation)),
            PageRef::Named(_) | PageRef::Missing => None,
        }
    }
}
