use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::headings::OutlineWalk;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::pdf::{PdfDocument, read_outline};
use crate::util::{file_name_string, now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.folder)?;

    if args.dry_run {
        info!(
            pdf_count = manifest.pdf_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.folder.join("pdf_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(pdf_count = manifest.pdf_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(folder: &Path) -> Result<PdfInventoryManifest> {
    let pdf_paths = discover_pdfs(folder)?;

    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", folder.display());
    }

    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        let filename = file_name_string(&path);
        let sha256 = sha256_file(&path)?;

        let entry = match describe_pdf(&path) {
            Ok((page_count, outline_entries)) => PdfEntry {
                filename,
                page_count: Some(page_count),
                outline_entries: Some(outline_entries),
                sha256,
                error: None,
            },
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "could not read PDF");
                PdfEntry {
                    filename,
                    page_count: None,
                    outline_entries: None,
                    sha256,
                    error: Some(format!("{error:#}")),
                }
            }
        };
        pdfs.push(entry);
    }

    pdfs.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: folder.display().to_string(),
        pdf_count: pdfs.len(),
        pdfs,
    })
}

fn describe_pdf(path: &Path) -> Result<(usize, usize)> {
    let document = PdfDocument::open(path)?;
    let nodes = read_outline(&document)?;
    Ok((document.page_count(), OutlineWalk::new(&nodes).count()))
}

pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries =
        fs::read_dir(folder).with_context(|| format!("failed to read {}", folder.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", folder.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    Ok(pdfs)
}
