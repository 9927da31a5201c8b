use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tracing::{info, warn};

use super::PdfDocument;

pub trait PageTextSource {
    fn page_count(&self) -> usize;

    fn page_text(&self, page_index: usize) -> Result<String>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TextBackend {
    Auto,
    Pdftotext,
    Lopdf,
}

impl TextBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Pdftotext => "pdftotext",
            Self::Lopdf => "lopdf",
        }
    }
}

pub fn open_text_source<'a>(
    document: &'a PdfDocument,
    backend: TextBackend,
) -> Result<Box<dyn PageTextSource + 'a>> {
    match backend {
        TextBackend::Lopdf => Ok(Box::new(LopdfPages { document })),
        TextBackend::Pdftotext => Ok(Box::new(PdftotextPages::extract(document)?)),
        TextBackend::Auto => {
            if !command_available("pdftotext") {
                warn!("pdftotext unavailable; falling back to lopdf text extraction");
                return Ok(Box::new(LopdfPages { document }));
            }

            match PdftotextPages::extract(document) {
                Ok(pages) => Ok(Box::new(pages)),
                Err(error) => {
                    warn!(
                        path = %document.path().display(),
                        error = %error,
                        "pdftotext failed; falling back to lopdf text extraction"
                    );
                    Ok(Box::new(LopdfPages { document }))
                }
            }
        }
    }
}

pub trait TextSourceFactory {
    fn open<'a>(&self, document: &'a PdfDocument) -> Result<Box<dyn PageTextSource + 'a>>;
}

impl TextSourceFactory for TextBackend {
    fn open<'a>(&self, document: &'a PdfDocument) -> Result<Box<dyn PageTextSource + 'a>> {
        open_text_source(document, *self)
    }
}

struct LopdfPages<'a> {
    document: &'a PdfDocument,
}

impl PageTextSource for LopdfPages<'_> {
    fn page_count(&self) -> usize {
        self.document.page_count()
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        let page_number = u32::try_from(page_index + 1).context("page index overflow")?;
        self.document
            .inner()
            .extract_text(&[page_number])
            .with_context(|| format!("lopdf could not extract text from page {page_number}"))
    }
}

struct PdftotextPages {
    pages: Vec<String>,
}

impl PdftotextPages {
    fn extract(document: &PdfDocument) -> Result<Self> {
        let path = document.path();
        let output = Command::new("pdftotext")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("failed to execute pdftotext for {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftotext returned non-zero exit status for {}: {}",
                path.display(),
                stderr.trim()
            );
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let pages = split_form_feed_pages(&raw, document.page_count());
        info!(
            path = %path.display(),
            pages = pages.len(),
            "extracted text layer with pdftotext"
        );

        Ok(Self { pages })
    }
}

impl PageTextSource for PdftotextPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.pages
            .get(page_index)
            .cloned()
            .with_context(|| format!("page index {page_index} out of range"))
    }
}

fn split_form_feed_pages(raw: &str, page_count: usize) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .take(page_count)
        .collect::<Vec<String>>();
    pages.resize(page_count, String::new());
    pages
}

fn command_available(program: &str) -> bool {
    Command::new(program).arg("-v").output().is_ok()
}

#[derive(Debug, Clone, Default)]
pub struct MarkedText {
    pub text: String,
    pub truncated: bool,
    pub failed_pages: Vec<usize>,
}

pub fn document_text_with_markers(source: &dyn PageTextSource, max_chars: usize) -> MarkedText {
    let mut marked = MarkedText::default();
    let mut used_chars = 0usize;

    for page_index in 0..source.page_count() {
        let body = match source.page_text(page_index) {
            Ok(text) => text,
            Err(error) => {
                warn!(page = page_index + 1, error = %error, "skipping page text");
                marked.failed_pages.push(page_index);
                continue;
            }
        };

        let block = format!("[Page {}]\n{}\n\n", page_index + 1, body.trim());
        let block_chars = block.chars().count();
        if used_chars + block_chars > max_chars {
            let remaining = max_chars.saturating_sub(used_chars);
            marked.text.extend(block.chars().take(remaining));
            marked.truncated = true;
            break;
        }

        used_chars += block_chars;
        marked.text.push_str(&block);
    }

    marked
}
