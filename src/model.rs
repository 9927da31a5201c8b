use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub page_index: i64,
}

impl Candidate {
    pub fn new(title: impl Into<String>, page_index: i64) -> Self {
        Self {
            title: title.into(),
            page_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub start_page: usize,
    pub end_page: usize,
}

impl Section {
    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRecord {
    pub title: String,
    pub start_page: usize,
    pub end_page: usize,
    pub first_page_number: usize,
    pub last_page_number: usize,
    pub output_path: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitRunReport {
    pub report_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub output_dir: String,
    pub strategy: String,
    pub page_count: usize,
    pub status: String,
    pub dry_run: bool,
    pub sections: Vec<SectionRecord>,
    pub skipped_sections: Vec<Section>,
    pub discarded_candidates: Vec<Candidate>,
    pub duplicate_candidates: Vec<Candidate>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkDocumentRecord {
    pub path: String,
    pub output_path: Option<String>,
    pub status: String,
    pub entries_added: usize,
    pub entries_discarded: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkRunReport {
    pub report_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_path: String,
    pub model: String,
    pub document_count: usize,
    pub updated_count: usize,
    pub empty_count: usize,
    pub failed_count: usize,
    pub documents: Vec<BookmarkDocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub page_count: Option<usize>,
    pub outline_entries: Option<usize>,
    pub sha256: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}
