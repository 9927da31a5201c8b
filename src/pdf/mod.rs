mod document;
mod outline;
mod text;
mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::{DocumentError, PdfDocument};
pub use outline::{inject_outline, read_outline};
pub use text::{PageTextSource, TextBackend, TextSourceFactory, document_text_with_markers};
pub use writer::{LopdfRangeWriter, PageRangeWriter};
