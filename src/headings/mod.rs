use tracing::warn;

use crate::model::Candidate;

mod mapping;
mod outline;
mod pattern;

pub use mapping::{MappingHeadings, TitleMapping, parse_title_mapping, resolve_mapping};
pub use outline::{OutlineHeadings, OutlineNode, OutlineWalk, PageRef, PageResolver};
pub use pattern::{PatternHeadings, PatternMatcher, PatternPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingItem {
    Found(Candidate),
    Skipped {
        page_index: Option<usize>,
        reason: String,
    },
}

pub trait HeadingSource {
    fn name(&self) -> &'static str;

    fn items(&self) -> Box<dyn Iterator<Item = HeadingItem> + '_>;
}

#[derive(Debug, Clone, Default)]
pub struct HeadingScan {
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<String>,
}

pub fn collect_candidates(source: &dyn HeadingSource) -> HeadingScan {
    let mut scan = HeadingScan::default();

    for item in source.items() {
        match item {
            HeadingItem::Found(candidate) => scan.candidates.push(candidate),
            HeadingItem::Skipped { page_index, reason } => {
                warn!(
                    source = source.name(),
                    page = page_index.map(|index| index + 1),
                    reason = %reason,
                    "heading source skipped an entry"
                );
                let message = match page_index {
                    Some(index) => format!("{}: page {}: {}", source.name(), index + 1, reason),
                    None => format!("{}: {}", source.name(), reason),
                };
                scan.warnings.push(message);
            }
        }
    }

    scan
}
