use crate::model::Candidate;

pub fn is_valid_page_index(page_index: i64, page_count: usize) -> bool {
    page_index >= 0 && (page_index as u64) < page_count as u64
}

pub fn page_index_from_number(page_number: i64) -> i64 {
    page_number.saturating_sub(1)
}

pub fn checked_page_index(page_index: i64, page_count: usize) -> Option<usize> {
    if is_valid_page_index(page_index, page_count) {
        Some(page_index as usize)
    } else {
        None
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeSplit {
    pub valid: Vec<Candidate>,
    pub discarded: Vec<Candidate>,
}

pub fn split_by_range<I>(candidates: I, page_count: usize) -> RangeSplit
where
    I: IntoIterator<Item = Candidate>,
{
    let mut split = RangeSplit::default();
    for candidate in candidates {
        if is_valid_page_index(candidate.page_index, page_count) {
            split.valid.push(candidate);
        } else {
            split.discarded.push(candidate);
        }
    }
    split
}
