use std::collections::HashSet;

use tracing::{debug, info};

use crate::model::{Candidate, Section};
use crate::pages::split_by_range;

const END_OF_DOCUMENT: &str = "END_OF_DOCUMENT";

#[derive(Debug, Clone, Default)]
pub struct PartitionOptions {
    pub front_matter_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionLog {
    pub discarded: Vec<Candidate>,
    pub duplicates: Vec<Candidate>,
    pub skipped: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    Sections {
        sections: Vec<Section>,
        log: PartitionLog,
    },
    NoSectionsFound {
        log: PartitionLog,
    },
}

impl PartitionOutcome {
    pub fn sections(&self) -> &[Section] {
        match self {
            Self::Sections { sections, .. } => sections,
            Self::NoSectionsFound { .. } => &[],
        }
    }

    pub fn log(&self) -> &PartitionLog {
        match self {
            Self::Sections { log, .. } | Self::NoSectionsFound { log } => log,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoSectionsFound { .. })
    }
}

pub fn partition<I>(candidates: I, page_count: usize) -> PartitionOutcome
where
    I: IntoIterator<Item = Candidate>,
{
    partition_with(candidates, page_count, &PartitionOptions::default())
}

pub fn partition_with<I>(
    candidates: I,
    page_count: usize,
    options: &PartitionOptions,
) -> PartitionOutcome
where
    I: IntoIterator<Item = Candidate>,
{
    let mut log = PartitionLog::default();

    let range = split_by_range(candidates, page_count);
    for candidate in &range.discarded {
        info!(
            title = %candidate.title,
            page_index = candidate.page_index,
            page_count,
            "discarding out-of-range heading"
        );
    }
    log.discarded = range.discarded;

    let mut seen_pages = HashSet::<i64>::new();
    let mut boundaries = Vec::<Candidate>::with_capacity(range.valid.len() + 2);
    for candidate in range.valid {
        if seen_pages.insert(candidate.page_index) {
            boundaries.push(candidate);
        } else {
            debug!(
                title = %candidate.title,
                page_index = candidate.page_index,
                "dropping second heading on the same page"
            );
            log.duplicates.push(candidate);
        }
    }

    if boundaries.is_empty() {
        return PartitionOutcome::NoSectionsFound { log };
    }

    boundaries.sort_by_key(|candidate| candidate.page_index);

    if let Some(title) = options.front_matter_title.as_deref() {
        if boundaries[0].page_index > 0 {
            boundaries.insert(0, Candidate::new(title, 0));
        }
    }

    boundaries.push(Candidate::new(END_OF_DOCUMENT, page_count as i64));

    let mut sections = Vec::<Section>::with_capacity(boundaries.len() - 1);
    for pair in boundaries.windows(2) {
        let section = Section {
            title: pair[0].title.clone(),
            start_page: pair[0].page_index as usize,
            end_page: pair[1].page_index as usize,
        };

        if section.end_page <= section.start_page {
            info!(
                title = %section.title,
                first_page = section.start_page + 1,
                end_page = section.end_page,
                "skipping empty section"
            );
            log.skipped.push(section);
            continue;
        }

        sections.push(section);
    }

    if sections.is_empty() {
        return PartitionOutcome::NoSectionsFound { log };
    }

    PartitionOutcome::Sections { sections, log }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(items: &[(&str, i64)]) -> Vec<Candidate> {
        items
            .iter()
            .map(|(title, page)| Candidate::new(*title, *page))
            .collect()
    }

    fn triples(sections: &[Section]) -> Vec<(&str, usize, usize)> {
        sections
            .iter()
            .map(|section| (section.title.as_str(), section.start_page, section.end_page))
            .collect()
    }

    fn assert_valid_partition(sections: &[Section], page_count: usize) {
        for section in sections {
            assert!(section.start_page < section.end_page);
            assert!(section.end_page <= page_count);
        }
        for pair in sections.windows(2) {
            assert_eq!(pair[0].end_page, pair[1].start_page);
        }
        if let Some(last) = sections.last() {
            assert_eq!(last.end_page, page_count);
        }
    }

    #[test]
    fn parts_and_chapters_partition_the_document() {
        let outcome = partition(
            candidates(&[
                ("PART I", 0),
                ("PART I extra", 0),
                ("Chapter 1", 3),
                ("Chapter 2", 7),
            ]),
            10,
        );

        assert_eq!(
            triples(outcome.sections()),
            vec![("PART I", 0, 3), ("Chapter 1", 3, 7), ("Chapter 2", 7, 10)]
        );
        assert_eq!(outcome.log().duplicates, candidates(&[("PART I extra", 0)]));
    }

    #[test]
    fn empty_candidate_list_finds_nothing() {
        let outcome = partition(Vec::new(), 5);
        assert!(outcome.is_empty());
        assert!(outcome.sections().is_empty());
    }

    #[test]
    fn first_heading_on_a_page_wins() {
        let outcome = partition(candidates(&[("A", 0), ("B", 0), ("C", 4)]), 5);
        assert_eq!(triples(outcome.sections()), vec![("A", 0, 4), ("C", 4, 5)]);
    }

    #[test]
    fn out_of_range_only_is_no_sections_not_whole_document() {
        let outcome = partition(candidates(&[("Ghost", 12), ("Negative", -1)]), 5);

        assert!(outcome.is_empty());
        assert_eq!(outcome.log().discarded.len(), 2);
    }

    #[test]
    fn unsorted_input_is_sorted_with_first_seen_title_per_page() {
        let outcome = partition(
            candidates(&[("Ch 3", 8), ("Ch 1", 2), ("Ch 2", 5), ("Ch 1 again", 2)]),
            12,
        );

        assert_eq!(
            triples(outcome.sections()),
            vec![("Ch 1", 2, 5), ("Ch 2", 5, 8), ("Ch 3", 8, 12)]
        );
        assert_valid_partition(outcome.sections(), 12);
    }

    #[test]
    fn duplicate_pages_do_not_depend_on_sort_position() {
        let outcome = partition(candidates(&[("late", 4), ("x", 1), ("late dup", 4)]), 6);
        assert_eq!(triples(outcome.sections()), vec![("x", 1, 4), ("late", 4, 6)]);
    }

    #[test]
    fn last_page_heading_yields_single_page_section() {
        let outcome = partition(candidates(&[("Intro", 0), ("Index", 9)]), 10);
        assert_eq!(
            triples(outcome.sections()),
            vec![("Intro", 0, 9), ("Index", 9, 10)]
        );
    }

    #[test]
    fn zero_page_document_has_no_sections() {
        let outcome = partition(candidates(&[("Anything", 0)]), 0);
        assert!(outcome.is_empty());
        assert_eq!(outcome.log().discarded.len(), 1);
    }

    #[test]
    fn front_matter_section_is_prepended_when_requested() {
        let options = PartitionOptions {
            front_matter_title: Some("Front Matter".to_string()),
        };
        let outcome = partition_with(candidates(&[("Chapter 1", 3)]), 8, &options);

        assert_eq!(
            triples(outcome.sections()),
            vec![("Front Matter", 0, 3), ("Chapter 1", 3, 8)]
        );
    }

    #[test]
    fn front_matter_is_not_added_when_first_heading_is_on_first_page() {
        let options = PartitionOptions {
            front_matter_title: Some("Front Matter".to_string()),
        };
        let outcome = partition_with(candidates(&[("Cover", 0), ("Body", 2)]), 4, &options);

        assert_eq!(triples(outcome.sections()), vec![("Cover", 0, 2), ("Body", 2, 4)]);
    }

    #[test]
    fn generated_inputs_always_form_valid_partitions() {
        let mut state = 0x2545_f491_u64;
        for round in 0..200 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let page_count = (state % 40) as usize;
            let count = (state >> 8) % 12;

            let mut input = Vec::new();
            for index in 0..count {
                let raw = ((state >> (index % 48)) % 50) as i64 - 5;
                input.push(Candidate::new(format!("h{}-{}", round, index), raw));
            }

            let outcome = partition(input.clone(), page_count);
            assert_valid_partition(outcome.sections(), page_count);

            let mut first_per_page = Vec::<i64>::new();
            for candidate in &input {
                if candidate.page_index >= 0
                    && (candidate.page_index as usize) < page_count
                    && !first_per_page.contains(&candidate.page_index)
                {
                    first_per_page.push(candidate.page_index);
                }
            }
            assert_eq!(outcome.sections().len(), first_per_page.len());
        }
    }
}
