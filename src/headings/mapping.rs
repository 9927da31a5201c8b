use serde_json::Value;
use thiserror::Error;

use super::{HeadingItem, HeadingSource};
use crate::model::Candidate;
use crate::pages::{checked_page_index, page_index_from_number};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub title: String,
    pub page_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleMapping {
    pub entries: Vec<MappingEntry>,
    pub malformed: Vec<String>,
}

impl TitleMapping {
    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(title, page_number)| MappingEntry {
                    title: title.to_string(),
                    page_number,
                })
                .collect(),
            malformed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("model response is not a title/page mapping: {reason}")]
pub struct UnparseableResponse {
    pub reason: String,
}

pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(index) => &rest[index + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_title_mapping(raw: &str) -> Result<TitleMapping, UnparseableResponse> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body).map_err(|error| UnparseableResponse {
        reason: error.to_string(),
    })?;

    let mut mapping = TitleMapping::default();
    match value {
        Value::Object(map) => {
            for (title, page) in map {
                push_entry(&mut mapping, title, &page);
            }
        }
        Value::Array(items) => {
            for item in items {
                let title = item
                    .get("title")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned);
                let page = item.get("page").or_else(|| item.get("page_number"));
                match (title, page) {
                    (Some(title), Some(page)) => push_entry(&mut mapping, title, page),
                    _ => mapping.malformed.push(item.to_string()),
                }
            }
        }
        other => {
            return Err(UnparseableResponse {
                reason: format!("expected a JSON object or array, found {}", json_kind(&other)),
            });
        }
    }

    Ok(mapping)
}

fn push_entry(mapping: &mut TitleMapping, title: String, page: &Value) {
    let title = title.trim().to_string();
    match page_number_from_value(page) {
        Some(page_number) if !title.is_empty() => {
            mapping.entries.push(MappingEntry { title, page_number })
        }
        _ => mapping.malformed.push(format!("{title:?}: {page}")),
    }
}

fn page_number_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConversion {
    pub applied: Vec<(String, usize)>,
    pub discarded: Vec<MappingEntry>,
}

pub fn resolve_mapping(mapping: &TitleMapping, page_count: usize) -> MappingConversion {
    let mut conversion = MappingConversion::default();
    for entry in &mapping.entries {
        match checked_page_index(page_index_from_number(entry.page_number), page_count) {
            Some(page_index) => conversion.applied.push((entry.title.clone(), page_index)),
            None => conversion.discarded.push(entry.clone()),
        }
    }
    conversion
}

pub struct MappingHeadings {
    mapping: TitleMapping,
    page_count: usize,
}

impl MappingHeadings {
    pub fn new(mapping: TitleMapping, page_count: usize) -> Self {
        Self {
            mapping,
            page_count,
        }
    }
}

impl HeadingSource for MappingHeadings {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn items(&self) -> Box<dyn Iterator<Item = HeadingItem> + '_> {
        let malformed = self.mapping.malformed.iter().map(|raw| HeadingItem::Skipped {
            page_index: None,
            reason: format!("malformed mapping entry {raw}"),
        });

        let entries = self.mapping.entries.iter().map(|entry| {
            match checked_page_index(page_index_from_number(entry.page_number), self.page_count) {
                Some(page_index) => {
                    HeadingItem::Found(Candidate::new(entry.title.clone(), page_index as i64))
                }
                None => HeadingItem::Skipped {
                    page_index: None,
                    reason: format!(
                        "'{}' points at page {} outside 1..={}",
                        entry.title, entry.page_number, self.page_count
                    ),
                },
            }
        });

        Box::new(malformed.chain(entries))
    }
}
