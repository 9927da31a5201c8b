use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use regex::Regex;

use super::{HeadingItem, HeadingSource};
use crate::model::Candidate;
use crate::pdf::PageTextSource;

const CONTEXT_MAX_CHARS: usize = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PatternPolicy {
    Strict,
    Contextual,
    Generic,
    Custom,
}

impl PatternPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Contextual => "contextual",
            Self::Generic => "generic",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    policy: PatternPolicy,
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(policy: PatternPolicy, custom: Option<&str>) -> Result<Self> {
        let regex = match policy {
            PatternPolicy::Strict => Regex::new(
                r"(?i)^\s*(?:PART\s+(?:[IVXLCDM]+\b|\d+\b)|Chapter\s+\d+\b)(.{0,100})$",
            )
            .context("failed to compile strict heading regex")?,
            PatternPolicy::Contextual => {
                Regex::new(r"(?im)^[ \t]*(PART\s+(?:[IVXLCDM]+\b|\d+\b)|Chapter\s+\d+\b)")
                    .context("failed to compile contextual heading regex")?
            }
            PatternPolicy::Generic => {
                Regex::new(r"(?i)^(?:PART\s+\d+|Chapter\s+\d+|[A-Za-z]+(?:\s+[A-Za-z]+)*$)")
                    .context("failed to compile generic heading regex")?
            }
            PatternPolicy::Custom => {
                let Some(raw) = custom.map(str::trim).filter(|value| !value.is_empty()) else {
                    bail!("custom heading pattern requires --regex");
                };
                Regex::new(raw).with_context(|| format!("invalid heading regex: {raw}"))?
            }
        };

        Ok(Self { policy, regex })
    }

    pub fn policy(&self) -> PatternPolicy {
        self.policy
    }

    pub fn find_heading(&self, page_text: &str) -> Option<String> {
        match self.policy {
            PatternPolicy::Contextual => self.find_contextual(page_text),
            PatternPolicy::Strict => page_text.lines().map(str::trim).find_map(|line| {
                self.regex
                    .find(line)
                    .map(|found| found.as_str().trim().to_string())
            }),
            PatternPolicy::Generic => page_text
                .lines()
                .map(str::trim)
                .find(|line| self.regex.is_match(line))
                .map(ToOwned::to_owned),
            PatternPolicy::Custom => page_text.lines().map(str::trim).find_map(|line| {
                let captures = self.regex.captures(line)?;
                let title = captures
                    .name("title")
                    .map(|value| value.as_str().trim())
                    .filter(|value| !value.is_empty())
                    .unwrap_or(line);
                Some(title.to_string())
            }),
        }
    }

    fn find_contextual(&self, page_text: &str) -> Option<String> {
        let found = self.regex.find(page_text)?;
        let prefix = found.as_str().trim();
        let rest = page_text[found.end()..].trim();

        match leading_description(rest) {
            Some(description) => Some(format!("{} {}", prefix, description)),
            None => Some(prefix.to_string()),
        }
    }
}

fn leading_description(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let end = match text.char_indices().nth(CONTEXT_MAX_CHARS) {
        None => text.len(),
        Some((limit, _)) if text.as_bytes()[limit] == b'\n' => limit,
        Some((limit, _)) => text[..limit].rfind('\n').filter(|index| *index > 0)?,
    };

    let collapsed = text[..end].split_whitespace().collect::<Vec<&str>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub struct PatternHeadings<'a> {
    pages: &'a dyn PageTextSource,
    matcher: &'a PatternMatcher,
}

impl<'a> PatternHeadings<'a> {
    pub fn new(pages: &'a dyn PageTextSource, matcher: &'a PatternMatcher) -> Self {
        Self { pages, matcher }
    }
}

impl HeadingSource for PatternHeadings<'_> {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn items(&self) -> Box<dyn Iterator<Item = HeadingItem> + '_> {
        Box::new(
            (0..self.pages.page_count()).filter_map(move |page_index| {
                match self.pages.page_text(page_index) {
                    Ok(text) => self
                        .matcher
                        .find_heading(&text)
                        .map(|title| HeadingItem::Found(Candidate::new(title, page_index as i64))),
                    Err(error) => Some(HeadingItem::Skipped {
                        page_index: Some(page_index),
                        reason: format!("text extraction failed: {error:#}"),
                    }),
                }
            }),
        )
    }
}
