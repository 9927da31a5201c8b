use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::headings::{TitleMapping, parse_title_mapping};
use crate::pdf::{PageTextSource, document_text_with_markers};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 400_000;

const SYSTEM_PROMPT: &str = "You are a document analysis assistant. Extract every chapter title, \
section heading and subheading from the document and list each with the page number it starts on. \
The text marks the start of every page with a line of the form [Page N]; use those numbers. \
Respond with a single JSON object whose keys are the titles exactly as written and whose values \
are integer page numbers, for example {\"Chapter 1: Introduction\": 1, \"1.1 A new beginning\": 2}.";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_document_chars: usize,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(180),
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

pub trait TitlePageInference {
    fn model(&self) -> &str;

    fn infer(&self, document_text: &str) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }

    fn joined_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

pub struct GeminiClient {
    config: LlmConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("LLM strategy requires an API key (--api-key or GEMINI_API_KEY)");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { config, client })
    }
}

impl TitlePageInference for GeminiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn infer(&self, document_text: &str) -> Result<String> {
        let prompt = format!(
            "Analyze the following document and return the JSON object of titles and page numbers.\n\n{}",
            document_text
        );
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                response_mime_type: "application/json",
            },
        };

        info!(
            model = %self.config.model,
            chars = document_text.chars().count(),
            "requesting title/page mapping"
        );

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .context("failed to call generateContent")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            bail!("generateContent returned {}: {}", status, body);
        }

        let parsed: GenerateResponse = response
            .json()
            .context("failed to decode generateContent response")?;
        if let Some(reason) = parsed.block_reason() {
            warn!(model = %self.config.model, reason, "generateContent blocked the prompt");
        }
        match parsed.joined_text() {
            Some(text) => Ok(text),
            None => {
                warn!(model = %self.config.model, "generateContent response contained no text");
                Ok(String::new())
            }
        }
    }
}

pub fn infer_mapping(inference: &dyn TitlePageInference, document_text: &str) -> Result<TitleMapping> {
    let raw = inference.infer(document_text)?;

    match parse_title_mapping(&raw) {
        Ok(mapping) => {
            info!(
                entries = mapping.entries.len(),
                malformed = mapping.malformed.len(),
                "parsed title/page mapping"
            );
            Ok(mapping)
        }
        Err(error) => {
            warn!(
                model = inference.model(),
                error = %error,
                "treating unparseable model response as an empty mapping"
            );
            Ok(TitleMapping::default())
        }
    }
}

pub fn infer_document_mapping(
    pages: &dyn PageTextSource,
    inference: &dyn TitlePageInference,
    max_document_chars: usize,
) -> Result<TitleMapping> {
    let marked = document_text_with_markers(pages, max_document_chars);
    if marked.truncated {
        warn!(
            max_document_chars,
            "document text truncated before sending to the model"
        );
    }
    if marked.text.trim().is_empty() {
        warn!(
            pages = pages.page_count(),
            failed_pages = marked.failed_pages.len(),
            "no page text to send to the model"
        );
        return Ok(TitleMapping::default());
    }

    infer_mapping(inference, &marked.text)
}
