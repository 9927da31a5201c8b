use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::headings::PatternPolicy;
use crate::llm::{DEFAULT_ENDPOINT, DEFAULT_MAX_DOCUMENT_CHARS, DEFAULT_MODEL, LlmConfig};
use crate::pdf::TextBackend;

#[derive(Parser, Debug)]
#[command(
    name = "pdfsections",
    version,
    about = "Split PDFs into per-section files and add bookmarks from detected headings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Split(SplitArgs),
    Bookmark(BookmarkArgs),
    Inventory(InventoryArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SplitStrategy {
    Outline,
    Pattern,
    Llm,
}

impl SplitStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Pattern => "pattern",
            Self::Llm => "llm",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = SplitStrategy::Outline)]
    pub strategy: SplitStrategy,

    #[arg(long, value_enum, default_value_t = PatternPolicy::Strict)]
    pub pattern: PatternPolicy,

    #[arg(long)]
    pub regex: Option<String>,

    #[arg(long, value_enum, default_value_t = TextBackend::Auto)]
    pub text_backend: TextBackend,

    #[arg(long)]
    pub front_matter_title: Option<String>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BookmarkArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub replace: bool,

    #[arg(long, value_enum, default_value_t = TextBackend::Auto)]
    pub text_backend: TextBackend,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub folder: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub llm_endpoint: String,

    #[arg(long, default_value_t = 180)]
    pub llm_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_DOCUMENT_CHARS)]
    pub max_document_chars: usize,
}

impl LlmArgs {
    pub fn to_config(&self) -> LlmConfig {
        let mut config = LlmConfig::new(self.api_key.clone().unwrap_or_default());
        config.model = self.model.clone();
        config.endpoint = self.llm_endpoint.clone();
        config.timeout = Duration::from_secs(self.llm_timeout_secs);
        config.max_document_chars = self.max_document_chars;
        config
    }
}
