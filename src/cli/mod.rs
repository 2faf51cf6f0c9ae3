use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::AccessTier;

#[derive(Parser)]
#[command(
    name = "capfetch",
    about = "capfetch - Fetch video transcripts through a chain of caption strategies with an STT fallback",
    version,
    long_about = "Fetches a timed transcript for a video id or watch URL by trying official caption \
endpoints, third-party mirrors and page scraping in configurable priority order, falling back to \
AWS Transcribe speech-to-text on the paid tier when no caption track exists."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a transcript for a video id or watch URL
    Fetch {
        /// Video id (11 characters) or any recognized watch URL
        #[arg(value_name = "ID_OR_URL")]
        reference: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Preferred caption language code (defaults to English)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Access tier; paid unlocks the STT fallback and skips rate limiting
        #[arg(long, value_enum, default_value = "free")]
        tier: Tier,

        /// Payment session token (required for --tier paid)
        #[arg(long, value_name = "TOKEN")]
        session: Option<String>,

        /// Allow the speech-to-text fallback when no captions exist (paid tier)
        #[arg(long)]
        stt: bool,

        /// Rate-limit key, e.g. the originating client IP
        #[arg(long, value_name = "KEY")]
        client_key: Option<String>,

        /// Include timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// Show the configured strategy chain in priority order
    Strategies,

    /// Show or scaffold configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Tier {
    /// Single free-tier use: rate limited, no STT
    Free,
    /// Paid/bulk use: session-verified, STT available
    Paid,
}

impl From<Tier> for AccessTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Free => AccessTier::Free,
            Tier::Paid => AccessTier::Paid,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// JSON object with segments and the source tag
    Json,
    /// Plain text, one segment per line
    Text,
    /// SRT subtitle format
    Srt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Srt => write!(f, "srt"),
        }
    }
}
