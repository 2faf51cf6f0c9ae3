//! capfetch - Multi-strategy transcript fetcher for video references
//!
//! This library acquires timed transcripts for a video id or watch URL by trying
//! a configurable chain of acquisition strategies (official caption endpoints,
//! third-party mirrors, page scraping) and falling back to AWS Transcribe
//! speech-to-text when no caption track exists.

pub mod cli;
pub mod config;
pub mod limit;
pub mod model;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod strategies;
pub mod stt;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use model::{Attempt, FetchRequest, FetchResponse, Segment, Transcript};
pub use pipeline::TranscriptPipeline;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types the caller-facing interface must distinguish
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Unsupported video reference: {0}")]
    UnsupportedReference(String),

    #[error("No captions found for video {0}")]
    NoCaptions(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Payment session required for paid-tier features")]
    AuthorizationRequired,

    #[error("Transcription still running; poll job {job_id} separately")]
    SttPending { job_id: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
