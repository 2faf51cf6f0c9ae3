use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::FetchError;
use std::path::PathBuf;
use std::time::Duration;

/// Names of the built-in caption strategies, in their default priority order.
/// The order is hand-tuned for reliability from a server IP and is expected
/// to be reshuffled via config as upstream behavior shifts.
pub const DEFAULT_STRATEGY_ORDER: &[&str] = &[
    "player_android",
    "player_web",
    "transcript_panel",
    "mirror",
    "page_scrape",
];

/// Every strategy name the chain builder accepts. The embedded-player client
/// survives some age/region gates but gets blocked more often from server
/// IPs, so it is valid in config without being part of the default order.
pub const KNOWN_STRATEGIES: &[&str] = &[
    "player_android",
    "player_web",
    "player_embedded",
    "transcript_panel",
    "mirror",
    "page_scrape",
];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ordered caption strategy names; STT is the gated terminal fallback and
    /// never appears here
    pub strategies: Vec<String>,

    /// Third-party mirror instances tried by the mirror strategy
    pub mirrors: Vec<String>,

    /// Upstream HTTP settings
    pub http: HttpConfig,

    /// Free-tier rate limiting
    pub rate_limit: RateLimitConfig,

    /// Speech-to-text fallback settings
    pub stt: SttConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout in seconds for every upstream request
    pub timeout_secs: u64,

    /// Browser-like user agent used for scraping and caption fetches
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per key per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// AWS region for Transcribe and S3
    pub region: String,

    /// S3 bucket used to stage audio for Transcribe
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,

    /// Seconds between job status polls
    pub poll_interval_secs: u64,

    /// Cumulative polling budget in seconds; on exhaustion the job id is
    /// returned for out-of-band polling
    pub poll_budget_secs: u64,

    /// Language code passed to Transcribe when the request has no hint
    pub default_language: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_STRATEGY_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mirrors: vec![
                "https://inv.nadeko.net".to_string(),
                "https://yewtu.be".to_string(),
                "https://invidious.nerdvpn.de".to_string(),
            ],
            http: HttpConfig {
                timeout_secs: 10,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            rate_limit: RateLimitConfig {
                max_requests: 10,
                window_secs: 60,
            },
            stt: SttConfig {
                region: "us-east-1".to_string(),
                s3_bucket: String::new(),
                s3_key_prefix: Some("capfetch/".to_string()),
                poll_interval_secs: 5,
                poll_budget_secs: 110,
                default_language: Some("en-US".to_string()),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("capfetch").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(FetchError::ConfigError(
                "At least one caption strategy must be configured".to_string(),
            )
            .into());
        }

        for name in &self.strategies {
            if !KNOWN_STRATEGIES.contains(&name.as_str()) {
                return Err(FetchError::ConfigError(format!(
                    "Unknown strategy '{}' (known: {})",
                    name,
                    KNOWN_STRATEGIES.join(", ")
                ))
                .into());
            }
        }

        if self.strategies.iter().any(|s| s == "mirror") && self.mirrors.is_empty() {
            return Err(FetchError::ConfigError(
                "Mirror strategy is enabled but no mirror instances are configured".to_string(),
            )
            .into());
        }

        if self.http.timeout_secs == 0 {
            return Err(FetchError::ConfigError("HTTP timeout must be non-zero".to_string()).into());
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(FetchError::ConfigError(
                "Rate limit window and request count must be non-zero".to_string(),
            )
            .into());
        }

        // The S3 bucket is only required when the STT fallback actually runs;
        // checked again at job submission time.
        Ok(())
    }

    /// Per-call timeout for upstream HTTP requests
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Strategy order: {}", self.strategies.join(" -> "));
        println!("  Mirrors: {}", self.mirrors.join(", "));
        println!("  HTTP timeout: {}s", self.http.timeout_secs);
        println!(
            "  Rate limit: {} requests / {}s",
            self.rate_limit.max_requests, self.rate_limit.window_secs
        );
        println!("  STT region: {}", self.stt.region);
        if self.stt.s3_bucket.is_empty() {
            println!("  STT bucket: (unset - STT fallback disabled)");
        } else {
            println!("  STT bucket: {}", self.stt.s3_bucket);
        }
        println!("  STT poll budget: {}s", self.stt.poll_budget_secs);
    }
}
