use async_trait::async_trait;

pub mod innertube;
pub mod mirror;
pub mod panel;
pub mod player;
pub mod scrape;
pub mod tracks;

use crate::config::Config;
use crate::model::{Attempt, FetchRequest};
use crate::Result;

/// One independent method of acquiring a transcript.
///
/// Implementations catch their own errors and report them as
/// `Attempt::Failure`; nothing crosses the orchestrator boundary as an Err or
/// a panic. The chain treats every failure as non-fatal and advances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Stable name used for the `source` tag, config ordering and logs
    fn name(&self) -> &'static str;

    /// Try to acquire a transcript for the request
    async fn attempt(&self, request: &FetchRequest) -> Attempt;
}

/// Build the ordered strategy chain from the configured name list.
///
/// The order is an empirically tuned priority list, not derived; reordering
/// it is a config change, not a code change.
pub fn build_chain(
    config: &Config,
    http: &reqwest::Client,
) -> Result<Vec<Box<dyn TranscriptStrategy>>> {
    use innertube::ClientIdentity;

    config
        .strategies
        .iter()
        .map(|name| -> Result<Box<dyn TranscriptStrategy>> {
            match name.as_str() {
                "player_android" => Ok(Box::new(player::PlayerStrategy::new(
                    http.clone(),
                    ClientIdentity::Android,
                ))),
                "player_web" => Ok(Box::new(player::PlayerStrategy::new(
                    http.clone(),
                    ClientIdentity::Web,
                ))),
                "player_embedded" => Ok(Box::new(player::PlayerStrategy::new(
                    http.clone(),
                    ClientIdentity::EmbeddedWeb,
                ))),
                "transcript_panel" => Ok(Box::new(panel::TranscriptPanelStrategy::new(
                    http.clone(),
                ))),
                "mirror" => Ok(Box::new(mirror::MirrorStrategy::new(
                    http.clone(),
                    config.mirrors.clone(),
                ))),
                "page_scrape" => Ok(Box::new(scrape::PageScrapeStrategy::new(
                    http.clone(),
                    config.http.user_agent.clone(),
                ))),
                other => Err(crate::FetchError::ConfigError(format!(
                    "Unknown strategy '{}'",
                    other
                ))
                .into()),
            }
        })
        .collect()
}
