//! Mirror-API strategy: third-party Invidious-compatible instances.
//!
//! Instances come and go, so every per-instance error just moves on to the
//! next one; the strategy only fails once the whole list is exhausted.
//! Mirror caption fetches get one blanket retry because the public instances
//! are known-flaky under load.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::tracks::{select_best_track, TrackInfo};
use super::TranscriptStrategy;
use crate::model::{Attempt, FetchRequest, Transcript};
use crate::parse;

#[derive(Debug, Deserialize)]
struct MirrorCaptionList {
    #[serde(default)]
    captions: Vec<MirrorCaption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorCaption {
    label: Option<String>,
    language_code: String,
    url: String,
}

pub struct MirrorStrategy {
    http: reqwest::Client,
    instances: Vec<String>,
}

impl MirrorStrategy {
    pub fn new(http: reqwest::Client, instances: Vec<String>) -> Self {
        Self { http, instances }
    }

    async fn try_instance(&self, base: &str, request: &FetchRequest) -> Result<Transcript> {
        let base = base.trim_end_matches('/');
        let list_url = format!("{}/api/v1/captions/{}", base, request.video_id);

        let list: MirrorCaptionList = self
            .http
            .get(&list_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse mirror caption list")?;

        if list.captions.is_empty() {
            anyhow::bail!("Mirror listed no captions");
        }

        let tracks: Vec<TrackInfo> = list
            .captions
            .iter()
            .map(|c| TrackInfo {
                // Mirror caption URLs are instance-relative
                url: format!("{}{}", base, c.url),
                language_code: c.language_code.clone(),
                is_auto_generated: c
                    .label
                    .as_deref()
                    .map(|l| l.contains("auto-generated"))
                    .unwrap_or(false),
                label: c.label.clone(),
            })
            .collect();

        let preferred = request.language_hint.as_deref().unwrap_or("en");
        let track = select_best_track(&tracks, preferred)
            .ok_or_else(|| anyhow::anyhow!("No usable caption track"))?;

        let vtt = self.fetch_track_with_retry(&track.url).await?;
        let segments = parse::parse_vtt(&vtt);
        if segments.is_empty() {
            anyhow::bail!("Mirror caption content parsed to zero segments");
        }

        Ok(Transcript::new(
            &request.video_id,
            &track.language_code,
            track.is_auto_generated,
            segments,
        ))
    }

    async fn fetch_track_with_retry(&self, url: &str) -> Result<String> {
        match self.fetch_track(url).await {
            Ok(body) => Ok(body),
            Err(first) => {
                tracing::debug!("Mirror track fetch failed once, retrying: {}", first);
                self.fetch_track(url).await
            }
        }
    }

    async fn fetch_track(&self, url: &str) -> Result<String> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl TranscriptStrategy for MirrorStrategy {
    fn name(&self) -> &'static str {
        "mirror"
    }

    async fn attempt(&self, request: &FetchRequest) -> Attempt {
        let mut last_error = String::from("no mirror instances configured");

        for instance in &self.instances {
            match self.try_instance(instance, request).await {
                Ok(transcript) => return Attempt::Success(transcript),
                Err(e) => {
                    tracing::debug!("Mirror {} failed: {}", instance, e);
                    last_error = format!("{}: {}", instance, e);
                }
            }
        }

        Attempt::failure(format!("All mirror instances failed; last: {}", last_error))
    }
}
