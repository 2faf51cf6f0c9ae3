//! Official caption strategy: the innertube player endpoint.
//!
//! Issues the player POST as one client identity, reads the caption track
//! list, then makes a secondary fetch of the chosen track as json3 cues.

use async_trait::async_trait;

use super::innertube::{ClientIdentity, InnertubeClient};
use super::tracks::{select_best_track, TrackInfo};
use super::TranscriptStrategy;
use crate::model::{Attempt, FetchRequest, Transcript};
use crate::parse;
use crate::Result;

pub struct PlayerStrategy {
    http: reqwest::Client,
    innertube: InnertubeClient,
    identity: ClientIdentity,
}

impl PlayerStrategy {
    pub fn new(http: reqwest::Client, identity: ClientIdentity) -> Self {
        Self {
            innertube: InnertubeClient::new(http.clone()),
            http,
            identity,
        }
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<Transcript> {
        let player = self
            .innertube
            .player(self.identity, &request.video_id)
            .await?;

        let raw_tracks = player
            .captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .map(|r| r.caption_tracks.as_slice())
            .unwrap_or_default();

        if raw_tracks.is_empty() {
            anyhow::bail!("Player response carried no caption tracks");
        }

        let tracks: Vec<TrackInfo> = raw_tracks
            .iter()
            .map(|t| TrackInfo {
                url: t.base_url.clone(),
                language_code: t.language_code.clone(),
                is_auto_generated: t.is_auto_generated(),
                label: t.label(),
            })
            .collect();

        let preferred = request.language_hint.as_deref().unwrap_or("en");
        let track = select_best_track(&tracks, preferred)
            .ok_or_else(|| anyhow::anyhow!("No usable caption track"))?;

        let response = self
            .http
            .get(&track.url)
            .query(&[("fmt", "json3")])
            .header("User-Agent", self.identity.user_agent())
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Caption track fetch returned HTTP {}", response.status());
        }

        let body = response.text().await?;
        let segments = parse::parse_json3(&body)?;
        if segments.is_empty() {
            anyhow::bail!("Caption track parsed to zero segments");
        }

        let duration = player
            .video_details
            .as_ref()
            .and_then(|d| d.length_seconds.as_deref())
            .and_then(|s| s.parse::<u64>().ok());

        Ok(Transcript::new(
            &request.video_id,
            &track.language_code,
            track.is_auto_generated,
            segments,
        )
        .with_title(player.video_details.and_then(|d| d.title))
        .with_duration(duration))
    }
}

#[async_trait]
impl TranscriptStrategy for PlayerStrategy {
    fn name(&self) -> &'static str {
        match self.identity {
            ClientIdentity::Web => "player_web",
            ClientIdentity::Android => "player_android",
            ClientIdentity::EmbeddedWeb => "player_embedded",
        }
    }

    async fn attempt(&self, request: &FetchRequest) -> Attempt {
        match self.try_fetch(request).await {
            Ok(transcript) => Attempt::Success(transcript),
            Err(e) => Attempt::failure(e.to_string()),
        }
    }
}
