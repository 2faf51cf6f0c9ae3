//! Speech-to-text fallback: AWS Transcribe over a staged audio stream.
//!
//! Only runs after every caption strategy has failed. The audio stream URL is
//! resolved from the innertube player API (android identity returns unciphered
//! URLs), downloaded to a temp file, staged in S3 (Transcribe consumes S3
//! URIs), and submitted as an asynchronous job. Polling is bounded by a
//! wall-clock budget; on exhaustion the job id is handed back to the caller
//! for out-of-band polling.

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::SttConfig;
use crate::model::{Attempt, FetchRequest};
use crate::strategies::innertube::{ClientIdentity, InnertubeClient, PlayerResponse};

pub mod processor;

/// STT fallback runner holding the AWS clients and staging state
pub struct SttFallback {
    config: SttConfig,
    http: reqwest::Client,
    innertube: InnertubeClient,
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    temp_dir: TempDir,
}

impl SttFallback {
    pub async fn new(config: SttConfig, http: reqwest::Client) -> Result<Self> {
        if config.s3_bucket.is_empty() {
            return Err(crate::FetchError::ConfigError(
                "STT fallback requires an S3 bucket in config".to_string(),
            )
            .into());
        }

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let s3_client = S3Client::new(&aws_config);
        let transcribe_client = TranscribeClient::new(&aws_config);

        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        Ok(Self {
            innertube: InnertubeClient::new(http.clone()),
            config,
            http,
            s3_client,
            transcribe_client,
            temp_dir,
        })
    }

    /// Run the full fallback. Internal errors become `Attempt::Failure` so the
    /// orchestrator boundary stays exception-free.
    pub async fn run(&self, request: &FetchRequest) -> Attempt {
        match self.try_transcribe(request).await {
            Ok(outcome) => outcome,
            Err(e) => Attempt::failure(format!("STT fallback failed: {}", e)),
        }
    }

    async fn try_transcribe(&self, request: &FetchRequest) -> Result<Attempt> {
        let player = self
            .innertube
            .player(ClientIdentity::Android, &request.video_id)
            .await?;

        let audio_url = resolve_audio_url(&player)
            .ok_or_else(|| anyhow::anyhow!("No direct audio stream available"))?;

        let audio_path = self.download_audio(&audio_url, &request.video_id).await?;
        let s3_key = self.upload_to_s3(&audio_path).await?;

        let language = request
            .language_hint
            .clone()
            .or_else(|| self.config.default_language.clone());
        let job_id = self.start_transcription_job(&s3_key, language.as_deref()).await?;

        let outcome = processor::SttProcessor::new(
            self.transcribe_client.clone(),
            self.http.clone(),
            job_id,
            self.config.poll_interval_secs,
            self.config.poll_budget_secs,
        )
        .poll(&request.video_id, player.video_details.as_ref())
        .await;

        // Staged audio is only needed while the job may still start; leave it
        // in place for deferred jobs, Transcribe reads it after we return.
        if matches!(outcome, Ok(Attempt::Success(_)) | Err(_)) {
            self.cleanup_s3(&s3_key).await;
        }

        outcome
    }

    /// Download the audio stream to a temporary file
    async fn download_audio(&self, url: &str, video_id: &str) -> Result<PathBuf> {
        let filename = format!("audio_{}_{}.m4a", video_id, &Uuid::new_v4().to_string()[..8]);
        let audio_path = self.temp_dir.path().join(filename);

        tracing::info!("Downloading audio stream to {}", audio_path.display());

        let response = self
            .http
            .get(url)
            .header("User-Agent", ClientIdentity::Android.user_agent())
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Audio stream fetch returned HTTP {}", response.status());
        }

        let mut file = fs_err::File::create(&audio_path)?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        use std::io::Write;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
        }

        Ok(audio_path)
    }

    /// Upload the staged audio file to S3
    async fn upload_to_s3(&self, audio_path: &Path) -> Result<String> {
        let key = format!(
            "{}audio_{}_{}.m4a",
            self.config.s3_key_prefix.as_deref().unwrap_or(""),
            Uuid::new_v4(),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        );

        tracing::info!("Staging audio at s3://{}/{}", self.config.s3_bucket, key);

        let content = fs_err::read(audio_path)?;

        self.s3_client
            .put_object()
            .bucket(&self.config.s3_bucket)
            .key(&key)
            .body(content.into())
            .content_type("audio/mp4")
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    /// Start the asynchronous transcription job
    async fn start_transcription_job(
        &self,
        s3_key: &str,
        language: Option<&str>,
    ) -> Result<String> {
        let job_name = format!("capfetch_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.config.s3_bucket, s3_key);

        tracing::info!("Starting transcription job {}", job_name);

        let media = Media::builder().media_file_uri(media_uri).build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(MediaFormat::Mp4)
            .media(media);

        if let Some(lang) = language {
            job_builder = job_builder.language_code(lang.parse()?);
        } else {
            job_builder = job_builder.identify_language(true);
        }

        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    /// Best-effort removal of the staged object
    async fn cleanup_s3(&self, s3_key: &str) {
        tracing::debug!("Cleaning up S3 object {}", s3_key);

        if let Err(e) = self
            .s3_client
            .delete_object()
            .bucket(&self.config.s3_bucket)
            .key(s3_key)
            .send()
            .await
        {
            tracing::warn!("Failed to clean up S3 object {}: {}", s3_key, e);
        }
    }
}

/// Pick the highest-bitrate audio-only adaptive format with a direct URL.
fn resolve_audio_url(player: &PlayerResponse) -> Option<String> {
    player
        .streaming_data
        .as_ref()?
        .adaptive_formats
        .iter()
        .filter(|f| f.mime_type.starts_with("audio/"))
        .filter(|f| f.url.is_some())
        .max_by_key(|f| f.bitrate.unwrap_or(0))
        .and_then(|f| f.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::innertube::{AdaptiveFormat, StreamingData};

    fn player_with_formats(formats: Vec<AdaptiveFormat>) -> PlayerResponse {
        PlayerResponse {
            video_details: None,
            captions: None,
            playability_status: None,
            streaming_data: Some(StreamingData {
                adaptive_formats: formats,
            }),
        }
    }

    fn format(mime: &str, bitrate: u64, url: Option<&str>) -> AdaptiveFormat {
        AdaptiveFormat {
            mime_type: mime.to_string(),
            bitrate: Some(bitrate),
            url: url.map(|u| u.to_string()),
        }
    }

    #[test]
    fn test_picks_highest_bitrate_audio() {
        let player = player_with_formats(vec![
            format("audio/mp4; codecs=\"mp4a.40.2\"", 48_000, Some("https://a/low")),
            format("audio/mp4; codecs=\"mp4a.40.2\"", 128_000, Some("https://a/high")),
            format("video/mp4; codecs=\"avc1\"", 2_000_000, Some("https://v/ignored")),
        ]);
        assert_eq!(resolve_audio_url(&player).as_deref(), Some("https://a/high"));
    }

    #[test]
    fn test_skips_ciphered_formats() {
        let player = player_with_formats(vec![
            format("audio/webm; codecs=\"opus\"", 160_000, None),
            format("audio/mp4; codecs=\"mp4a.40.2\"", 48_000, Some("https://a/clear")),
        ]);
        assert_eq!(resolve_audio_url(&player).as_deref(), Some("https://a/clear"));
    }

    #[test]
    fn test_no_audio_yields_none() {
        let player = player_with_formats(vec![format("video/mp4", 1_000_000, Some("https://v"))]);
        assert!(resolve_audio_url(&player).is_none());
    }
}
