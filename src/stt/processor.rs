use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::model::{Attempt, Segment, Transcript};
use crate::strategies::innertube::VideoDetails;

/// Split the running segment once it reaches this many words
const MAX_SEGMENT_WORDS: usize = 18;

/// Split when the pause between consecutive words exceeds this
const PAUSE_SPLIT_SECS: f64 = 1.5;

/// AWS Transcribe transcript JSON shape
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    items: Vec<TranscriptItem>,
}

#[derive(Debug, Deserialize)]
struct TranscriptItem {
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    content: String,
}

/// One recognized word with its timing
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Polls an STT job within a wall-clock budget and regroups its word-level
/// output into sentence-like segments.
pub struct SttProcessor {
    client: TranscribeClient,
    http: reqwest::Client,
    job_id: String,
    poll_interval: Duration,
    poll_budget: Duration,
}

impl SttProcessor {
    pub fn new(
        client: TranscribeClient,
        http: reqwest::Client,
        job_id: String,
        poll_interval_secs: u64,
        poll_budget_secs: u64,
    ) -> Self {
        Self {
            client,
            http,
            job_id,
            poll_interval: Duration::from_secs(poll_interval_secs),
            poll_budget: Duration::from_secs(poll_budget_secs),
        }
    }

    /// Poll until the job resolves or the budget runs out.
    ///
    /// Budget exhaustion is not an error: the job id is returned as
    /// `Deferred` so the caller can poll separately out-of-band.
    pub async fn poll(
        &self,
        video_id: &str,
        video_details: Option<&VideoDetails>,
    ) -> Result<Attempt> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        progress.set_message("Waiting for transcription job...");

        let started = Instant::now();

        loop {
            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress)
                | Some(TranscriptionJobStatus::Queued) => {
                    if started.elapsed() + self.poll_interval >= self.poll_budget {
                        progress.finish_with_message("Polling budget exhausted");
                        tracing::info!(
                            "STT job {} still running after {}s; deferring",
                            self.job_id,
                            started.elapsed().as_secs()
                        );
                        return Ok(Attempt::Deferred {
                            job_id: self.job_id.clone(),
                        });
                    }
                    progress.set_message(format!(
                        "Transcribing... ({}s elapsed)",
                        started.elapsed().as_secs()
                    ));
                    sleep(self.poll_interval).await;
                }
                Some(TranscriptionJobStatus::Completed) => {
                    progress.finish_with_message("Transcription completed");
                    let transcript = self.fetch_result(&job, video_id, video_details).await?;
                    return Ok(Attempt::Success(transcript));
                }
                Some(TranscriptionJobStatus::Failed) => {
                    progress.finish_with_message("Transcription failed");
                    let reason = job.failure_reason().unwrap_or("Unknown error");
                    anyhow::bail!("Transcription job failed: {}", reason);
                }
                _ => {
                    progress.finish_with_message("Transcription status unknown");
                    anyhow::bail!("Unexpected transcription job status");
                }
            }
        }
    }

    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_id)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
            .cloned()
    }

    async fn fetch_result(
        &self,
        job: &TranscriptionJob,
        video_id: &str,
        video_details: Option<&VideoDetails>,
    ) -> Result<Transcript> {
        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI on completed job"))?;

        let body = self
            .http
            .get(transcript_uri)
            .send()
            .await
            .context("Failed to download transcript")?
            .error_for_status()?
            .text()
            .await?;

        let aws: AwsTranscript =
            serde_json::from_str(&body).context("Failed to parse transcript JSON")?;

        let words = collect_words(&aws.results);
        let segments = regroup_words(&words);
        if segments.is_empty() {
            anyhow::bail!("Transcription produced no usable words");
        }

        let language = job
            .language_code()
            .map(|lc| lc.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let duration = video_details
            .and_then(|d| d.length_seconds.as_deref())
            .and_then(|s| s.parse::<u64>().ok());

        Ok(Transcript::new(video_id, &language, true, segments)
            .with_title(video_details.and_then(|d| d.title.clone()))
            .with_duration(duration))
    }
}

/// Flatten pronunciation items into timed words, attaching punctuation items
/// to the preceding word's text.
fn collect_words(results: &TranscriptResults) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();

    for item in &results.items {
        match item.item_type.as_str() {
            "pronunciation" => {
                let timing = item
                    .start_time
                    .as_deref()
                    .and_then(|s| s.parse::<f64>().ok())
                    .zip(item.end_time.as_deref().and_then(|s| s.parse::<f64>().ok()));
                let (Some((start, end)), Some(alt)) = (timing, item.alternatives.first()) else {
                    continue;
                };
                words.push(Word {
                    text: alt.content.clone(),
                    start,
                    end,
                });
            }
            "punctuation" => {
                if let (Some(last), Some(alt)) = (words.last_mut(), item.alternatives.first()) {
                    last.text.push_str(&alt.content);
                }
            }
            _ => {}
        }
    }

    words
}

/// Regroup word-level output into sentence-like segments.
///
/// A new segment starts when the running one holds `MAX_SEGMENT_WORDS` words,
/// when the pause since the previous word exceeds `PAUSE_SPLIT_SECS`, or when
/// the running text already ends in terminal punctuation.
pub fn regroup_words(words: &[Word]) -> Vec<Segment> {
    let mut segments = Vec::new();

    let mut text = String::new();
    let mut word_count = 0usize;
    let mut seg_start = 0.0;
    let mut seg_end = 0.0;

    let mut flush =
        |text: &mut String, word_count: &mut usize, start: f64, end: f64, out: &mut Vec<Segment>| {
            if let Some(seg) = Segment::new(start, (end - start).max(0.0), text) {
                out.push(seg);
            }
            text.clear();
            *word_count = 0;
        };

    for word in words {
        let pause_exceeded = word_count > 0 && word.start - seg_end > PAUSE_SPLIT_SECS;
        let ends_sentence = text.ends_with('.') || text.ends_with('!') || text.ends_with('?');

        if word_count >= MAX_SEGMENT_WORDS || pause_exceeded || (word_count > 0 && ends_sentence) {
            flush(&mut text, &mut word_count, seg_start, seg_end, &mut segments);
        }

        if word_count == 0 {
            seg_start = word.start;
        } else {
            text.push(' ');
        }
        text.push_str(&word.text);
        seg_end = word.end;
        word_count += 1;
    }

    if word_count > 0 {
        flush(&mut text, &mut word_count, seg_start, seg_end, &mut segments);
    }

    segments
}
