use serde::{Deserialize, Serialize};

/// A single timed unit of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Segment text, non-empty after trimming
    pub text: String,
}

impl Segment {
    /// Build a segment, rejecting entries the pipeline never emits:
    /// negative times or text that is empty after trimming.
    pub fn new(start: f64, duration: f64, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || start < 0.0 || duration < 0.0 {
            return None;
        }
        Some(Self {
            start,
            duration,
            text: text.to_string(),
        })
    }
}

/// Complete transcript for one video, constructed fresh per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video title if the source exposed one
    pub title: Option<String>,

    /// The 11-character video id
    pub video_id: String,

    /// Language code of the chosen track or STT output
    pub language: String,

    /// Whether the track was machine-generated (asr) or STT-derived
    pub is_auto_generated: bool,

    /// Total media duration in seconds if the source exposed it
    pub duration_seconds: Option<u64>,

    /// Timed segments in ascending start order (source-dependent)
    pub segments: Vec<Segment>,

    /// Segment count, kept explicit for the JSON interface
    pub total_segments: usize,
}

impl Transcript {
    pub fn new(
        video_id: &str,
        language: &str,
        is_auto_generated: bool,
        segments: Vec<Segment>,
    ) -> Self {
        let total_segments = segments.len();
        Self {
            title: None,
            video_id: video_id.to_string(),
            language: language.to_string(),
            is_auto_generated,
            duration_seconds: None,
            segments,
            total_segments,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_duration(mut self, duration_seconds: Option<u64>) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }
}

/// Access tier for a fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// Single free use: rate limited, no STT fallback
    Free,
    /// Paid/bulk use: payment session verified instead of rate limited
    Paid,
}

/// One inbound transcript request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Normalized 11-character video id
    pub video_id: String,

    /// Preferred language code, if any
    pub language_hint: Option<String>,

    /// Free or paid tier
    pub tier: AccessTier,

    /// Payment session token (paid tier)
    pub session_token: Option<String>,

    /// Rate-limit key, typically the client IP
    pub client_key: Option<String>,

    /// Whether the STT fallback may run after caption strategies fail
    pub allow_stt: bool,
}

impl FetchRequest {
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            language_hint: None,
            tier: AccessTier::Free,
            session_token: None,
            client_key: None,
            allow_stt: false,
        }
    }
}

/// Outcome of a single strategy attempt, used transiently by the orchestrator
#[derive(Debug, Clone)]
pub enum Attempt {
    /// The strategy produced a usable transcript
    Success(Transcript),

    /// An asynchronous STT job is still running; the caller polls it out-of-band
    Deferred { job_id: String },

    /// Ordinary failure; the chain advances to the next strategy
    Failure { reason: String },
}

impl Attempt {
    pub fn failure(reason: impl Into<String>) -> Self {
        Attempt::Failure {
            reason: reason.into(),
        }
    }
}

/// Successful pipeline response: the transcript plus which strategy produced it
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    #[serde(flatten)]
    pub transcript: Transcript,

    /// Name of the strategy that satisfied the request
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rejects_empty_text() {
        assert!(Segment::new(0.0, 1.0, "   ").is_none());
        assert!(Segment::new(0.0, 1.0, "").is_none());
    }

    #[test]
    fn test_segment_rejects_negative_times() {
        assert!(Segment::new(-0.1, 1.0, "hi").is_none());
        assert!(Segment::new(0.0, -1.0, "hi").is_none());
    }

    #[test]
    fn test_segment_trims_text() {
        let seg = Segment::new(1.5, 2.0, "  hello world  ").unwrap();
        assert_eq!(seg.text, "hello world");
        assert_eq!(seg.start, 1.5);
        assert_eq!(seg.duration, 2.0);
    }

    #[test]
    fn test_transcript_counts_segments() {
        let segments = vec![
            Segment::new(0.0, 1.0, "a").unwrap(),
            Segment::new(1.0, 1.0, "b").unwrap(),
        ];
        let t = Transcript::new("dQw4w9WgXcQ", "en", false, segments);
        assert_eq!(t.total_segments, 2);
    }
}
