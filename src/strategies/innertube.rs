//! Shared plumbing for the platform's internal ("innertube") JSON API.
//!
//! The upstream serves different data to different client identities and
//! blocks some of them outright, so each official-caption strategy picks one
//! identity and sends the matching headers plus `context.client` payload.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const TRANSCRIPT_URL: &str = "https://www.youtube.com/youtubei/v1/get_transcript";

/// Client identity impersonated against the innertube endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIdentity {
    /// Desktop web player
    Web,
    /// Android app; tends to get unciphered stream URLs
    Android,
    /// Embedded web player; survives some age/region gates
    EmbeddedWeb,
}

impl ClientIdentity {
    pub fn client_name(&self) -> &'static str {
        match self {
            ClientIdentity::Web => "WEB",
            ClientIdentity::Android => "ANDROID",
            ClientIdentity::EmbeddedWeb => "WEB_EMBEDDED_PLAYER",
        }
    }

    pub fn client_version(&self) -> &'static str {
        match self {
            ClientIdentity::Web => "2.20240502.01.00",
            ClientIdentity::Android => "19.09.37",
            ClientIdentity::EmbeddedWeb => "1.20240501.00.00",
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            ClientIdentity::Web | ClientIdentity::EmbeddedWeb => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            }
            ClientIdentity::Android => {
                "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip"
            }
        }
    }

    /// Numeric client id sent in the X-Youtube-Client-Name header
    pub fn client_id(&self) -> &'static str {
        match self {
            ClientIdentity::Web => "1",
            ClientIdentity::Android => "3",
            ClientIdentity::EmbeddedWeb => "56",
        }
    }

    /// Slug used in strategy names and `source` tags
    pub fn slug(&self) -> &'static str {
        match self {
            ClientIdentity::Web => "web",
            ClientIdentity::Android => "android",
            ClientIdentity::EmbeddedWeb => "embedded",
        }
    }

    fn context(&self) -> Value {
        let mut client = json!({
            "clientName": self.client_name(),
            "clientVersion": self.client_version(),
            "hl": "en",
            "gl": "US",
        });
        if *self == ClientIdentity::Android {
            client["androidSdkVersion"] = json!(30);
            client["osName"] = json!("Android");
            client["osVersion"] = json!("11");
        }
        json!({ "client": client })
    }
}

/// Subset of the player response the pipeline consumes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub video_details: Option<VideoDetails>,
    pub captions: Option<Captions>,
    pub streaming_data: Option<StreamingData>,
    pub playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub title: Option<String>,
    pub length_seconds: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `asr` marks auto-generated tracks
    pub kind: Option<String>,
    pub name: Option<Value>,
}

impl RawCaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    pub fn label(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        name.get("simpleText")
            .and_then(Value::as_str)
            .or_else(|| {
                name.get("runs")?
                    .get(0)?
                    .get("text")
                    .and_then(Value::as_str)
            })
            .map(|s| s.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    #[serde(default)]
    pub adaptive_formats: Vec<AdaptiveFormat>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFormat {
    pub mime_type: String,
    pub bitrate: Option<u64>,
    /// Absent when the format is ciphered; such formats are skipped
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
}

/// Thin client over the innertube endpoints sharing one reqwest client
#[derive(Debug, Clone)]
pub struct InnertubeClient {
    http: reqwest::Client,
}

impl InnertubeClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST the player endpoint as the given client identity
    pub async fn player(
        &self,
        identity: ClientIdentity,
        video_id: &str,
    ) -> Result<PlayerResponse> {
        let body = json!({
            "context": identity.context(),
            "videoId": video_id,
            "contentCheckOk": true,
            "racyCheckOk": true,
        });

        let response = self
            .http
            .post(PLAYER_URL)
            .query(&[("prettyPrint", "false")])
            .header("User-Agent", identity.user_agent())
            .header("X-Youtube-Client-Name", identity.client_id())
            .header("X-Youtube-Client-Version", identity.client_version())
            .json(&body)
            .send()
            .await
            .context("Player request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Player endpoint returned HTTP {}", response.status());
        }

        let player: PlayerResponse = response
            .json()
            .await
            .context("Failed to parse player response")?;

        if let Some(status) = &player.playability_status {
            if matches!(
                status.status.as_deref(),
                Some("LOGIN_REQUIRED") | Some("ERROR")
            ) {
                anyhow::bail!(
                    "Video not playable for {} client: {}",
                    identity.slug(),
                    status.reason.as_deref().unwrap_or("unknown reason")
                );
            }
        }

        Ok(player)
    }

    /// POST the get_transcript endpoint; cues come back nested inside an
    /// engagement-panel structure the caller walks.
    pub async fn get_transcript(&self, video_id: &str) -> Result<Value> {
        let identity = ClientIdentity::Web;
        let body = json!({
            "context": identity.context(),
            "params": transcript_params(video_id),
        });

        let response = self
            .http
            .post(TRANSCRIPT_URL)
            .query(&[("prettyPrint", "false")])
            .header("User-Agent", identity.user_agent())
            .json(&body)
            .send()
            .await
            .context("get_transcript request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("get_transcript returned HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse get_transcript response")
    }
}

/// Build the get_transcript params blob: a length-delimited protobuf field 1
/// holding the video id, base64-encoded.
fn transcript_params(video_id: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    let mut buf = Vec::with_capacity(video_id.len() + 2);
    buf.push(0x0a); // field 1, wire type 2
    buf.push(video_id.len() as u8);
    buf.extend_from_slice(video_id.as_bytes());
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_params_encodes_video_id() {
        let params = transcript_params("dQw4w9WgXcQ");
        assert!(!params.is_empty());
        // 13 input bytes -> 18 unpadded base64 chars
        assert_eq!(params.len(), 18);
    }

    #[test]
    fn test_asr_kind_marks_auto_generated() {
        let track = RawCaptionTrack {
            base_url: "https://example.com".to_string(),
            language_code: "en".to_string(),
            kind: Some("asr".to_string()),
            name: None,
        };
        assert!(track.is_auto_generated());
    }

    #[test]
    fn test_label_reads_simple_text_and_runs() {
        let simple = RawCaptionTrack {
            base_url: String::new(),
            language_code: "en".to_string(),
            kind: None,
            name: Some(serde_json::json!({"simpleText": "English"})),
        };
        assert_eq!(simple.label().as_deref(), Some("English"));

        let runs = RawCaptionTrack {
            base_url: String::new(),
            language_code: "en".to_string(),
            kind: None,
            name: Some(serde_json::json!({"runs": [{"text": "English (auto)"}]})),
        };
        assert_eq!(runs.label().as_deref(), Some("English (auto)"));
    }
}
