//! Page-scrape strategy: recover caption tracks from the watch page HTML.
//!
//! The player-response blob is embedded in an inline script; its surrounding
//! syntax is not a public contract and has changed before, hence the ordered
//! list of fallback patterns plus a last-resort direct extraction of the
//! `captionTracks` array.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::innertube::PlayerResponse;
use super::tracks::{select_best_track, TrackInfo};
use super::TranscriptStrategy;
use crate::model::{Attempt, FetchRequest, Transcript};
use crate::parse;

/// Fallback patterns for the embedded player-response JSON, tried in order.
const PLAYER_RESPONSE_PATTERNS: &[&str] = &[
    r"(?s)var ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s|const\s|let\s|</script>)",
    r#"(?s)window\[["']ytInitialPlayerResponse["']\]\s*=\s*(\{.+?\})\s*;"#,
    r#"(?s)ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;"#,
];

const CAPTION_TRACKS_PATTERN: &str = r#""captionTracks":(\[.+?\])"#;

/// Markers of interstitial/consent/sign-in pages served instead of the video.
const SOFT_BLOCK_MARKERS: &[&str] = &[
    "consent.youtube.com",
    "Sign in to confirm",
    "unusual traffic",
    "captcha",
];

pub struct PageScrapeStrategy {
    http: reqwest::Client,
    user_agent: String,
}

impl PageScrapeStrategy {
    pub fn new(http: reqwest::Client, user_agent: String) -> Self {
        Self { http, user_agent }
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<Transcript> {
        let url = format!("https://www.youtube.com/watch?v={}", request.video_id);

        let response = self
            .http
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cookie", "CONSENT=YES+cb; SOCS=CAI")
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Watch page returned HTTP {}", response.status());
        }

        let html = response.text().await?;

        if let Some(marker) = detect_soft_block(&html) {
            anyhow::bail!("Watch page soft-blocked ({})", marker);
        }

        let (tracks, title, duration) = extract_caption_tracks(&html)
            .ok_or_else(|| anyhow::anyhow!("No caption data found in watch page"))?;

        if tracks.is_empty() {
            anyhow::bail!("Watch page listed no caption tracks");
        }

        let preferred = request.language_hint.as_deref().unwrap_or("en");
        let track = select_best_track(&tracks, preferred)
            .ok_or_else(|| anyhow::anyhow!("No usable caption track"))?;

        let body = self
            .http
            .get(&track.url)
            .query(&[("fmt", "json3")])
            .header("User-Agent", &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let segments = parse::parse_json3(&body)?;
        if segments.is_empty() {
            anyhow::bail!("Scraped caption track parsed to zero segments");
        }

        Ok(
            Transcript::new(
                &request.video_id,
                &track.language_code,
                track.is_auto_generated,
                segments,
            )
            .with_title(title)
            .with_duration(duration),
        )
    }
}

/// Return the first soft-block marker present in the page, if any.
fn detect_soft_block(html: &str) -> Option<&'static str> {
    SOFT_BLOCK_MARKERS
        .iter()
        .find(|marker| html.contains(*marker))
        .copied()
}

/// Extract caption tracks plus title/duration from the page.
///
/// Tries the structured player-response blob first (each fallback pattern in
/// order), then the bare `captionTracks` array.
fn extract_caption_tracks(html: &str) -> Option<(Vec<TrackInfo>, Option<String>, Option<u64>)> {
    for pattern in PLAYER_RESPONSE_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        let Some(caps) = re.captures(html) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&caps[1]) else {
            continue;
        };

        let player: PlayerResponse = match serde_json::from_value(value.clone()) {
            Ok(p) => p,
            Err(_) => continue,
        };

        let tracks = player
            .captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .map(|r| {
                r.caption_tracks
                    .iter()
                    .map(|t| TrackInfo {
                        url: t.base_url.clone(),
                        language_code: t.language_code.clone(),
                        is_auto_generated: t.is_auto_generated(),
                        label: t.label(),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if tracks.is_empty() {
            continue;
        }

        let title = player
            .video_details
            .as_ref()
            .and_then(|d| d.title.clone())
            .or_else(|| walk_for_title(&value));
        let duration = player
            .video_details
            .as_ref()
            .and_then(|d| d.length_seconds.as_deref())
            .and_then(|s| s.parse::<u64>().ok());

        return Some((tracks, title, duration));
    }

    // Last resort: pull the track array straight out of the HTML.
    let re = Regex::new(CAPTION_TRACKS_PATTERN).ok()?;
    let caps = re.captures(html)?;
    let raw: Vec<Value> = serde_json::from_str(&caps[1]).ok()?;

    let tracks: Vec<TrackInfo> = raw
        .iter()
        .filter_map(|t| {
            Some(TrackInfo {
                url: t.get("baseUrl")?.as_str()?.to_string(),
                language_code: t.get("languageCode")?.as_str()?.to_string(),
                is_auto_generated: t.get("kind").and_then(Value::as_str) == Some("asr"),
                label: t
                    .get("name")
                    .and_then(|n| n.get("simpleText"))
                    .and_then(Value::as_str)
                    .map(|s| s.to_string()),
            })
        })
        .collect();

    if tracks.is_empty() {
        return None;
    }
    Some((tracks, None, None))
}

/// Recursive walk for a plausible title when videoDetails is absent or moved.
fn walk_for_title(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(title)) = map.get("title") {
                if !title.is_empty() {
                    return Some(title.clone());
                }
            }
            map.values().find_map(walk_for_title)
        }
        Value::Array(items) => items.iter().find_map(walk_for_title),
        _ => None,
    }
}

#[async_trait]
impl TranscriptStrategy for PageScrapeStrategy {
    fn name(&self) -> &'static str {
        "page_scrape"
    }

    async fn attempt(&self, request: &FetchRequest) -> Attempt {
        match self.try_fetch(request).await {
            Ok(transcript) => Attempt::Success(transcript),
            Err(e) => Attempt::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "<html><script>var ytInitialPlayerResponse = {",
        r#""videoDetails":{"title":"Test Video","lengthSeconds":"212"},"#,
        r#""captions":{"playerCaptionsTracklistRenderer":{"captionTracks":["#,
        r#"{"baseUrl":"https://captions.example/manual","languageCode":"en","name":{"simpleText":"English"}},"#,
        r#"{"baseUrl":"https://captions.example/auto","languageCode":"en","kind":"asr"}"#,
        "]}}};</script></html>",
    );

    #[test]
    fn test_structured_extraction() {
        let (tracks, title, duration) = extract_caption_tracks(PAGE).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(title.as_deref(), Some("Test Video"));
        assert_eq!(duration, Some(212));

        let best = select_best_track(&tracks, "en").unwrap();
        assert!(!best.is_auto_generated);
        assert!(best.url.ends_with("/manual"));
    }

    #[test]
    fn test_bare_array_fallback() {
        let html = concat!(
            "<html><script>stuff;",
            r#""captionTracks":[{"baseUrl":"https://captions.example/t","languageCode":"de"}],"audioTracks":[]"#,
            "</script></html>",
        );
        let (tracks, title, _) = extract_caption_tracks(html).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "de");
        assert!(title.is_none());
    }

    #[test]
    fn test_soft_block_detection() {
        assert_eq!(
            detect_soft_block("<a href=\"https://consent.youtube.com/x\">"),
            Some("consent.youtube.com")
        );
        assert_eq!(detect_soft_block("Sign in to confirm you're not a bot"), Some("Sign in to confirm"));
        assert!(detect_soft_block("<html>regular page</html>").is_none());
    }

    #[test]
    fn test_no_caption_data_yields_none() {
        assert!(extract_caption_tracks("<html>nothing here</html>").is_none());
    }

    #[test]
    fn test_walk_for_title_finds_nested_title() {
        let value = serde_json::json!({
            "a": [{"b": {"title": "Nested"}}]
        });
        assert_eq!(walk_for_title(&value).as_deref(), Some("Nested"));
    }
}
