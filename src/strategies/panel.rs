//! Official caption strategy: the get_transcript engagement panel.
//!
//! The cue groups live several renderer layers deep inside the panel
//! structure and the nesting has shifted across upstream releases, so the
//! response is walked recursively for `transcriptSegmentRenderer` objects
//! rather than addressed by a fixed path.

use async_trait::async_trait;
use serde_json::Value;

use super::innertube::InnertubeClient;
use super::TranscriptStrategy;
use crate::model::{Attempt, FetchRequest, Segment, Transcript};
use crate::parse::decode_entities;
use crate::Result;

pub struct TranscriptPanelStrategy {
    innertube: InnertubeClient,
}

impl TranscriptPanelStrategy {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            innertube: InnertubeClient::new(http),
        }
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<Transcript> {
        let body = self.innertube.get_transcript(&request.video_id).await?;

        let mut segments = Vec::new();
        collect_panel_segments(&body, &mut segments);

        if segments.is_empty() {
            anyhow::bail!("Transcript panel carried no cue groups");
        }

        // The panel does not say which track it rendered; language and the
        // auto-generated flag are unknown here, so report conservatively.
        Ok(Transcript::new(&request.video_id, "en", false, segments))
    }
}

/// Recursively collect `transcriptSegmentRenderer` cues anywhere in the tree.
fn collect_panel_segments(value: &Value, out: &mut Vec<Segment>) {
    match value {
        Value::Object(map) => {
            if let Some(renderer) = map.get("transcriptSegmentRenderer") {
                if let Some(segment) = parse_panel_segment(renderer) {
                    out.push(segment);
                }
                return;
            }
            for child in map.values() {
                collect_panel_segments(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_panel_segments(child, out);
            }
        }
        _ => {}
    }
}

fn parse_panel_segment(renderer: &Value) -> Option<Segment> {
    let start_ms: i64 = renderer.get("startMs")?.as_str()?.parse().ok()?;
    let end_ms: i64 = renderer.get("endMs")?.as_str()?.parse().ok()?;

    let runs = renderer.get("snippet")?.get("runs")?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    let start = start_ms.max(0) as f64 / 1000.0;
    let duration = (end_ms - start_ms).max(0) as f64 / 1000.0;
    Segment::new(start, duration, &decode_entities(&text))
}

#[async_trait]
impl TranscriptStrategy for TranscriptPanelStrategy {
    fn name(&self) -> &'static str {
        "transcript_panel"
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
    use serde_json::json;

    #[test]
    fn test_collects_segments_from_nested_panel() {
        let body = json!({
            "actions": [{
                "updateEngagementPanelAction": {
                    "content": {
                        "transcriptRenderer": {
                            "body": {
                                "transcriptBodyRenderer": {
                                    "cueGroups": [
                                        {"transcriptSegmentRenderer": {
                                            "startMs": "0",
                                            "endMs": "2500",
                                            "snippet": {"runs": [{"text": "first cue"}]}
                                        }},
                                        {"transcriptSegmentRenderer": {
                                            "startMs": "2500",
                                            "endMs": "4000",
                                            "snippet": {"runs": [{"text": "second "}, {"text": "cue"}]}
                                        }}
                                    ]
                                }
                            }
                        }
                    }
                }
            }]
        });

        let mut segments = Vec::new();
        collect_panel_segments(&body, &mut segments);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[0].text, "first cue");
        assert_eq!(segments[1].text, "second cue");
    }

    #[test]
    fn test_skips_malformed_cues() {
        let body = json!({
            "cueGroups": [
                {"transcriptSegmentRenderer": {"startMs": "oops", "endMs": "100"}},
                {"transcriptSegmentRenderer": {
                    "startMs": "100",
                    "endMs": "200",
                    "snippet": {"runs": [{"text": "ok"}]}
                }}
            ]
        });

        let mut segments = Vec::new();
        collect_panel_segments(&body, &mut segments);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ok");
    }
}
