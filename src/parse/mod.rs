//! Segment normalizers: convert upstream caption formats into the common
//! segment shape. WebVTT and the json3 cue-event format cover every caption
//! strategy; STT word output is regrouped separately in `stt::processor`.

use serde::Deserialize;

use crate::model::Segment;
use crate::Result;

/// Parse WebVTT text into segments.
///
/// Skips the header, NOTE/STYLE blocks and numeric cue ids; joins multi-line
/// cue text with spaces; drops cues whose text is empty after trimming.
/// Timestamps are rounded to hundredths of a second.
pub fn parse_vtt(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start_matches('\u{feff}').trim();

        let Some((start, end)) = parse_cue_timing(line) else {
            continue;
        };

        let mut text = String::new();
        for cue_line in lines.by_ref() {
            let cue_line = cue_line.trim();
            if cue_line.is_empty() {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&strip_cue_markup(cue_line));
        }

        let start = round_hundredths(start);
        let duration = round_hundredths((end - start).max(0.0));
        if let Some(seg) = Segment::new(start, duration, &text) {
            segments.push(seg);
        }
    }

    segments
}

/// Parse a `hh:mm:ss.mmm --> hh:mm:ss.mmm` timing line. The hours component
/// is optional; trailing cue settings after the end timestamp are ignored.
fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start_raw, rest) = line.split_once("-->")?;
    let end_raw = rest.trim().split_whitespace().next()?;
    let start = parse_vtt_timestamp(start_raw.trim())?;
    let end = parse_vtt_timestamp(end_raw)?;
    Some((start, end))
}

fn parse_vtt_timestamp(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Drop inline cue markup (`<c>`, `<00:00:01.000>`, voice spans) that some
/// mirrors leave in the cue text.
fn strip_cue_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Top-level shape of the json3 cue-event caption format
#[derive(Debug, Deserialize)]
struct Json3Body {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<i64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<i64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse the json3 cue-event format served by the caption endpoints.
///
/// Each event carries a start offset and duration in milliseconds plus a list
/// of text runs; events with no visible text (window definitions, newlines
/// only) are dropped.
pub fn parse_json3(input: &str) -> Result<Vec<Segment>> {
    let body: Json3Body = serde_json::from_str(input)?;

    let mut segments = Vec::new();
    for event in body.events {
        let Some(start_ms) = event.start_ms else {
            continue;
        };
        let text: String = event
            .segs
            .iter()
            .map(|s| s.utf8.as_str())
            .collect::<String>()
            .replace('\n', " ");
        let text = decode_entities(&text);

        let start = start_ms.max(0) as f64 / 1000.0;
        let duration = event.duration_ms.unwrap_or(0).max(0) as f64 / 1000.0;
        if let Some(seg) = Segment::new(start, duration, &text) {
            segments.push(seg);
        }
    }

    Ok(segments)
}

/// Decode the handful of entities the caption endpoints leave escaped.
pub fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CUE_VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello there\n\n00:00:03.500 --> 00:00:06.000\nGeneral Kenobi\n";

    #[test]
    fn test_vtt_two_contiguous_cues() {
        let segments = parse_vtt(TWO_CUE_VTT);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[1].start, 3.5);
        assert_eq!(segments[1].duration, 2.5);
        assert_eq!(segments[1].text, "General Kenobi");
    }

    #[test]
    fn test_vtt_skips_header_and_cue_ids() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n1\n00:01.000 --> 00:02.000\nfirst\n\n2\n00:02.000 --> 00:03.000\nsecond\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first");
    }

    #[test]
    fn test_vtt_joins_multiline_cues() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nline one\nline two\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "line one line two");
    }

    #[test]
    fn test_vtt_drops_empty_cues() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\n   \n\n00:00:02.000 --> 00:00:04.000\nkept\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "kept");
    }

    #[test]
    fn test_vtt_strips_inline_markup() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n<c.colorCCCCCC>styled</c> <00:00:00.500>word\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments[0].text, "styled word");
    }

    #[test]
    fn test_vtt_rounds_to_hundredths() {
        let vtt = "WEBVTT\n\n00:00:01.333 --> 00:00:02.667\ntext\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments[0].start, 1.33);
        assert_eq!(segments[0].duration, 1.33);
    }

    #[test]
    fn test_json3_basic_events() {
        let input = r#"{"events":[
            {"tStartMs":0,"dDurationMs":2000,"segs":[{"utf8":"Hello "},{"utf8":"world"}]},
            {"tStartMs":2000,"dDurationMs":1500,"segs":[{"utf8":"again"}]}
        ]}"#;
        let segments = parse_json3(input).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.0);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[1].start, 2.0);
    }

    #[test]
    fn test_json3_skips_textless_events() {
        let input = r#"{"events":[
            {"tStartMs":0,"dDurationMs":100},
            {"tStartMs":100,"dDurationMs":200,"segs":[{"utf8":"\n"}]},
            {"tStartMs":300,"dDurationMs":400,"segs":[{"utf8":"real"}]}
        ]}"#;
        let segments = parse_json3(input).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "real");
    }

    #[test]
    fn test_json3_decodes_entities() {
        let input = r#"{"events":[{"tStartMs":0,"dDurationMs":100,"segs":[{"utf8":"rock &amp; roll"}]}]}"#;
        let segments = parse_json3(input).unwrap();
        assert_eq!(segments[0].text, "rock & roll");
    }

    #[test]
    fn test_segment_invariants_hold() {
        for seg in parse_vtt(TWO_CUE_VTT) {
            assert!(seg.start >= 0.0);
            assert!(seg.duration >= 0.0);
            assert!(!seg.text.trim().is_empty());
        }
    }
}
