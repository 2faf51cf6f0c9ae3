use anyhow::Result;
use url::Url;

use crate::FetchError;

/// Check whether the input looks like a bare 11-character video id.
pub fn is_video_id(input: &str) -> bool {
    input.len() == 11
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extract the 11-character video id from a bare id or any recognized watch
/// URL form (watch?v=, youtu.be/, /embed/, /shorts/, /v/, /live/).
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)
        .map_err(|_| FetchError::UnsupportedReference(input.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::UnsupportedReference(input.to_string()).into());
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::UnsupportedReference(input.to_string()))?
        .to_ascii_lowercase();

    // youtu.be/<id>
    if host == "youtu.be" {
        if let Some(seg) = parsed.path_segments().and_then(|mut s| s.next()) {
            if is_video_id(seg) {
                return Ok(seg.to_string());
            }
        }
    }

    let is_platform_host = host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com");

    if is_platform_host {
        // youtube.com/watch?v=<id>
        if parsed.path().starts_with("/watch") {
            for (k, v) in parsed.query_pairs() {
                if k == "v" && is_video_id(&v) {
                    return Ok(v.to_string());
                }
            }
        }

        // youtube.com/{embed,shorts,v,live}/<id>
        if let Some(mut segs) = parsed.path_segments() {
            let first = segs.next().unwrap_or("");
            let second = segs.next().unwrap_or("");
            if matches!(first, "embed" | "shorts" | "v" | "live") && is_video_id(second) {
                return Ok(second.to_string());
            }
        }
    }

    Err(FetchError::UnsupportedReference(input.to_string()).into())
}

/// Format duration in human-readable form for text output
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a seconds offset as an SRT timestamp (`hh:mm:ss,mmm`)
pub fn format_srt_timestamp(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as u64;
    let h = millis / 3_600_000;
    let m = (millis % 3_600_000) / 60_000;
    let s = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=30").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_embed_and_shorts_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/shorts/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_rejects_unrelated_input() {
        assert!(extract_video_id("not a video").is_err());
        assert!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(extract_video_id("ftp://youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(extract_video_id("tooshort").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
    }
}
