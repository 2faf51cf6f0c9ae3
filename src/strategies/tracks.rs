//! Caption-track model and the canonical selection policy.
//!
//! Every strategy that sees a track list (player, mirror, page scrape) applies
//! the same tie-break: a manually-created track in the preferred language wins,
//! then any track in the preferred language (auto-generated ranks below
//! manual), then the first track the upstream listed.

/// One caption track as reported by an upstream source, normalized across
/// response shapes.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// URL to fetch the track content from
    pub url: String,

    /// BCP-47-ish language code ("en", "en-US", ...)
    pub language_code: String,

    /// Whether the track was machine-generated (`kind=asr` upstream)
    pub is_auto_generated: bool,

    /// Human-readable label if the source exposed one
    pub label: Option<String>,
}

fn language_matches(code: &str, preferred: &str) -> bool {
    code.eq_ignore_ascii_case(preferred)
        || code
            .to_ascii_lowercase()
            .starts_with(&format!("{}-", preferred.to_ascii_lowercase()))
}

/// Select the best track for a preferred language (defaulting to English when
/// the request carries no hint).
pub fn select_best_track<'a>(tracks: &'a [TrackInfo], preferred: &str) -> Option<&'a TrackInfo> {
    if let Some(manual) = tracks
        .iter()
        .find(|t| !t.is_auto_generated && language_matches(&t.language_code, preferred))
    {
        return Some(manual);
    }

    if let Some(any_lang) = tracks
        .iter()
        .find(|t| language_matches(&t.language_code, preferred))
    {
        return Some(any_lang);
    }

    tracks.first()
}
