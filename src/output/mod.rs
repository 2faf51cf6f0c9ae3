use anyhow::Result;
use serde_json::json;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::model::FetchResponse;
use crate::utils::{format_duration, format_srt_timestamp};
use crate::FetchError;

/// Save a fetch response to file
pub async fn save_to_file(
    response: &FetchResponse,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(response, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a fetch response to the console
pub fn print_to_console(
    response: &FetchResponse,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(response, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}

fn render(
    response: &FetchResponse,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format_as_json(response)?,
        OutputFormat::Text => format_as_text(response, include_timestamps),
        OutputFormat::Srt => format_as_srt(response),
    })
}

/// JSON interface shape: transcript fields flattened plus the `source` tag
pub fn format_as_json(response: &FetchResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}

pub fn format_as_text(response: &FetchResponse, include_timestamps: bool) -> String {
    let mut out = String::new();

    if let Some(title) = &response.transcript.title {
        out.push_str(title);
        out.push('\n');
    }
    if let Some(secs) = response.transcript.duration_seconds {
        out.push_str(&format!("Duration: {}\n", format_duration(secs as f64)));
    }
    if !out.is_empty() {
        out.push('\n');
    }

    for segment in &response.transcript.segments {
        if include_timestamps {
            let mins = (segment.start / 60.0) as u64;
            let secs = segment.start as u64 % 60;
            out.push_str(&format!("[{:02}:{:02}] ", mins, secs));
        }
        out.push_str(&segment.text);
        out.push('\n');
    }

    out
}

pub fn format_as_srt(response: &FetchResponse) -> String {
    let mut out = String::new();

    for (i, segment) in response.transcript.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.start + segment.duration),
            segment.text
        ));
    }

    out
}

/// Render a terminal pipeline error as the JSON error interface:
/// a human-readable message, a `source` tag, and the STT job id when a
/// deferred job exists.
pub fn render_error(error: &anyhow::Error) -> String {
    let (source, job_id) = match error.downcast_ref::<FetchError>() {
        Some(FetchError::SttPending { job_id }) => ("stt_deferred", Some(job_id.clone())),
        Some(FetchError::NoCaptions(_)) => ("none", None),
        Some(FetchError::RateLimited(_)) => ("rate_limit", None),
        Some(FetchError::AuthorizationRequired) => ("authorization", None),
        _ => ("none", None),
    };

    let mut body = json!({
        "error": error.to_string(),
        "source": source,
    });
    if let Some(job_id) = job_id {
        body["job_id"] = json!(job_id);
    }

    serde_json::to_string(&body).unwrap_or_else(|_| error.to_string())
}
