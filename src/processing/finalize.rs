use super::ConversionSummary;
use crate::mediainfo::MediaInfoTool;
use crate::utils::format_file_size;
use crate::utils::logging::log_conversion_complete;
use std::path::Path;
use tracing::{debug, info, warn};

/// Deletes the source once the output is in place. Returns whether it was removed.
pub async fn remove_source(input: &Path, output: &Path) -> bool {
    let output_ready = tokio::fs::metadata(output)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !output_ready {
        warn!(
            "Keeping source {}: output {} is missing",
            input.display(),
            output.display()
        );
        return false;
    }

    match tokio::fs::remove_file(input).await {
        Ok(()) => {
            info!("Removed source {}", input.display());
            true
        }
        Err(e) => {
            warn!("Could not remove source {}: {}", input.display(), e);
            false
        }
    }
}

/// Logs the Dolby Vision signalling mediainfo reports for `output`.
/// Never fails: a missing tool or an empty report is only logged.
pub async fn verify_output(mediainfo: &MediaInfoTool, output: &Path) -> Vec<String> {
    if !mediainfo.is_available() {
        debug!("mediainfo not found, skipping output check");
        return Vec::new();
    }

    match mediainfo.inspect(output).await {
        Ok(lines) if lines.is_empty() => {
            warn!("mediainfo reports no Dolby Vision signaling in {}", output.display());
            lines
        }
        Ok(lines) => {
            info!("Dolby Vision signaling:");
            for line in &lines {
                info!("  {}", line);
            }
            lines
        }
        Err(e) => {
            warn!("mediainfo check failed: {}", e);
            Vec::new()
        }
    }
}

pub fn print_summary(summary: &ConversionSummary) {
    log_conversion_complete(summary.duration, &summary.output, summary.output_size);
    info!(
        "Output: {} ({}, {} audio track(s))",
        summary.output.display(),
        format_file_size(summary.output_size),
        summary.audio_tracks
    );
    if let Some(log) = &summary.log_path {
        info!("Log file: {}", log.display());
    }
    if let Some(workspace) = &summary.retained_workspace {
        info!("Retained workspace: {}", workspace.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleProfile;
    use crate::utils::ToolRunner;

    #[tokio::test]
    async fn test_remove_source_after_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        let output = dir.path().join("movie.DV8.1.mp4");
        std::fs::write(&input, b"mkv").unwrap();

        assert!(!remove_source(&input, &output).await);
        assert!(input.exists());

        std::fs::write(&output, b"mp4").unwrap();
        assert!(remove_source(&input, &output).await);
        assert!(!input.exists());
    }

    #[tokio::test]
    async fn test_verify_without_mediainfo() {
        let tool = MediaInfoTool::new(ToolRunner::new(
            "definitely_not_mediainfo_12345".to_string(),
            ThrottleProfile::unthrottled(),
        ));
        assert!(verify_output(&tool, Path::new("o.mp4")).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verify_failure_is_not_fatal() {
        let tool = MediaInfoTool::new(ToolRunner::new(
            "false".to_string(),
            ThrottleProfile::unthrottled(),
        ));
        assert!(verify_output(&tool, Path::new("o.mp4")).await.is_empty());
    }
}
