use crate::utils::{Error, Result, ToolRunner};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Dolby Vision profile signalled on the video track
pub const DV_PROFILE: &str = "8.1";

/// Inputs of one mux
#[derive(Debug, Clone)]
pub struct MuxRequest<'a> {
    /// Annex B HEVC with the converted RPU
    pub video: &'a Path,
    /// Frame rate for the raw stream, ffprobe notation
    pub fps: Option<&'a str>,
    pub audio: &'a [PathBuf],
    pub output: &'a Path,
}

pub struct Mp4BoxTool {
    tool: ToolRunner,
}

impl Mp4BoxTool {
    pub fn new(tool: ToolRunner) -> Self {
        Self { tool }
    }

    pub fn check_availability(&self) -> Result<()> {
        self.tool.check_availability().map(|_| ())
    }

    /// Mux video and audio into a Dolby Vision 8.1 MP4.
    ///
    /// MP4Box writes to `staging` next to the final output; only a successful
    /// run is renamed onto `request.output`. The staging file is removed on
    /// every other exit, including when this future is dropped.
    pub async fn mux(&self, request: &MuxRequest<'_>, staging: &Path) -> Result<()> {
        info!(
            "Muxing {} with {} audio track(s) -> {}",
            request.video.display(),
            request.audio.len(),
            request.output.display()
        );

        // leftovers from a killed run
        remove_if_exists(staging).await;

        let staged = TempPath::from_path(staging);
        let args = mux_args(request, staging);
        self.tool
            .run(&args, Some(staging))
            .await
            .map_err(|e| Error::mux(e.to_string()))?;

        staged.persist(request.output).map_err(|e| {
            Error::mux(format!(
                "Failed to move {} to {}: {}",
                staging.display(),
                request.output.display(),
                e.error
            ))
        })?;

        debug!("Mux complete: {}", request.output.display());
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) {
    if tokio::fs::remove_file(path).await.is_ok() {
        debug!("Removed stale {}", path.display());
    }
}

pub fn mux_args(request: &MuxRequest<'_>, output: &Path) -> Vec<String> {
    let mut video = format!("{}:dvp={}", request.video.to_string_lossy(), DV_PROFILE);
    if let Some(fps) = request.fps {
        video.push_str(&format!(":fps={}", fps));
    }

    let mut args = vec!["-add".to_string(), video];
    for audio in request.audio {
        args.push("-add".to_string());
        args.push(audio.to_string_lossy().to_string());
    }
    args.extend(
        ["-brand", "mp42isom", "-ab", "dby1", "-new"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(output.to_string_lossy().to_string());
    args
}
