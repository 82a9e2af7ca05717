use crate::utils::{Error, Result, ToolRunner};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempPath;
use tokio::process::Child;
use tracing::{debug, info};

/// Audio stream as reported by ffprobe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStream {
    /// Absolute stream index in the source container
    pub index: u32,
    pub codec_name: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
}

#[derive(Clone)]
pub struct FfmpegWrapper {
    ffmpeg: ToolRunner,
    ffprobe: ToolRunner,
}

impl FfmpegWrapper {
    pub fn new(ffmpeg: ToolRunner, ffprobe: ToolRunner) -> Self {
        Self { ffmpeg, ffprobe }
    }

    pub fn ffmpeg(&self) -> &ToolRunner {
        &self.ffmpeg
    }

    pub fn check_availability(&self) -> Result<()> {
        self.ffmpeg.check_availability()?;
        self.ffprobe.check_availability()?;
        Ok(())
    }

    /// Audio streams in ascending source order.
    pub async fn probe_audio_streams<P: AsRef<Path>>(&self, input: P) -> Result<Vec<AudioStream>> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "a".to_string(),
            "-show_entries".to_string(),
            "stream=index,codec_name".to_string(),
            "-of".to_string(),
            "json".to_string(),
            input.as_ref().to_string_lossy().to_string(),
        ];

        let json = self
            .ffprobe
            .run(&args, None)
            .await
            .map_err(|e| Error::audio(format!("Audio stream probe failed: {}", e)))?;
        parse_audio_streams(&json)
    }

    /// Frame rate of the first video stream, as ffprobe reports it (`24000/1001`).
    pub async fn probe_frame_rate<P: AsRef<Path>>(&self, input: P) -> Result<Option<String>> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_entries".to_string(),
            "stream=index,r_frame_rate,avg_frame_rate".to_string(),
            "-of".to_string(),
            "json".to_string(),
            input.as_ref().to_string_lossy().to_string(),
        ];

        let json = self
            .ffprobe
            .run(&args, None)
            .await
            .map_err(|e| Error::extraction(format!("Video stream probe failed: {}", e)))?;
        parse_frame_rate(&json)
    }

    /// Demuxes the first video stream to an Annex B file.
    pub async fn extract_base_layer<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<()> {
        let output = output.as_ref();
        info!("Extracting base layer: {}", output.display());

        let args = base_layer_args(input.as_ref(), Some(output));
        self.ffmpeg
            .run(&args, Some(output))
            .await
            .map_err(|e| Error::extraction(e.to_string()))?;
        Ok(())
    }

    /// Same as [`Self::extract_base_layer`] but writes the stream to stdout.
    pub fn spawn_base_layer_stream<P: AsRef<Path>>(&self, input: P) -> Result<Child> {
        let args = base_layer_args(input.as_ref(), None);
        self.ffmpeg
            .spawn(&args, Stdio::null(), Stdio::piped())
            .map_err(|e| Error::extraction(e.to_string()))
    }

    /// Runs one audio extraction/transcode command. Errors stay [`Error::Tool`]
    /// so the caller can decide between fallback and failure.
    pub async fn run_audio(&self, args: &[String], output: &Path) -> Result<()> {
        self.ffmpeg.run(args, Some(output)).await.map(|_| ())
    }

    /// Rewrites the video sample entry to `hvc1` through `tmp_path`, then
    /// renames over `path`. On failure or cancellation `path` is left as it
    /// was and `tmp_path` is removed.
    pub async fn retag_hvc1<P: AsRef<Path>, Q: AsRef<Path>>(&self, path: P, tmp_path: Q) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = tmp_path.as_ref();

        let staged = TempPath::from_path(tmp_path);
        let args = retag_args(path, tmp_path);
        self.ffmpeg
            .run(&args, Some(tmp_path))
            .await
            .map_err(|e| Error::retag(e.to_string()))?;

        staged.persist(path).map_err(|e| {
            Error::retag(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;

        debug!("Retagged {} as hvc1", path.display());
        Ok(())
    }
}

fn common_args() -> Vec<String> {
    ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `None` as output streams to stdout.
pub fn base_layer_args(input: &Path, output: Option<&Path>) -> Vec<String> {
    let mut args = common_args();
    args.push("-i".to_string());
    args.push(input.to_string_lossy().to_string());
    args.extend(
        [
            "-map",
            "0:v:0",
            "-c:v",
            "copy",
            "-bsf:v",
            "hevc_mp4toannexb",
            "-an",
            "-sn",
            "-dn",
            "-f",
            "hevc",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(
        output
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    args
}

fn audio_args(input: &Path, index: u32, codec_args: &[&str], format: &str, output: &Path) -> Vec<String> {
    let mut args = common_args();
    args.push("-i".to_string());
    args.push(input.to_string_lossy().to_string());
    args.push("-map".to_string());
    args.push(format!("0:{}", index));
    args.extend(codec_args.iter().map(|s| s.to_string()));
    args.push("-f".to_string());
    args.push(format.to_string());
    args.push(output.to_string_lossy().to_string());
    args
}

/// Stream copy of one audio track into `format`.
pub fn audio_copy_args(input: &Path, index: u32, format: &str, output: &Path) -> Vec<String> {
    audio_args(input, index, &["-c:a", "copy"], format, output)
}

/// Stream copy through the `truehd_core` bitstream filter into a raw AC-3 file.
///
/// The filter yields reduced TrueHD rather than AC-3, so current ffmpeg
/// usually rejects the `ac3` muxer and the caller falls back to E-AC-3.
pub fn truehd_core_args(input: &Path, index: u32, output: &Path) -> Vec<String> {
    audio_args(
        input,
        index,
        &["-c:a", "copy", "-bsf:a", "truehd_core"],
        "ac3",
        output,
    )
}

pub fn eac3_transcode_args(input: &Path, index: u32, bitrate: &str, output: &Path) -> Vec<String> {
    audio_args(input, index, &["-c:a", "eac3", "-b:a", bitrate], "eac3", output)
}

pub fn retag_args(input: &Path, output: &Path) -> Vec<String> {
    let mut args = common_args();
    args.push("-i".to_string());
    args.push(input.to_string_lossy().to_string());
    args.extend(
        ["-map", "0", "-c", "copy", "-tag:v", "hvc1", "-f", "mp4"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(output.to_string_lossy().to_string());
    args
}

pub fn parse_audio_streams(json: &str) -> Result<Vec<AudioStream>> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let mut streams: Vec<AudioStream> = probe
        .streams
        .into_iter()
        .map(|s| AudioStream {
            index: s.index,
            codec_name: s.codec_name.unwrap_or_else(|| "unknown".to_string()),
        })
        .collect();
    streams.sort_by_key(|s| s.index);
    Ok(streams)
}

/// First usable rate among `r_frame_rate` and `avg_frame_rate`.
pub fn parse_frame_rate(json: &str) -> Result<Option<String>> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let rate = probe.streams.into_iter().next().and_then(|s| {
        [s.r_frame_rate, s.avg_frame_rate]
            .into_iter()
            .flatten()
            .find(|r| parse_fraction_to_float(r).is_some_and(|fps| fps > 0.0))
    });
    Ok(rate)
}

pub fn parse_fraction_to_float(fraction: &str) -> Option<f32> {
    match fraction.split_once('/') {
        Some((num, den)) => {
            let numerator: f32 = num.trim().parse().ok()?;
            let denominator: f32 = den.trim().parse().ok()?;
            if denominator != 0.0 {
                Some(numerator / denominator)
            } else {
                None
            }
        }
        None => fraction.trim().parse().ok(),
    }
}
