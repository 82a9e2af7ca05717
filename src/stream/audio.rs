use crate::utils::ffmpeg::{audio_copy_args, eac3_transcode_args, truehd_core_args};
use crate::utils::{AudioStream, Error, FfmpegWrapper, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happens to one source audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAction {
    /// Stream copy into a raw elementary file (`eac3` or `ac3`)
    CopyRaw { format: &'static str },
    /// Stream copy into an MP4 audio container
    CopyMp4,
    /// AC-3 core of a TrueHD track, E-AC-3 transcode if there is none
    ExtractCoreOrTranscode,
    /// E-AC-3 transcode at the configured bitrate
    Transcode,
    Skip,
}

impl AudioAction {
    pub fn for_codec(codec: &str) -> Self {
        match codec.trim().to_ascii_lowercase().as_str() {
            "eac3" => AudioAction::CopyRaw { format: "eac3" },
            "ac3" => AudioAction::CopyRaw { format: "ac3" },
            "aac" | "aac_latm" | "mp4a" | "alac" => AudioAction::CopyMp4,
            "truehd" => AudioAction::ExtractCoreOrTranscode,
            "dts" | "dca" | "dts_hd" | "dts_ma" | "flac" => AudioAction::Transcode,
            _ => AudioAction::Skip,
        }
    }

    /// Extension of the file this action produces first.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            AudioAction::CopyRaw { format } => Some(format),
            AudioAction::CopyMp4 => Some("m4a"),
            AudioAction::ExtractCoreOrTranscode => Some("ac3"),
            AudioAction::Transcode => Some("eac3"),
            AudioAction::Skip => None,
        }
    }
}

impl fmt::Display for AudioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioAction::CopyRaw { format } => write!(f, "copy ({})", format),
            AudioAction::CopyMp4 => write!(f, "copy (m4a)"),
            AudioAction::ExtractCoreOrTranscode => write!(f, "extract AC-3 core"),
            AudioAction::Transcode => write!(f, "transcode to E-AC-3"),
            AudioAction::Skip => write!(f, "skip"),
        }
    }
}

/// An audio file ready for the muxer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAudio {
    pub path: PathBuf,
    pub source_index: u32,
    pub codec: String,
    /// Action that actually produced the file (a TrueHD fallback reports `Transcode`)
    pub action: AudioAction,
}

pub struct AudioPipeline {
    ffmpeg: FfmpegWrapper,
    eac3_bitrate: String,
}

impl AudioPipeline {
    pub fn new(ffmpeg: FfmpegWrapper, eac3_bitrate: impl Into<String>) -> Self {
        Self {
            ffmpeg,
            eac3_bitrate: eac3_bitrate.into(),
        }
    }

    /// Probes the input and prepares every supported audio track in source
    /// order as `audio_<n>.<ext>` inside `workspace`.
    pub async fn prepare(&self, input: &Path, workspace: &Path) -> Result<Vec<PreparedAudio>> {
        let streams = self.ffmpeg.probe_audio_streams(input).await?;
        if streams.is_empty() {
            info!("Audio tracks prepared: none found, output will be video-only");
            return Ok(Vec::new());
        }

        let mut prepared = Vec::with_capacity(streams.len());
        let mut next_index = 0usize;

        for stream in &streams {
            let action = AudioAction::for_codec(&stream.codec_name);
            let Some(ext) = action.extension() else {
                warn!(
                    "Audio track {} ({}) is not supported in MP4, skipping",
                    stream.index, stream.codec_name
                );
                continue;
            };

            let output = workspace.join(format!("audio_{}.{}", next_index, ext));
            info!(
                "Audio track {} ({}): {}",
                stream.index, stream.codec_name, action
            );

            let produced = self.prepare_stream(input, stream, action, output, workspace, next_index).await?;
            prepared.push(produced);
            next_index += 1;
        }

        info!("Audio tracks prepared: {} of {}", prepared.len(), streams.len());
        Ok(prepared)
    }

    async fn prepare_stream(
        &self,
        input: &Path,
        stream: &AudioStream,
        action: AudioAction,
        output: PathBuf,
        workspace: &Path,
        n: usize,
    ) -> Result<PreparedAudio> {
        let (path, action) = match action {
            AudioAction::CopyRaw { format } => {
                let args = audio_copy_args(input, stream.index, format, &output);
                self.run(&args, &output, stream).await?;
                (output, action)
            }
            AudioAction::CopyMp4 => {
                let args = audio_copy_args(input, stream.index, "mp4", &output);
                self.run(&args, &output, stream).await?;
                (output, action)
            }
            AudioAction::Transcode => {
                self.transcode(input, stream, &output).await?;
                (output, action)
            }
            AudioAction::ExtractCoreOrTranscode => {
                let args = truehd_core_args(input, stream.index, &output);
                match self.ffmpeg.run_audio(&args, &output).await {
                    Ok(()) => (output, action),
                    Err(e) => {
                        warn!(
                            "No usable AC-3 core in TrueHD track {}, transcoding to E-AC-3 instead",
                            stream.index
                        );
                        debug!("Core extraction failure: {}", e);
                        remove_partial(&output).await;

                        let fallback = workspace.join(format!("audio_{}.eac3", n));
                        self.transcode(input, stream, &fallback).await?;
                        (fallback, AudioAction::Transcode)
                    }
                }
            }
            AudioAction::Skip => {
                return Err(Error::audio(format!(
                    "Track {} ({}) cannot be prepared",
                    stream.index, stream.codec_name
                )))
            }
        };

        Ok(PreparedAudio {
            path,
            source_index: stream.index,
            codec: stream.codec_name.clone(),
            action,
        })
    }

    async fn transcode(&self, input: &Path, stream: &AudioStream, output: &Path) -> Result<()> {
        let args = eac3_transcode_args(input, stream.index, &self.eac3_bitrate, output);
        self.run(&args, output, stream).await
    }

    async fn run(&self, args: &[String], output: &Path, stream: &AudioStream) -> Result<()> {
        self.ffmpeg.run_audio(args, output).await.map_err(|e| {
            Error::audio(format!(
                "Track {} ({}) failed: {}",
                stream.index, stream.codec_name, e
            ))
        })
    }
}

async fn remove_partial(path: &Path) {
    if tokio::fs::remove_file(path).await.is_ok() {
        debug!("Removed partial {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dispatch_table() {
        assert_eq!(AudioAction::for_codec("eac3"), AudioAction::CopyRaw { format: "eac3" });
        assert_eq!(AudioAction::for_codec("ac3"), AudioAction::CopyRaw { format: "ac3" });
        for codec in ["aac", "aac_latm", "mp4a", "alac"] {
            assert_eq!(AudioAction::for_codec(codec), AudioAction::CopyMp4, "{}", codec);
        }
        assert_eq!(AudioAction::for_codec("truehd"), AudioAction::ExtractCoreOrTranscode);
        for codec in ["dts", "dca", "dts_hd", "dts_ma", "flac"] {
            assert_eq!(AudioAction::for_codec(codec), AudioAction::Transcode, "{}", codec);
        }
        assert_eq!(AudioAction::for_codec("opus"), AudioAction::Skip);
        assert_eq!(AudioAction::for_codec("pcm_s16le"), AudioAction::Skip);
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        assert_eq!(AudioAction::for_codec("TrueHD"), AudioAction::ExtractCoreOrTranscode);
        assert_eq!(AudioAction::for_codec(" DTS "), AudioAction::Transcode);
        assert_eq!(AudioAction::for_codec("E-AC-3"), AudioAction::Skip);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(AudioAction::CopyRaw { format: "ac3" }.extension(), Some("ac3"));
        assert_eq!(AudioAction::CopyMp4.extension(), Some("m4a"));
        assert_eq!(AudioAction::ExtractCoreOrTranscode.extension(), Some("ac3"));
        assert_eq!(AudioAction::Transcode.extension(), Some("eac3"));
        assert_eq!(AudioAction::Skip.extension(), None);
    }

    #[cfg(unix)]
    mod fake_tools {
        use super::super::*;
        use crate::config::ThrottleProfile;
        use crate::utils::ToolRunner;
        use pretty_assertions::assert_eq;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        }

        // ffprobe prints a fixed stream list; ffmpeg writes its last argument
        // unless it is asked for the TrueHD core.
        fn pipeline(dir: &Path, probe_json: &str) -> AudioPipeline {
            let ffprobe = script(dir, "ffprobe", &format!("cat <<'EOF'\n{}\nEOF", probe_json));
            let ffmpeg = script(
                dir,
                "ffmpeg",
                r#"for a in "$@"; do last="$a"; done
case "$*" in *truehd_core*) exit 1;; esac
echo "$*" > "$last""#,
            );
            let throttle = ThrottleProfile::unthrottled();
            AudioPipeline::new(
                FfmpegWrapper::new(
                    ToolRunner::new(ffmpeg, throttle.clone()),
                    ToolRunner::new(ffprobe, throttle),
                ),
                "640k",
            )
        }

        #[tokio::test]
        async fn test_prepare_dispatches_in_source_order() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let json = r#"{"streams": [
                {"index": 4, "codec_name": "dts"},
                {"index": 1, "codec_name": "truehd"},
                {"index": 2, "codec_name": "opus"},
                {"index": 3, "codec_name": "aac"}
            ]}"#;

            let audio = pipeline(tools.path(), json)
                .prepare(Path::new("in.mkv"), work.path())
                .await
                .unwrap();

            let names: Vec<String> = audio
                .iter()
                .map(|a| a.path.file_name().unwrap().to_string_lossy().to_string())
                .collect();
            assert_eq!(names, ["audio_0.eac3", "audio_1.m4a", "audio_2.eac3"]);
            assert_eq!(audio[0].source_index, 1);
            assert_eq!(audio[0].action, AudioAction::Transcode);
            assert!(!work.path().join("audio_0.ac3").exists());

            let dts = std::fs::read_to_string(&audio[2].path).unwrap();
            assert!(dts.contains("-map 0:4 -c:a eac3 -b:a 640k"), "{}", dts);
        }

        #[tokio::test]
        async fn test_prepare_without_audio() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let audio = pipeline(tools.path(), r#"{"streams": []}"#)
                .prepare(Path::new("in.mkv"), work.path())
                .await
                .unwrap();
            assert!(audio.is_empty());
        }

        #[tokio::test]
        async fn test_copy_failure_is_audio_error() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let ffprobe = script(
                tools.path(),
                "ffprobe",
                r#"echo '{"streams": [{"index": 1, "codec_name": "eac3"}]}'"#,
            );
            let ffmpeg = script(tools.path(), "ffmpeg", "exit 1");
            let throttle = ThrottleProfile::unthrottled();
            let pipeline = AudioPipeline::new(
                FfmpegWrapper::new(
                    ToolRunner::new(ffmpeg, throttle.clone()),
                    ToolRunner::new(ffprobe, throttle),
                ),
                "640k",
            );

            let result = pipeline.prepare(Path::new("in.mkv"), work.path()).await;
            assert!(matches!(result, Err(Error::Audio { .. })));
        }
    }
}
