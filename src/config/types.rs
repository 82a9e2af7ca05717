use super::throttle::SpeedMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the base layer reaches the RPU extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// Base layer written to the workspace, then read by dovi_tool
    #[default]
    Disk,
    /// ffmpeg output teed into the workspace and dovi_tool stdin at once
    Piped,
}

impl VideoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Piped => "piped",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "disk" => Some(Self::Disk),
            "piped" | "pipe" => Some(Self::Piped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root under which the output, temp and log directories live
    pub root: PathBuf,
    pub output_subdir: String,
    pub temp_subdir: String,
    pub log_subdir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_subdir: "dv_out".to_string(),
            temp_subdir: "dv_tmp".to_string(),
            log_subdir: "dv_logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub dovi_tool: String,
    pub mp4box: String,
    pub mediainfo: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            dovi_tool: "dovi_tool".to_string(),
            mp4box: "MP4Box".to_string(),
            mediainfo: "mediainfo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_timestamps: bool,
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_timestamps: true,
            colored_output: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target bitrate for E-AC-3 transcodes, ffmpeg notation
    pub eac3_bitrate: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            eac3_bitrate: "640k".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub speed_mode: SpeedMode,
    pub keep_temp: bool,
    pub remove_source: bool,
    pub video_mode: VideoMode,
    pub verify_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            speed_mode: SpeedMode::Balanced,
            keep_temp: false,
            remove_source: false,
            video_mode: VideoMode::Disk,
            verify_output: true,
        }
    }
}
