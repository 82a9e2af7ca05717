pub mod cli;
pub mod config;
pub mod dolby_vision;
pub mod mediainfo;
pub mod mp4box;
pub mod processing;
pub mod stream;
pub mod utils;
pub mod workspace;

pub use config::{Config, SpeedMode, ThrottleProfile, VideoMode};
pub use dolby_vision::DoviTool;
pub use mp4box::Mp4BoxTool;
pub use processing::{ConversionSummary, Pipeline};
pub use utils::{Error, FfmpegWrapper, Result};
