pub mod error;
pub mod ffmpeg;
pub mod filesystem;
pub mod logging;
pub mod progress;
pub mod tool_runner;

pub use error::{Error, Result};
pub use ffmpeg::{AudioStream, FfmpegWrapper};
pub use filesystem::{ensure_dir, format_file_size, get_file_size, probe_writable};
pub use logging::{setup_logging, JobLog};
pub use progress::StageSpinner;
pub use tool_runner::ToolRunner;
