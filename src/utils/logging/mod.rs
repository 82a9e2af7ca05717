//! Console and per-job file logging
//!
//! - Console output goes through [`CleanFormatter`], a tree-style layout
//!   (`▶` job, `●` stage, indented steps) with noise filtering
//! - Every job also writes a transcript through [`JobLog`]

mod formatter;
mod helpers;
mod job_log;
mod text_utils;

pub use helpers::{log_conversion_complete, log_conversion_start, log_stage_start};
pub use job_log::{JobHeader, JobLog, JobStatus};

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use formatter::CleanFormatter;

/// Installs the global subscriber. `RUST_LOG` overrides `level`.
///
/// # Examples
/// ```no_run
/// use mkv2dv8::utils::logging::setup_logging;
///
/// setup_logging("info", false, true).expect("Failed to setup logging");
/// ```
pub fn setup_logging(level: &str, show_timestamps: bool, colored: bool) -> crate::utils::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(false)
        .event_format(CleanFormatter::new(show_timestamps, colored));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| crate::utils::Error::validation(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}
