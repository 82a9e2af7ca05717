//! Logging helpers shared by the pipeline stages

use std::path::Path;
use std::time::Duration;

/// Logs the start of a numbered pipeline stage, e.g. `[2/8] Extracting RPU`
pub fn log_stage_start(step: usize, total: usize, description: &str) {
    tracing::info!("[{}/{}] {}", step, total, description);
}

pub fn log_conversion_start(input: &Path, output: &Path) {
    tracing::info!("Converting {} -> {}", input.display(), output.display());
}

pub fn log_conversion_complete(duration: Duration, output: &Path, output_size: u64) {
    tracing::info!(
        "Conversion complete in {:.1}s: {} ({})",
        duration.as_secs_f64(),
        output.display(),
        crate::utils::format_file_size(output_size)
    );
}
