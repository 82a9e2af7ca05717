//! Optional post-run inspection of the output with `mediainfo`.

use crate::utils::{Result, ToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static SIGNALING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)dolby vision|\bdvhe\b|\bdvh1\b|\bhvc1\b").unwrap());

pub struct MediaInfoTool {
    tool: ToolRunner,
}

impl MediaInfoTool {
    pub fn new(tool: ToolRunner) -> Self {
        Self { tool }
    }

    pub fn is_available(&self) -> bool {
        self.tool.check_availability().is_ok()
    }

    /// Report lines mentioning Dolby Vision or the `hvc1` codec tag.
    pub async fn inspect<P: AsRef<Path>>(&self, media: P) -> Result<Vec<String>> {
        let args = vec![media.as_ref().to_string_lossy().to_string()];
        let report = self.tool.run(&args, None).await?;
        debug!("mediainfo report: {} lines", report.lines().count());
        Ok(signaling_lines(&report))
    }
}

pub fn signaling_lines(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|line| SIGNALING_REGEX.is_match(line))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}
