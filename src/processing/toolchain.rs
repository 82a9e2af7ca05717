use crate::config::{ThrottleProfile, ToolsConfig};
use crate::dolby_vision::DoviTool;
use crate::mediainfo::MediaInfoTool;
use crate::mp4box::Mp4BoxTool;
use crate::utils::{FfmpegWrapper, JobLog, Result, ToolRunner};
use std::path::PathBuf;

/// Availability of one external tool
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: &'static str,
    pub configured: String,
    pub resolved: Option<PathBuf>,
    pub required: bool,
    pub version: Option<String>,
}

/// Every external tool the job invokes, sharing one throttle profile and job log
pub struct Toolchain {
    pub ffmpeg: FfmpegWrapper,
    pub dovi: DoviTool,
    pub mp4box: Mp4BoxTool,
    pub mediainfo: MediaInfoTool,
}

impl Toolchain {
    pub fn new(tools: &ToolsConfig, throttle: &ThrottleProfile, log: Option<JobLog>) -> Self {
        let runner =
            |path: &String| ToolRunner::new(path.clone(), throttle.clone()).with_log(log.clone());

        Self {
            ffmpeg: FfmpegWrapper::new(runner(&tools.ffmpeg), runner(&tools.ffprobe)),
            dovi: DoviTool::new(runner(&tools.dovi_tool)),
            mp4box: Mp4BoxTool::new(runner(&tools.mp4box)),
            mediainfo: MediaInfoTool::new(runner(&tools.mediainfo)),
        }
    }

    /// ffmpeg, ffprobe, dovi_tool and MP4Box must all resolve.
    pub fn check_required(&self) -> Result<()> {
        self.ffmpeg.check_availability()?;
        self.dovi.check_availability()?;
        self.mp4box.check_availability()?;
        Ok(())
    }
}

/// Resolves every configured tool and asks it for its version.
pub async fn tool_report(tools: &ToolsConfig) -> Vec<ToolStatus> {
    let entries = [
        ("ffmpeg", &tools.ffmpeg, true, "-version"),
        ("ffprobe", &tools.ffprobe, true, "-version"),
        ("dovi_tool", &tools.dovi_tool, true, "--version"),
        ("MP4Box", &tools.mp4box, true, "-version"),
        ("mediainfo", &tools.mediainfo, false, "--version"),
    ];

    let mut report = Vec::with_capacity(entries.len());
    for (name, path, required, version_arg) in entries {
        let runner = ToolRunner::new(path.clone(), ThrottleProfile::unthrottled());
        let resolved = runner.check_availability().ok();
        let version = match resolved {
            Some(_) => runner.version(version_arg).await,
            None => None,
        };
        report.push(ToolStatus {
            name,
            configured: path.clone(),
            resolved,
            required,
            version,
        });
    }
    report
}
