use crate::config::{Config, SpeedMode, VideoMode};
use crate::utils::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(name = "mkv2dv8")]
#[command(about = "Remux Dolby Vision Profile 7 MKV files into Profile 8.1 MP4")]
#[command(long_about = "
Converts a dual-layer Dolby Vision Profile 7 MKV into a single-layer Profile 8.1
MP4 that plays on TVs without Profile 7 support. The video is never re-encoded:
ffmpeg extracts the base layer, dovi_tool converts its RPU metadata, MP4Box muxes
the result with Dolby Vision signaling and ffmpeg retags the track as hvc1.

Outputs land in <root>/dv_out, scratch files in <root>/dv_tmp and job logs in
<root>/dv_logs.

ENVIRONMENT:
  SPEED_MODE     fast | balanced | gentle
  KEEP_TEMP      yes to retain the job workspace
  REMOVE_SOURCE  yes to delete the input after a successful conversion
  DV_ROOT        root directory for dv_out, dv_tmp and dv_logs
  RUST_LOG       log filter override

EXAMPLES:
  # Convert next to the current directory
  mkv2dv8 Movie.mkv

  # Custom output name, low priority, input removed afterwards
  mkv2dv8 Movie.mkv movie --speed-mode gentle --remove-source

  # Stream the base layer straight into dovi_tool
  mkv2dv8 Movie.mkv --video-mode piped
")]
pub struct CliArgs {
    /// Dolby Vision Profile 7 MKV to convert
    #[arg(value_name = "INPUT", required_unless_present = "check_tools")]
    pub input: Option<PathBuf>,

    /// Base name of the output (defaults to the input file stem)
    #[arg(value_name = "OUTPUT_BASENAME")]
    pub basename: Option<String>,

    /// Process priority: fast, balanced or gentle
    #[arg(long, value_name = "MODE")]
    pub speed_mode: Option<String>,

    /// Keep the job workspace after the run
    #[arg(long)]
    pub keep_temp: bool,

    /// Delete the input once the output is complete
    #[arg(long)]
    pub remove_source: bool,

    /// Root directory for dv_out, dv_tmp and dv_logs
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// How the base layer reaches dovi_tool: disk or piped
    #[arg(long, value_name = "MODE")]
    pub video_mode: Option<String>,

    /// Skip the mediainfo check of the output
    #[arg(long)]
    pub no_verify: bool,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml", value_name = "FILE")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Report which external tools are available and exit
    #[arg(long)]
    pub check_tools: bool,
}

impl CliArgs {
    pub fn get_log_level<'a>(&self, config_level: &'a str) -> &'a str {
        if self.debug {
            "debug"
        } else {
            config_level
        }
    }

    pub fn should_use_color(&self) -> bool {
        !self.no_color
    }

    /// Command-line flags win over the config file and the environment.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(mode) = &self.speed_mode {
            config.pipeline.speed_mode = mode.parse::<SpeedMode>()?;
        }
        if let Some(mode) = &self.video_mode {
            config.pipeline.video_mode = VideoMode::from_string(mode).ok_or_else(|| {
                Error::validation(format!(
                    "Invalid video mode: {} (valid modes: disk, piped)",
                    mode
                ))
            })?;
        }
        if let Some(root) = &self.root {
            config.app.root = root.clone();
        }
        if self.keep_temp {
            config.pipeline.keep_temp = true;
        }
        if self.remove_source {
            config.pipeline.remove_source = true;
        }
        if self.no_verify {
            config.pipeline.verify_output = false;
        }
        Ok(())
    }
}
