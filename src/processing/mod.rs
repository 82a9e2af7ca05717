//! The conversion pipeline: one Profile 7 MKV in, one Profile 8.1 MP4 out.

pub mod finalize;
pub mod toolchain;
pub mod video;

pub use toolchain::{tool_report, ToolStatus, Toolchain};

use crate::config::{Config, ThrottleProfile, VideoMode};
use crate::mp4box::MuxRequest;
use crate::stream::AudioPipeline;
use crate::utils::logging::{log_conversion_start, log_stage_start, JobStatus};
use crate::utils::{get_file_size, Error, JobLog, Result, StageSpinner};
use crate::workspace::{JobLayout, JobWorkspace};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use video::LayerPaths;

/// Outcome of a successful conversion
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub output_size: u64,
    pub audio_tracks: usize,
    pub duration: Duration,
    pub log_path: Option<PathBuf>,
    pub retained_workspace: Option<PathBuf>,
    pub source_removed: bool,
    /// mediainfo lines naming Dolby Vision or hvc1; empty when not checked
    pub signaling: Vec<String>,
}

pub struct Pipeline {
    config: Config,
    throttle: ThrottleProfile,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, throttle: ThrottleProfile) -> Self {
        Self {
            config,
            throttle,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Runs every stage for `input`. Dropping the returned future kills the
    /// running tool, removes the workspace and any staging file next to the
    /// output, and records the job as interrupted.
    pub async fn run(&self, input: &Path, basename: Option<&str>) -> Result<ConversionSummary> {
        let started = Instant::now();

        Toolchain::new(&self.config.tools, &self.throttle, None).check_required()?;

        let layout = JobLayout::resolve(input, basename, &self.config.app)?;
        layout.prepare_directories()?;

        let workspace = JobWorkspace::create(&layout, self.config.pipeline.keep_temp)?;
        let log_path = JobLog::path_for(&layout.log_dir, &layout.basename);
        let log = JobLog::create(&log_path).map_err(|e| {
            Error::storage(format!("Cannot create log file {}: {}", log_path.display(), e))
        })?;

        let outcome = JobOutcome::new(log.clone(), started);
        let result = self.convert(&layout, &workspace, &log, started).await;
        if let Err(e) = &result {
            error!("Conversion failed: {}", e);
        }
        outcome.record(&result);
        result
    }

    async fn convert(
        &self,
        layout: &JobLayout,
        workspace: &JobWorkspace,
        log: &JobLog,
        started: Instant,
    ) -> Result<ConversionSummary> {
        let pipeline = &self.config.pipeline;
        let tools = Toolchain::new(&self.config.tools, &self.throttle, Some(log.clone()));
        let output = layout.final_output();
        let layers = LayerPaths::in_workspace(workspace.path());

        log_conversion_start(&layout.input, &output);
        info!("Workspace: {}", workspace.path().display());
        info!("Throttle: {}", self.throttle.describe());
        info!("Video mode: {}", pipeline.video_mode.as_str());
        info!("Log file: {}", log.path().display());
        note(log.log_job_start(&crate::utils::logging::JobHeader {
            input: &layout.input,
            output: &output,
            workspace: workspace.path(),
            throttle: &self.throttle.describe(),
            video_mode: pipeline.video_mode.as_str(),
        }));

        let mut stages = Stages::new(pipeline.video_mode, log, self.show_progress);

        match pipeline.video_mode {
            VideoMode::Disk => {
                let spinner = stages.begin("Extracting base layer");
                tools
                    .ffmpeg
                    .extract_base_layer(&layout.input, &layers.base_layer)
                    .await?;
                stages.end(spinner);

                let spinner = stages.begin("Extracting RPU and converting to Profile 8.1");
                tools.dovi.extract_rpu(&layers.base_layer, &layers.rpu).await?;
                stages.end(spinner);
            }
            VideoMode::Piped => {
                let spinner = stages.begin("Streaming base layer into RPU extraction");
                video::extract_streamed(&tools.ffmpeg, &tools.dovi, &layout.input, &layers).await?;
                stages.end(spinner);
            }
        }

        let spinner = stages.begin("Injecting converted RPU");
        tools
            .dovi
            .inject_rpu(&layers.base_layer, &layers.rpu, &layers.injected)
            .await?;
        stages.end(spinner);

        let spinner = stages.begin("Preparing audio tracks");
        let audio = AudioPipeline::new(tools.ffmpeg.clone(), &self.config.audio.eac3_bitrate)
            .prepare(&layout.input, workspace.path())
            .await?;
        stages.end(spinner);

        let spinner = stages.begin("Muxing Dolby Vision 8.1 MP4");
        let fps = match tools.ffmpeg.probe_frame_rate(&layout.input).await {
            Ok(fps) => fps,
            Err(e) => {
                warn!("Frame rate unknown, letting MP4Box decide: {}", e);
                None
            }
        };
        let audio_paths: Vec<PathBuf> = audio.iter().map(|a| a.path.clone()).collect();
        let request = MuxRequest {
            video: &layers.injected,
            fps: fps.as_deref(),
            audio: &audio_paths,
            output: &output,
        };
        tools.mp4box.mux(&request, &layout.mux_staging()).await?;
        stages.end(spinner);

        let spinner = stages.begin("Retagging video as hvc1");
        tools.ffmpeg.retag_hvc1(&output, layout.retag_temp()).await?;
        stages.end(spinner);

        let output_size = get_file_size(&output)?;

        let source_removed = if pipeline.remove_source {
            finalize::remove_source(&layout.input, &output).await
        } else {
            false
        };

        let signaling = if pipeline.verify_output {
            finalize::verify_output(&tools.mediainfo, &output).await
        } else {
            Vec::new()
        };

        let summary = ConversionSummary {
            input: layout.input.clone(),
            output,
            output_size,
            audio_tracks: audio.len(),
            duration: started.elapsed(),
            log_path: Some(log.path().to_path_buf()),
            retained_workspace: workspace
                .is_retained()
                .then(|| workspace.path().to_path_buf()),
            source_removed,
            signaling,
        };
        finalize::print_summary(&summary);
        Ok(summary)
    }
}

/// Numbers the stages on the console and in the job log
struct Stages<'a> {
    current: usize,
    total: usize,
    log: &'a JobLog,
    show_progress: bool,
}

impl<'a> Stages<'a> {
    fn new(mode: VideoMode, log: &'a JobLog, show_progress: bool) -> Self {
        let total = match mode {
            VideoMode::Disk => 6,
            VideoMode::Piped => 5,
        };
        Self {
            current: 0,
            total,
            log,
            show_progress,
        }
    }

    fn begin(&mut self, description: &str) -> StageSpinner {
        self.current += 1;
        log_stage_start(self.current, self.total, description);
        note(self.log.log_stage(self.current, self.total, description));
        StageSpinner::start(description, self.show_progress)
    }

    fn end(&self, spinner: StageSpinner) {
        let elapsed = spinner.finish();
        debug!("Stage {} took {:.1}s", self.current, elapsed.as_secs_f64());
        note(self.log.log_note(&format!("done in {:.1}s", elapsed.as_secs_f64())));
    }
}

/// Closing line of the job log. Dropped without [`JobOutcome::record`], the
/// job is logged as interrupted.
struct JobOutcome {
    log: JobLog,
    started: Instant,
    recorded: bool,
}

impl JobOutcome {
    fn new(log: JobLog, started: Instant) -> Self {
        Self {
            log,
            started,
            recorded: false,
        }
    }

    fn record(mut self, result: &Result<ConversionSummary>) {
        let duration = self.started.elapsed();
        note(match result {
            Ok(summary) => self.log.log_job_complete(
                JobStatus::Success,
                duration,
                Some(summary.output_size),
                None,
            ),
            Err(e) => self
                .log
                .log_job_complete(JobStatus::Failed, duration, None, Some(&e.to_string())),
        });
        self.recorded = true;
    }
}

impl Drop for JobOutcome {
    fn drop(&mut self) {
        if !self.recorded {
            warn!("Conversion interrupted");
            note(self.log.log_job_complete(
                JobStatus::Interrupted,
                self.started.elapsed(),
                None,
                None,
            ));
        }
    }
}

/// The job log is best effort; a write failure never stops the conversion.
fn note(result: Result<()>) {
    if let Err(e) = result {
        debug!("Failed to write job log: {}", e);
    }
}
