//! Append-only transcript of one conversion job

use chrono::{Local, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::utils::Result;

/// Shared handle to the job log file; clones write to the same file.
#[derive(Clone)]
pub struct JobLog {
    writer: Arc<Mutex<BufWriter<File>>>,
    log_path: PathBuf,
}

/// Settings recorded at the top of the transcript
pub struct JobHeader<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub workspace: &'a Path,
    pub throttle: &'a str,
    pub video_mode: &'a str,
}

/// Closing status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failed,
    Interrupted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Interrupted => "INTERRUPTED",
        }
    }
}

impl JobLog {
    /// `<log_dir>/<basename>_<YYYYmmdd_HHMMSS>.log`
    pub fn path_for(log_dir: &Path, basename: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        log_dir.join(format!("{}_{}.log", basename, stamp))
    }

    pub fn create<P: AsRef<Path>>(log_path: P) -> Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            log_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log_job_start(&self, header: &JobHeader<'_>) -> Result<()> {
        let mut w = self.lock();
        writeln!(w, "mkv2dv8 {} - Conversion Log", env!("CARGO_PKG_VERSION"))?;
        writeln!(w, "Started: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(w, "========================================")?;
        writeln!(w, "  Input:      {}", header.input.display())?;
        writeln!(w, "  Output:     {}", header.output.display())?;
        writeln!(w, "  Workspace:  {}", header.workspace.display())?;
        writeln!(w, "  Throttle:   {}", header.throttle)?;
        writeln!(w, "  Video mode: {}", header.video_mode)?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }

    pub fn log_stage(&self, step: usize, total: usize, description: &str) -> Result<()> {
        let mut w = self.lock();
        writeln!(
            w,
            "[{}] [{}/{}] {}",
            Local::now().format("%H:%M:%S"),
            step,
            total,
            description
        )?;
        w.flush()?;
        Ok(())
    }

    pub fn log_command(&self, program: &str, args: &[String]) -> Result<()> {
        let mut w = self.lock();
        writeln!(w, "  $ {} {}", program, args.join(" "))?;
        w.flush()?;
        Ok(())
    }

    pub fn log_tool_failure(&self, tool: &str, status: &str, stderr: &str) -> Result<()> {
        let mut w = self.lock();
        writeln!(w, "  ! {} exited with {}", tool, status)?;
        for line in stderr.lines() {
            writeln!(w, "  ! {}", line)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn log_note(&self, message: &str) -> Result<()> {
        let mut w = self.lock();
        writeln!(w, "  {}", message)?;
        w.flush()?;
        Ok(())
    }

    pub fn log_job_complete(
        &self,
        status: JobStatus,
        duration: Duration,
        output_size: Option<u64>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut w = self.lock();
        writeln!(w)?;
        writeln!(w, "========================================")?;
        writeln!(w, "Status:   {}", status.as_str())?;
        writeln!(w, "Duration: {:.1}s", duration.as_secs_f64())?;
        if let Some(size) = output_size {
            writeln!(w, "Output:   {}", crate::utils::format_file_size(size))?;
        }
        if let Some(error) = error {
            writeln!(w, "Error:    {}", error)?;
        }
        w.flush()?;
        Ok(())
    }
}
