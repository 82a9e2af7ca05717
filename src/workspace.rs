//! Per-job directory layout and the temporary workspace.
//!
//! [`JobLayout`] validates the input and computes every path the job writes.
//! [`JobWorkspace`] owns `<tmp_root>/<basename>.<random>/` and removes it on
//! drop unless it was created with `keep`.

use crate::config::AppConfig;
use crate::utils::filesystem::is_matroska_file;
use crate::utils::{ensure_dir, probe_writable, Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Suffix of the final output, before `.mp4`
pub const OUTPUT_TAG: &str = "DV8.1";

#[derive(Debug, Clone)]
pub struct JobLayout {
    pub input: PathBuf,
    pub basename: String,
    pub out_dir: PathBuf,
    pub tmp_root: PathBuf,
    pub log_dir: PathBuf,
}

impl JobLayout {
    /// Validates the input and derives the job's paths. Nothing is created.
    pub fn resolve(input: &Path, basename_override: Option<&str>, app: &AppConfig) -> Result<Self> {
        let metadata = std::fs::metadata(input)
            .map_err(|e| Error::input(format!("{}: {}", input.display(), e)))?;
        if !metadata.is_file() {
            return Err(Error::input(format!(
                "{} is not a regular file",
                input.display()
            )));
        }
        File::open(input)
            .map_err(|e| Error::input(format!("Cannot read {}: {}", input.display(), e)))?;
        if !is_matroska_file(input) {
            warn!("{} does not look like an MKV file", input.display());
        }

        let basename = match basename_override {
            Some(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(Error::input("Output base name must not be empty"));
                }
                if name.contains(['/', '\\']) || name == "." || name == ".." {
                    return Err(Error::input(format!(
                        "Output base name must be a plain file name: {}",
                        name
                    )));
                }
                name.to_string()
            }
            None => input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    Error::input(format!("Cannot derive a base name from {}", input.display()))
                })?,
        };

        Ok(Self {
            input: input.to_path_buf(),
            basename,
            out_dir: app.root.join(&app.output_subdir),
            tmp_root: app.root.join(&app.temp_subdir),
            log_dir: app.root.join(&app.log_subdir),
        })
    }

    /// Creates the output, temp and log roots and proves the first two are writable.
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.out_dir, &self.tmp_root, &self.log_dir] {
            ensure_dir(dir)?;
        }
        probe_writable(&self.tmp_root)?;
        probe_writable(&self.out_dir)?;
        Ok(())
    }

    /// `<out_dir>/<basename>.DV8.1.mp4`
    pub fn final_output(&self) -> PathBuf {
        self.out_dir.join(format!("{}.{}.mp4", self.basename, OUTPUT_TAG))
    }

    /// Sibling written by the hvc1 retag before it is renamed over the output
    pub fn retag_temp(&self) -> PathBuf {
        self.out_dir.join(format!("{}.{}.tmp.mp4", self.basename, OUTPUT_TAG))
    }

    /// Sibling written by MP4Box before it is renamed to the output
    pub fn mux_staging(&self) -> PathBuf {
        self.out_dir.join(format!("{}.{}.mux.mp4", self.basename, OUTPUT_TAG))
    }
}

enum Guard {
    Scoped(TempDir),
    Retained(PathBuf),
}

/// Scratch directory of one job
pub struct JobWorkspace {
    guard: Guard,
}

impl JobWorkspace {
    pub fn create(layout: &JobLayout, keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}.", layout.basename))
            .tempdir_in(&layout.tmp_root)
            .map_err(|e| {
                Error::storage(format!(
                    "Cannot create workspace in {}: {}",
                    layout.tmp_root.display(),
                    e
                ))
            })?;

        debug!("Created workspace {}", dir.path().display());

        let guard = if keep {
            #[allow(deprecated)]
            let path = dir.into_path();
            Guard::Retained(path)
        } else {
            Guard::Scoped(dir)
        };
        Ok(Self { guard })
    }

    pub fn path(&self) -> &Path {
        match &self.guard {
            Guard::Scoped(dir) => dir.path(),
            Guard::Retained(path) => path,
        }
    }

    pub fn is_retained(&self) -> bool {
        matches!(self.guard, Guard::Retained(_))
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        match &self.guard {
            Guard::Scoped(dir) => debug!("Removing workspace {}", dir.path().display()),
            Guard::Retained(path) => info!("Retained workspace: {}", path.display()),
        }
    }
}
