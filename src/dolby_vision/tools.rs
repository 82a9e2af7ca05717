use std::path::Path;
use std::process::Stdio;
use tokio::process::Child;
use tracing::info;

use crate::utils::{Error, Result, ToolRunner};

/// dovi_tool mapping mode converting Profile 7 RPUs to Profile 8.1
pub const MODE_TO_81: &str = "2";

pub struct DoviTool {
    tool: ToolRunner,
}

impl DoviTool {
    pub fn new(tool: ToolRunner) -> Self {
        Self { tool }
    }

    pub fn runner(&self) -> &ToolRunner {
        &self.tool
    }

    pub fn check_availability(&self) -> Result<()> {
        self.tool.check_availability().map(|_| ())
    }

    /// Extract RPU metadata from an Annex B base layer, converting it with mode 2
    pub async fn extract_rpu<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        input_hevc: P1,
        output_rpu: P2,
    ) -> Result<()> {
        let output_rpu = output_rpu.as_ref();
        info!(
            "Extracting RPU: {} -> {}",
            input_hevc.as_ref().display(),
            output_rpu.display()
        );

        let args = extract_rpu_args(&input_hevc.as_ref().to_string_lossy(), output_rpu);
        self.tool
            .run(&args, Some(output_rpu))
            .await
            .map_err(|e| Error::metadata(format!("RPU extraction failed: {}", e)))?;

        info!("Successfully extracted RPU metadata");
        Ok(())
    }

    /// Spawns `extract-rpu` reading the base layer from stdin.
    pub fn spawn_extract_rpu_from_stdin<P: AsRef<Path>>(&self, output_rpu: P) -> Result<Child> {
        let args = extract_rpu_args("-", output_rpu.as_ref());
        self.tool
            .spawn(&args, Stdio::piped(), Stdio::null())
            .map_err(|e| Error::metadata(e.to_string()))
    }

    /// Inject RPU metadata into the base layer, replacing what it carried
    pub async fn inject_rpu<P1: AsRef<Path>, P2: AsRef<Path>, P3: AsRef<Path>>(
        &self,
        input_hevc: P1,
        rpu_file: P2,
        output_path: P3,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        info!(
            "Injecting RPU: {} + {} -> {}",
            input_hevc.as_ref().display(),
            rpu_file.as_ref().display(),
            output_path.display()
        );

        let args = inject_rpu_args(input_hevc.as_ref(), rpu_file.as_ref(), output_path);
        self.tool
            .run(&args, Some(output_path))
            .await
            .map_err(|e| Error::metadata(format!("RPU injection failed: {}", e)))?;

        info!("Successfully injected RPU metadata");
        Ok(())
    }
}

/// `input` may be `-` for stdin.
pub fn extract_rpu_args(input: &str, output_rpu: &Path) -> Vec<String> {
    vec![
        "-m".to_string(),
        MODE_TO_81.to_string(),
        "extract-rpu".to_string(),
        input.to_string(),
        "-o".to_string(),
        output_rpu.to_string_lossy().to_string(),
    ]
}

pub fn inject_rpu_args(input_hevc: &Path, rpu_file: &Path, output: &Path) -> Vec<String> {
    vec![
        "inject-rpu".to_string(),
        "-i".to_string(),
        input_hevc.to_string_lossy().to_string(),
        "--rpu-in".to_string(),
        rpu_file.to_string_lossy().to_string(),
        "-o".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
