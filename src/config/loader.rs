use super::types::*;
use crate::utils::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static BITRATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[kKM]?$").unwrap());

pub const ENV_SPEED_MODE: &str = "SPEED_MODE";
pub const ENV_KEEP_TEMP: &str = "KEEP_TEMP";
pub const ENV_REMOVE_SOURCE: &str = "REMOVE_SOURCE";
pub const ENV_ROOT: &str = "DV_ROOT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub audio: AudioConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `config_path` if present, then the per-user config, then defaults.
    pub fn load_with_fallback<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if config_path.exists() {
            return Self::load(config_path);
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                return Self::load(user_config);
            }
        }

        Ok(Self::default())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mkv2dv8").join("config.yaml"))
    }

    /// Applies `SPEED_MODE`, `KEEP_TEMP`, `REMOVE_SOURCE` and `DV_ROOT`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_SPEED_MODE).filter(|v| !v.trim().is_empty()) {
            self.pipeline.speed_mode = mode.parse()?;
        }

        if let Some(value) = lookup(ENV_KEEP_TEMP) {
            self.pipeline.keep_temp = is_enabled(&value);
        }

        if let Some(value) = lookup(ENV_REMOVE_SOURCE) {
            self.pipeline.remove_source = is_enabled(&value);
        }

        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.trim().is_empty()) {
            self.app.root = PathBuf::from(root);
        }

        Ok(())
    }

    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<()> {
        let tools = [
            ("ffmpeg", &self.tools.ffmpeg),
            ("ffprobe", &self.tools.ffprobe),
            ("dovi_tool", &self.tools.dovi_tool),
            ("mp4box", &self.tools.mp4box),
            ("mediainfo", &self.tools.mediainfo),
        ];
        for (name, path) in tools {
            if path.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Tool path for '{}' must not be empty",
                    name
                )));
            }
        }

        let subdirs = [
            ("output_subdir", &self.app.output_subdir),
            ("temp_subdir", &self.app.temp_subdir),
            ("log_subdir", &self.app.log_subdir),
        ];
        for (name, value) in subdirs {
            if value.trim().is_empty() || value.contains(std::path::MAIN_SEPARATOR) {
                return Err(Error::validation(format!(
                    "Invalid {}: '{}' (must be a plain directory name)",
                    name, value
                )));
            }
        }

        if !BITRATE_REGEX.is_match(&self.audio.eac3_bitrate) {
            return Err(Error::validation(format!(
                "Invalid eac3_bitrate: '{}' (expected e.g. 640k)",
                self.audio.eac3_bitrate
            )));
        }

        Ok(())
    }
}

/// `yes`-style switch used by the environment variables.
pub fn is_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedMode;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        match config.validate() {
            Ok(()) => {}
            Err(e) => panic!("Config validation failed: {}", e),
        }

        config.audio.eac3_bitrate = "fast".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tools.mp4box = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.app.output_subdir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.app.output_subdir, "dv_out");
        assert_eq!(config.app.temp_subdir, "dv_tmp");
        assert_eq!(config.app.log_subdir, "dv_logs");
        assert_eq!(config.audio.eac3_bitrate, "640k");
        assert_eq!(config.pipeline.speed_mode, SpeedMode::Balanced);
        assert_eq!(config.pipeline.video_mode, VideoMode::Disk);
        assert!(!config.pipeline.keep_temp);
        assert!(!config.pipeline.remove_source);
        assert!(config.pipeline.verify_output);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[
                ("SPEED_MODE", "gentle"),
                ("KEEP_TEMP", "yes"),
                ("REMOVE_SOURCE", "YES"),
                ("DV_ROOT", "/mnt/media"),
            ]))
            .unwrap();

        assert_eq!(config.pipeline.speed_mode, SpeedMode::Gentle);
        assert!(config.pipeline.keep_temp);
        assert!(config.pipeline.remove_source);
        assert_eq!(config.app.root, PathBuf::from("/mnt/media"));
    }

    #[test]
    fn test_env_unset_keeps_config() {
        let mut config = Config::default();
        config.pipeline.keep_temp = true;
        config.apply_env_overrides(env(&[])).unwrap();
        assert!(config.pipeline.keep_temp);
        assert_eq!(config.pipeline.speed_mode, SpeedMode::Balanced);
    }

    #[test]
    fn test_env_invalid_speed_mode() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(env(&[("SPEED_MODE", "ludicrous")]));
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_is_enabled() {
        assert!(is_enabled("yes"));
        assert!(is_enabled(" Y "));
        assert!(is_enabled("1"));
        assert!(!is_enabled("no"));
        assert!(!is_enabled(""));
    }

    #[test]
    fn test_config_load_from_string() {
        let yaml = r#"
app:
  root: "/srv/media"

tools:
  mp4box: "/opt/gpac/bin/MP4Box"

logging:
  level: "debug"
  show_timestamps: false

audio:
  eac3_bitrate: "768k"

pipeline:
  speed_mode: gentle
  video_mode: piped
  verify_output: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.app.root, PathBuf::from("/srv/media"));
        assert_eq!(config.app.output_subdir, "dv_out");
        assert_eq!(config.tools.mp4box, "/opt/gpac/bin/MP4Box");
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.show_timestamps);
        assert!(config.logging.colored_output);
        assert_eq!(config.audio.eac3_bitrate, "768k");
        assert_eq!(config.pipeline.speed_mode, SpeedMode::Gentle);
        assert_eq!(config.pipeline.video_mode, VideoMode::Piped);
        assert!(!config.pipeline.verify_output);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_with_fallback_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with_fallback(dir.path().join("absent.yaml")).unwrap();
        // either built-in defaults or the user's config, both must validate
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "audio:\n  eac3_bitrate: \"loud\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
