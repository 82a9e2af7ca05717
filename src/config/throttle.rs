//! Process priority prefixes applied to every external tool invocation.

use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    /// Full priority, no prefix
    Fast,
    /// Background priority for CPU and IO
    #[default]
    Balanced,
    /// Lowest CPU priority and idle IO class
    Gentle,
}

impl SpeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Gentle => "gentle",
        }
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "gentle" => Ok(Self::Gentle),
            other => Err(Error::validation(format!(
                "Invalid speed mode: {} (must be fast, balanced or gentle)",
                other
            ))),
        }
    }
}

/// Which priority utilities exist on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityTools {
    pub nice: bool,
    pub ionice: bool,
}

impl PriorityTools {
    pub fn detect() -> Self {
        Self {
            nice: which::which("nice").is_ok(),
            ionice: which::which("ionice").is_ok(),
        }
    }
}

/// Command prefix chosen once per run and shared by all tool runners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleProfile {
    mode: SpeedMode,
    prefix: Vec<String>,
}

impl ThrottleProfile {
    pub fn select(mode: SpeedMode, tools: PriorityTools) -> Self {
        let prefix: &[&str] = match (mode, tools.nice, tools.ionice) {
            (SpeedMode::Fast, _, _) => &[],
            (_, false, _) => {
                warn!(
                    "'nice' not found, running external tools at full priority despite speed mode {}",
                    mode
                );
                &[]
            }
            (SpeedMode::Balanced, true, true) => &["nice", "-n", "10", "ionice", "-c2", "-n7"],
            (SpeedMode::Balanced, true, false) => &["nice", "-n", "10"],
            (SpeedMode::Gentle, true, true) => &["nice", "-n", "19", "ionice", "-c3"],
            (SpeedMode::Gentle, true, false) => &["nice", "-n", "19"],
        };

        Self {
            mode,
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn detect(mode: SpeedMode) -> Self {
        let tools = PriorityTools::detect();
        debug!(
            "Priority tools: nice={}, ionice={}",
            tools.nice, tools.ionice
        );
        Self::select(mode, tools)
    }

    /// Full-priority profile, used where throttling is irrelevant (probes).
    pub fn unthrottled() -> Self {
        Self::select(SpeedMode::Fast, PriorityTools { nice: false, ionice: false })
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Resolves the program to spawn and its arguments once the prefix is applied.
    pub fn wrap(&self, program: &str, args: &[String]) -> (String, Vec<String>) {
        match self.prefix.split_first() {
            None => (program.to_string(), args.to_vec()),
            Some((head, rest)) => {
                let mut wrapped = rest.to_vec();
                wrapped.push(program.to_string());
                wrapped.extend_from_slice(args);
                (head.clone(), wrapped)
            }
        }
    }

    pub fn describe(&self) -> String {
        if self.prefix.is_empty() {
            format!("{} (no prefix)", self.mode)
        } else {
            format!("{} ({})", self.mode, self.prefix.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL: PriorityTools = PriorityTools {
        nice: true,
        ionice: true,
    };
    const NICE_ONLY: PriorityTools = PriorityTools {
        nice: true,
        ionice: false,
    };
    const NONE: PriorityTools = PriorityTools {
        nice: false,
        ionice: false,
    };

    #[test]
    fn test_fast_has_no_prefix() {
        for tools in [ALL, NICE_ONLY, NONE] {
            assert!(ThrottleProfile::select(SpeedMode::Fast, tools).prefix().is_empty());
        }
    }

    #[test]
    fn test_balanced_and_gentle_prefer_ionice() {
        assert_eq!(
            ThrottleProfile::select(SpeedMode::Balanced, ALL).prefix(),
            ["nice", "-n", "10", "ionice", "-c2", "-n7"]
        );
        assert_eq!(
            ThrottleProfile::select(SpeedMode::Gentle, ALL).prefix(),
            ["nice", "-n", "19", "ionice", "-c3"]
        );
    }

    #[test]
    fn test_fallback_to_nice() {
        assert_eq!(
            ThrottleProfile::select(SpeedMode::Balanced, NICE_ONLY).prefix(),
            ["nice", "-n", "10"]
        );
        assert_eq!(
            ThrottleProfile::select(SpeedMode::Gentle, NICE_ONLY).prefix(),
            ["nice", "-n", "19"]
        );
        assert!(ThrottleProfile::select(SpeedMode::Gentle, NONE).prefix().is_empty());
    }

    #[test]
    fn test_selection_is_deterministic() {
        for mode in [SpeedMode::Fast, SpeedMode::Balanced, SpeedMode::Gentle] {
            assert_eq!(
                ThrottleProfile::select(mode, ALL),
                ThrottleProfile::select(mode, ALL)
            );
        }
    }

    #[test]
    fn test_wrap() {
        let args = vec!["-i".to_string(), "in.mkv".to_string()];

        let (program, wrapped) =
            ThrottleProfile::select(SpeedMode::Fast, ALL).wrap("ffmpeg", &args);
        assert_eq!(program, "ffmpeg");
        assert_eq!(wrapped, args);

        let (program, wrapped) =
            ThrottleProfile::select(SpeedMode::Gentle, NICE_ONLY).wrap("ffmpeg", &args);
        assert_eq!(program, "nice");
        assert_eq!(wrapped, ["-n", "19", "ffmpeg", "-i", "in.mkv"]);
    }

    #[test]
    fn test_speed_mode_parsing() {
        assert_eq!("fast".parse::<SpeedMode>().unwrap(), SpeedMode::Fast);
        assert_eq!(" Balanced ".parse::<SpeedMode>().unwrap(), SpeedMode::Balanced);
        assert_eq!("GENTLE".parse::<SpeedMode>().unwrap(), SpeedMode::Gentle);
        assert!("turbo".parse::<SpeedMode>().is_err());
        assert_eq!(SpeedMode::default(), SpeedMode::Balanced);
    }
}
