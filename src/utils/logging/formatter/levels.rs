//! Hierarchy level of a console message

use once_cell::sync::Lazy;
use regex::Regex;

static STAGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+/\d+\] ").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingLevel {
    Root,   // Job start and end
    Stage,  // Numbered pipeline stages
    Step,   // Per-track and per-tool progress
    Detail, // Everything else
}

const ROOT_MARKERS: &[&str] = &["Converting ", "Conversion complete", "Conversion failed"];

const STEP_MARKERS: &[&str] = &[
    "Audio track",
    "Audio tracks prepared",
    "Workspace:",
    "Throttle:",
    "Log file:",
    "Output:",
    "Removed source",
    "Dolby Vision signaling",
    "Retained workspace",
    "Video mode:",
];

/// Determines the processing level of a log message from its wording
pub fn determine_processing_level(message: &str) -> ProcessingLevel {
    if ROOT_MARKERS.iter().any(|m| message.starts_with(m)) {
        return ProcessingLevel::Root;
    }

    if STAGE_REGEX.is_match(message) {
        return ProcessingLevel::Stage;
    }

    if STEP_MARKERS.iter().any(|m| message.starts_with(m)) {
        return ProcessingLevel::Step;
    }

    ProcessingLevel::Detail
}
