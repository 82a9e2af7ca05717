//! Suppression of chatty external tool lines

const NOISE_PATTERNS: &[&str] = &[
    "Invalid Block Addition value",
    "Could not find codec parameters for stream",
    "Consider increasing the value for the 'analyzeduration'",
    "matroska,webm",
    "Last message repeated",
    "Import results:",
    "Saving to ",
];

/// Returns false for lines that only add noise to the console
pub fn should_show_message(message: &str) -> bool {
    !NOISE_PATTERNS.iter().any(|pattern| message.contains(pattern))
}
