use crate::utils::{Error, Result};
use std::fs::OpenOptions;
use std::path::Path;

const SENTINEL_NAME: &str = ".mkv2dv8_write_probe";

/// Creates `dir` (and parents) if it does not exist yet.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::storage(format!("Cannot create directory {}: {}", dir.display(), e))
    })
}

/// Creates and deletes a sentinel file to prove `dir` is writable.
pub fn probe_writable<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    let sentinel = dir.join(format!("{}.{}", SENTINEL_NAME, std::process::id()));

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&sentinel)
        .map_err(|e| {
            Error::storage(format!(
                "{} is not writable ({}); check for a read-only mount",
                dir.display(),
                e
            ))
        })?;

    std::fs::remove_file(&sentinel).map_err(|e| {
        Error::storage(format!(
            "Cannot remove write probe in {}: {}",
            dir.display(),
            e
        ))
    })
}

pub fn is_matroska_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_lowercase().as_str(), "mkv" | "mk3d" | "webm"))
}

pub fn get_file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.len())
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let size = bytes as f64;
    let unit_index = (size.log(THRESHOLD) as usize).min(UNITS.len() - 1);
    let size_in_unit = size / THRESHOLD.powi(unit_index as i32);

    format!("{:.2} {}", size_in_unit, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_matroska_file() {
        assert!(is_matroska_file("movie.mkv"));
        assert!(is_matroska_file("movie.MKV"));
        assert!(!is_matroska_file("movie.mp4"));
        assert!(!is_matroska_file("movie"));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_probe_writable_leaves_no_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        probe_writable(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_probe_writable_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = probe_writable(dir.path().join("absent"));
        assert!(matches!(result, Err(Error::Storage { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_writable_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // root ignores permission bits
        let can_write = std::fs::write(locked.join("x"), b"x").is_ok();
        let result = probe_writable(&locked);
        assert_eq!(result.is_ok(), can_write);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
