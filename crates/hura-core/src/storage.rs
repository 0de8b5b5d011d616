//! Filesystem helpers for the persistent data directory

use std::path::Path;

use tracing::warn;

/// Create each directory (and parents). Failures are logged and skipped.
pub fn ensure_directories<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        if let Err(e) = std::fs::create_dir_all(path) {
            warn!("Skipping creation of {}: {}", path.display(), e);
        }
    }
}

/// Total size in bytes of all files below `path`.
///
/// Unreadable directories count as empty.
pub fn dir_size(path: &Path) -> u64 {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot access directory {}: {}", path.display(), e);
            return 0;
        }
    };

    entries
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(ft) if ft.is_dir() => dir_size(&entry.path()),
            Ok(ft) if ft.is_file() => entry.metadata().map(|m| m.len()).unwrap_or(0),
            _ => 0,
        })
        .sum()
}

/// Directory size formatted in megabytes with two decimals
pub fn dir_size_mb(path: &Path) -> String {
    format!("{:.2} MB", dir_size(path) as f64 / 1024.0 / 1024.0)
}
