//! Path normalization and base reference resolution

use std::path::{Path, PathBuf};

pub fn normalize_path(path: &str) -> String {
    // Configs written on Windows may use backslashes in base references
    path.replace('\\', "/")
}

/// Resolve a base reference against the directory of the file declaring it.
/// Absolute references are kept as-is.
pub fn resolve_base_path(dir: &Path, reference: &str) -> PathBuf {
    let normalized = normalize_path(reference);
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        dir.join(candidate)
    }
}
