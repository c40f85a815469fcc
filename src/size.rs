use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// Best-effort recursive size of `path` in bytes.
///
/// Symlinks report their own length and are never followed. Directories sum every file
/// reachable below them; unreadable subtrees are skipped. Missing or inaccessible paths
/// count as zero.
pub fn path_size(path: &Path) -> u64 {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return 0,
    };

    let file_type = metadata.file_type();
    if file_type.is_symlink() || file_type.is_file() {
        return metadata.len();
    }
    if !file_type.is_dir() {
        return 0;
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false).into_iter().filter_map(Result::ok) {
        let kind = entry.file_type();
        if kind.is_dir() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            total = total.saturating_add(metadata.len());
        }
    }
    total
}
