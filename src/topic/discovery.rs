//! Locating declarative topic files

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Extensions recognised as topic declarations
pub const TOPIC_FILE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// List every topic declaration in `dir`, sorted by file name
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::MissingConfigFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_topic_extension(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-topic entry");
        }
    }

    files.sort();
    Ok(files)
}

/// Path of the declaration for `topic` inside `dir`
///
/// Prefers `<topic>.yaml`, falls back to an existing `<topic>.yml`. When
/// neither exists the `.yaml` path is returned so loading reports it missing.
pub fn resolve(dir: &Path, topic: &str) -> PathBuf {
    let primary = dir.join(format!("{}.{}", topic, TOPIC_FILE_EXTENSIONS[0]));
    if primary.exists() {
        return primary;
    }

    let fallback = dir.join(format!("{}.{}", topic, TOPIC_FILE_EXTENSIONS[1]));
    if fallback.exists() {
        fallback
    } else {
        primary
    }
}

fn has_topic_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TOPIC_FILE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}
