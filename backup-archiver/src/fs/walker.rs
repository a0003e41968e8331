//! Recursive traversal of a source directory.
//!
//! Only files are reported; directories are descended but never yielded.
//! Enumeration order is whatever the host filesystem returns and is not
//! sorted.

use crate::utils::errors::Result;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// File-name substrings to skip; matching directories are not descended
    pub exclude_patterns: Vec<String>,
}

/// A file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the walked root
    pub relative_path: PathBuf,

    /// File size in bytes (of the target, for symlinks)
    pub size: u64,

    /// Is this a symlink?
    pub is_symlink: bool,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// Symlinks are resolved to their target; returns None for symlinks to
    /// directories and dangling symlinks.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let is_symlink = raw_metadata.is_symlink();

        let size = if is_symlink {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                Ok(_) => return Ok(None),
                Err(_) => {
                    tracing::debug!("Skipping dangling symlink {}", path.display());
                    return Ok(None);
                }
            }
        } else if raw_metadata.is_file() {
            raw_metadata.len()
        } else {
            // sockets, fifos, devices
            return Ok(None);
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
            is_symlink,
        }))
    }
}

/// Walk a directory tree, calling `callback` for each file.
///
/// The first traversal error or callback error stops the walk and is
/// returned.
pub fn walk_files<F>(root: &Path, options: &WalkOptions, mut callback: F) -> Result<()>
where
    F: FnMut(&FileInfo) -> Result<()>,
{
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_exclude(entry, &options.exclude_patterns));

    for entry in walker {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            callback(&file_info)?;
        }
    }

    Ok(())
}

/// Check if a directory entry should be excluded based on patterns
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern.as_str()))
}
