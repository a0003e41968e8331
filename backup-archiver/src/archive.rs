//! Timestamped ZIP archives of whole directory trees.
//!
//! Every file under every source directory becomes one entry named by its
//! path relative to the *parent* of that source directory, so the source's
//! own name is the first path segment (`data/sub/b.txt`). Sources are
//! archived in configuration order; order within a source is whatever the
//! filesystem yields.
//!
//! Entry names are unique within an archive. When a later file maps to a
//! name already written (two sources sharing a final name, a source listed
//! twice) it is skipped with a warning and the first file wins. Names that
//! are not valid UTF-8 are stored with U+FFFD in place of the invalid bytes
//! and logged; they go through the same collision check.

use crate::config::BackupConfig;
use crate::fs::metadata::FileMetadata;
use crate::fs::walker::{walk_files, FileInfo, WalkOptions};
use crate::utils::errors::{BackupError, Result};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Entries at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Archive file name for a backup started at `now`: `backup_YYYYMMDD_HHMMSS.zip`
pub fn archive_file_name(now: &DateTime<Local>) -> String {
    format!("backup_{}.zip", now.format(ARCHIVE_TIMESTAMP_FORMAT))
}

/// A finished archive
#[derive(Debug, Clone, PartialEq)]
pub struct BackupArchive {
    /// Absolute path of the archive file
    pub path: PathBuf,

    /// Number of file entries written
    pub entries: usize,

    /// Uncompressed bytes archived
    pub total_bytes: u64,
}

/// Writes source directories into a single ZIP archive
#[derive(Debug, Clone, Default)]
pub struct Archiver {
    walk_options: WalkOptions,
}

impl Archiver {
    pub fn new(walk_options: WalkOptions) -> Self {
        Self { walk_options }
    }

    /// Archiver honouring the configuration's exclude patterns
    pub fn from_config(config: &BackupConfig) -> Self {
        Self::new(WalkOptions {
            exclude_patterns: config.exclude.clone(),
        })
    }

    /// Archive `directories` into `output_dir`, named after the current local time.
    pub fn create_backup(&self, directories: &[PathBuf], output_dir: &Path) -> Result<BackupArchive> {
        self.create_backup_at(directories, output_dir, Local::now())
    }

    /// Archive `directories` into `output_dir`, named after `now`.
    ///
    /// An existing file with the same name is overwritten. The output
    /// directory must already exist. The first failure aborts the whole
    /// archive and the incomplete file is removed.
    pub fn create_backup_at(
        &self,
        directories: &[PathBuf],
        output_dir: &Path,
        now: DateTime<Local>,
    ) -> Result<BackupArchive> {
        let path = std::path::absolute(output_dir.join(archive_file_name(&now)))?;

        if directories.is_empty() {
            warn!("No source directories configured, archive will be empty");
        }

        let file = File::create(&path).map_err(|e| {
            BackupError::ArchiveCreation(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut partial = PartialArchive::new(path.clone());
        // the archive may live inside one of the sources
        let own_path = fs::canonicalize(&path)?;
        let mut zip = ZipWriter::new(file);

        let mut written = HashSet::new();
        let mut entries = 0usize;
        let mut total_bytes = 0u64;

        for directory in directories {
            let (count, bytes) = self.add_directory(&mut zip, directory, &own_path, &mut written)?;
            info!(
                "Archived {} ({} files, {} bytes)",
                directory.display(),
                count,
                bytes
            );
            entries += count;
            total_bytes += bytes;
        }

        zip.finish()?;
        partial.commit();

        Ok(BackupArchive {
            path,
            entries,
            total_bytes,
        })
    }

    fn add_directory<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        directory: &Path,
        own_path: &Path,
        written: &mut HashSet<String>,
    ) -> Result<(usize, u64)> {
        let metadata = fs::metadata(directory).map_err(|e| {
            BackupError::ArchiveCreation(format!(
                "cannot read source directory {}: {}",
                directory.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(BackupError::ArchiveCreation(format!(
                "{} is not a directory",
                directory.display()
            )));
        }

        let prefix = source_name(directory)?;
        let mut count = 0usize;
        let mut bytes = 0u64;

        walk_files(directory, &self.walk_options, |file| {
            if is_own_archive(file, own_path) {
                debug!("Skipping the archive being written: {}", file.path.display());
                return Ok(());
            }

            let name = entry_name(prefix.as_deref(), &file.relative_path);
            if !is_utf8_name(prefix.as_deref(), &file.relative_path) {
                warn!(
                    "{} is not valid UTF-8, storing it as {}",
                    file.path.display(),
                    name
                );
            }
            if written.contains(&name) {
                warn!(
                    "Skipping {}: entry {} is already in the archive",
                    file.path.display(),
                    name
                );
                return Ok(());
            }

            bytes += write_entry(zip, file, &name)?;
            written.insert(name);
            count += 1;
            Ok(())
        })?;

        Ok((count, bytes))
    }
}

/// Name of the top-level source directory, resolving `.`/`..` endings.
///
/// None only for a filesystem root.
fn source_name(directory: &Path) -> Result<Option<OsString>> {
    if let Some(name) = directory.file_name() {
        return Ok(Some(name.to_os_string()));
    }

    let canonical = fs::canonicalize(directory)?;
    Ok(canonical.file_name().map(|name| name.to_os_string()))
}

/// `/`-separated entry name: source name followed by the path under it.
fn entry_name(prefix: Option<&OsStr>, relative_path: &Path) -> String {
    prefix
        .into_iter()
        .chain(relative_path.components().map(|c| c.as_os_str()))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_utf8_name(prefix: Option<&OsStr>, relative_path: &Path) -> bool {
    prefix.map_or(true, |p| p.to_str().is_some()) && relative_path.to_str().is_some()
}

fn is_own_archive(file: &FileInfo, own_path: &Path) -> bool {
    file.path.file_name() == own_path.file_name()
        && fs::canonicalize(&file.path).is_ok_and(|p| p == own_path)
}

fn write_entry<W: Write + Seek>(zip: &mut ZipWriter<W>, file: &FileInfo, name: &str) -> Result<u64> {
    let metadata = FileMetadata::from_path(&file.path)?;

    let mut options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(file.size >= ZIP64_THRESHOLD);
    if let Some(modified) = metadata.zip_timestamp() {
        options = options.last_modified_time(modified);
    }
    if let Some(mode) = metadata.permissions {
        options = options.unix_permissions(mode);
    }

    let mut source = File::open(&file.path).map_err(|e| {
        BackupError::ArchiveCreation(format!("cannot read {}: {}", file.path.display(), e))
    })?;

    zip.start_file(name, options)?;
    let written = std::io::copy(&mut source, zip)?;
    if file.is_symlink {
        debug!("Added {} ({} bytes, via symlink)", name, written);
    } else {
        debug!("Added {} ({} bytes)", name, written);
    }

    Ok(written)
}

/// Removes the archive file on drop unless committed.
struct PartialArchive {
    path: PathBuf,
    committed: bool,
}

impl PartialArchive {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for PartialArchive {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => warn!("Removed incomplete archive {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove incomplete archive {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
