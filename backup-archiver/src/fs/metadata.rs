//! File metadata carried into archive entries.
//!
//! Archive entries record the source's modification time and, on unix,
//! its permission bits.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Metadata of a source file, following symlinks
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Last modified time
    pub modified: SystemTime,

    /// Permission bits (Unix mode & 0o777)
    pub permissions: Option<u32>,
}

impl FileMetadata {
    /// Extract metadata from a file path
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode() & 0o777)
        };

        #[cfg(not(unix))]
        let permissions = None;

        Ok(Self {
            modified: metadata.modified()?,
            permissions,
        })
    }

    /// Modification time as a ZIP timestamp (local time, 2-second precision).
    ///
    /// Returns None outside the range a ZIP header can hold (1980-2107).
    pub fn zip_timestamp(&self) -> Option<zip::DateTime> {
        let local: DateTime<Local> = self.modified.into();
        zip::DateTime::from_date_and_time(
            u16::try_from(local.year()).ok()?,
            local.month() as u8,
            local.day() as u8,
            local.hour() as u8,
            local.minute() as u8,
            local.second() as u8,
        )
        .ok()
    }
}
