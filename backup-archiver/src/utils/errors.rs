//! Error taxonomy for the backup pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("{} file not found.", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error decoding {}.", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigSchema(String),

    #[error("Error creating backup: {0}")]
    ArchiveCreation(String),
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::ArchiveCreation(err.to_string())
    }
}

impl From<walkdir::Error> for BackupError {
    fn from(err: walkdir::Error) -> Self {
        BackupError::ArchiveCreation(err.to_string())
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        BackupError::ArchiveCreation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_report_lines() {
        let not_found = BackupError::ConfigNotFound {
            path: PathBuf::from("config.json"),
        };
        assert_eq!(not_found.to_string(), "config.json file not found.");

        let schema = BackupError::ConfigSchema("'directories' is a required property".into());
        assert_eq!(
            schema.to_string(),
            "Invalid configuration: 'directories' is a required property"
        );
    }

    #[test]
    fn test_io_errors_become_archive_failures() {
        let err: BackupError = std::io::Error::other("disk full").into();
        assert!(matches!(err, BackupError::ArchiveCreation(ref msg) if msg == "disk full"));
    }
}
