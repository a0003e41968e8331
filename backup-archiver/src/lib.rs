//! Backup Archiver Library
//!
//! Configuration-driven backups of directory trees into timestamped ZIP
//! archives.

pub mod archive;
pub mod config;
pub mod fs;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use archive::{Archiver, BackupArchive};
pub use config::BackupConfig;
pub use pipeline::{run, RunOptions};
pub use utils::errors::{BackupError, Result};
