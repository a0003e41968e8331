//! One backup run: load -> validate -> archive.
//!
//! This is the error boundary. Every failure is logged, printed as a status
//! line and turned into `None`; nothing propagates further.

use crate::archive::{Archiver, BackupArchive};
use crate::config::BackupConfig;
use crate::utils::errors::BackupError;
use std::path::PathBuf;
use tracing::{error, info};

/// Inputs of a backup run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Configuration file; `config.json` in the working directory when unset
    pub config_path: Option<PathBuf>,
}

/// Run a backup. Returns the archive, or `None` after reporting the failure.
pub fn run(options: &RunOptions) -> Option<BackupArchive> {
    let config = match BackupConfig::from_file(options.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            return None;
        }
    };

    info!(
        "Backing up {} director{} into {}",
        config.directories.len(),
        if config.directories.len() == 1 { "y" } else { "ies" },
        config.backup_output_dir.display()
    );

    match Archiver::from_config(&config).create_backup(&config.directories, &config.backup_output_dir) {
        Ok(archive) => {
            info!(
                "Backup created: {} ({} files, {} bytes)",
                archive.path.display(),
                archive.entries,
                archive.total_bytes
            );
            println!("Backup created: {}", archive.path.display());
            println!("Local backup made successfully");
            Some(archive)
        }
        Err(e) => {
            report(&e);
            error!("Backup creation failed, skipping upload.");
            println!("Backup creation failed.");
            None
        }
    }
}

/// Log the error with its cause and print it without.
fn report(err: &BackupError) {
    match std::error::Error::source(err) {
        Some(cause) => error!("{} ({})", err, cause),
        None => error!("{}", err),
    }
    println!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::utils::logger;
    use serial_test::serial;
    use std::collections::BTreeSet;
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_config(root: &Path, body: &str) -> std::io::Result<RunOptions> {
        let config_path = root.join(CONFIG_FILE_NAME);
        fs::write(&config_path, body)?;
        Ok(RunOptions {
            config_path: Some(config_path),
        })
    }

    fn archives_in(dir: &Path) -> std::io::Result<usize> {
        Ok(fs::read_dir(dir)?.count())
    }

    fn data_dir(root: &Path) -> std::io::Result<()> {
        fs::create_dir_all(root.join("data/sub"))?;
        fs::create_dir(root.join("out"))?;
        fs::write(root.join("data/a.txt"), b"a")?;
        fs::write(root.join("data/sub/b.txt"), b"b")
    }

    fn config_json(directories: &[&Path], output: &Path) -> String {
        serde_json::json!({
            "directories": directories,
            "backup_output_dir": output,
        })
        .to_string()
    }

    /// Run with `backup.log` in `root` as the log sink and return its lines.
    fn run_logged(root: &Path, options: &RunOptions) -> anyhow::Result<(Option<BackupArchive>, Vec<String>)> {
        let log_path = root.join("backup.log");
        let result = {
            let _guard = logger::init("info", &log_path)?;
            run(options)
        };
        let lines = fs::read_to_string(&log_path)?
            .lines()
            .map(str::to_string)
            .collect();
        Ok((result, lines))
    }

    fn count_lines(lines: &[String], level: &str, message: &str) -> usize {
        lines
            .iter()
            .filter(|line| line.contains(level) && line.contains(message))
            .count()
    }

    #[test]
    fn test_default_reads_working_directory_config() {
        assert!(RunOptions::default().config_path.is_none());
    }

    #[test]
    fn test_successful_run() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        data_dir(root.path())?;
        let options = write_config(
            root.path(),
            &config_json(&[&root.path().join("data")], &root.path().join("out")),
        )?;

        let (archive, lines) = run_logged(root.path(), &options)?;
        let archive = archive.expect("archive created");

        assert!(archive.path.starts_with(root.path().join("out")));
        assert!(archive.path.is_file());
        assert_eq!(archive.entries, 2);
        let created = format!("Backup created: {}", archive.path.display());
        assert_eq!(count_lines(&lines, "INFO", &created), 1);
        assert_eq!(count_lines(&lines, "ERROR", ""), 0);
        Ok(())
    }

    #[test]
    fn test_missing_config() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let options = RunOptions {
            config_path: Some(root.path().join(CONFIG_FILE_NAME)),
        };

        let (archive, lines) = run_logged(root.path(), &options)?;

        assert!(archive.is_none());
        assert_eq!(count_lines(&lines, "ERROR", "config.json file not found."), 1);
        assert_eq!(count_lines(&lines, "", "Backing up"), 0);
        Ok(())
    }

    #[test]
    fn test_malformed_config_attempts_no_archive() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        data_dir(root.path())?;
        let options = write_config(root.path(), "{not json")?;

        let (archive, lines) = run_logged(root.path(), &options)?;

        assert!(archive.is_none());
        assert_eq!(archives_in(&root.path().join("out"))?, 0);
        assert_eq!(count_lines(&lines, "ERROR", "Error decoding"), 1);
        assert_eq!(count_lines(&lines, "", "Backing up"), 0);
        Ok(())
    }

    #[test]
    fn test_schema_violation_attempts_no_archive() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        data_dir(root.path())?;
        let body = serde_json::json!({
            "directories": [root.path().join("data")],
            "output": root.path().join("out"),
        })
        .to_string();
        let options = write_config(root.path(), &body)?;

        let (archive, lines) = run_logged(root.path(), &options)?;

        assert!(archive.is_none());
        assert_eq!(archives_in(&root.path().join("out"))?, 0);
        assert_eq!(
            count_lines(
                &lines,
                "ERROR",
                "Invalid configuration: 'backup_output_dir' is a required property"
            ),
            1
        );
        Ok(())
    }

    #[test]
    fn test_missing_output_dir_returns_none() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        data_dir(root.path())?;
        let options = write_config(
            root.path(),
            &config_json(&[&root.path().join("data")], &root.path().join("nowhere")),
        )?;

        let (archive, lines) = run_logged(root.path(), &options)?;

        assert!(archive.is_none());
        assert!(!root.path().join("nowhere").exists());
        assert_eq!(count_lines(&lines, "ERROR", "Error creating backup: cannot create"), 1);
        assert_eq!(count_lines(&lines, "ERROR", "Backup creation failed, skipping upload."), 1);
        assert_eq!(count_lines(&lines, "INFO", "Backup created"), 0);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_relative_paths_from_working_directory() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        data_dir(root.path())?;
        fs::write(
            root.path().join(CONFIG_FILE_NAME),
            r#"{"directories": ["./data"], "backup_output_dir": "./out"}"#,
        )?;

        let previous = std::env::current_dir()?;
        std::env::set_current_dir(root.path())?;
        let archive = run(&RunOptions::default());
        std::env::set_current_dir(previous)?;

        let archive = archive.expect("archive created");
        let zip = zip::ZipArchive::new(File::open(&archive.path)?)?;
        let names: BTreeSet<&str> = zip.file_names().collect();
        assert_eq!(names, BTreeSet::from(["data/a.txt", "data/sub/b.txt"]));
        Ok(())
    }
}
