//! Backup Archiver - Main entry point
//!
//! Runs one backup from `config.json` and exits. A failed backup is
//! reported but does not change the exit status.

use anyhow::Result;
use backup_archiver::{pipeline, utils};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: config.json in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file, appended to
    #[arg(long, value_name = "FILE", default_value = utils::logger::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = utils::logger::init(&args.log_level, &args.log_file)?;

    tracing::info!("Starting backup-archiver v{}", env!("CARGO_PKG_VERSION"));

    let options = pipeline::RunOptions {
        config_path: args.config,
    };
    pipeline::run(&options);

    Ok(())
}
