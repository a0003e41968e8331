//! Backup configuration: loading `config.json` and checking its shape.
//!
//! The record must carry `directories` (array of strings) and
//! `backup_output_dir` (string). `exclude` is optional. Unknown fields are
//! tolerated.

use crate::utils::errors::{BackupError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

const REQUIRED_FIELDS: [&str; 2] = ["directories", "backup_output_dir"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackupConfig {
    /// Source directories, archived in this order
    pub directories: Vec<PathBuf>,

    /// Directory receiving the timestamped archive
    pub backup_output_dir: PathBuf,

    /// File-name substrings skipped during traversal
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl BackupConfig {
    /// Load and validate `path`, or `config.json` in the working directory
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let record = match path {
            Some(path) => load_from(path)?,
            None => load()?,
        };
        validate(&record)
    }
}

/// Read `config.json` from the current working directory.
pub fn load() -> Result<Value> {
    load_from(Path::new(CONFIG_FILE_NAME))
}

/// Read and parse a configuration file without checking its shape.
pub fn load_from(path: &Path) -> Result<Value> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BackupError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(BackupError::ConfigRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&content).map_err(|source| BackupError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Check a parsed record against the configuration schema.
pub fn validate(record: &Value) -> Result<BackupConfig> {
    let object = record
        .as_object()
        .ok_or_else(|| type_mismatch(record, "object", "$"))?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(BackupError::ConfigSchema(format!(
                "'{field}' is a required property"
            )));
        }
    }

    check_string_array(object, "directories")?;
    check_string(object, "backup_output_dir")?;
    if object.contains_key("exclude") {
        check_string_array(object, "exclude")?;
    }

    serde_json::from_value(record.clone()).map_err(|e| BackupError::ConfigSchema(e.to_string()))
}

fn check_string(object: &Map<String, Value>, field: &str) -> Result<()> {
    match &object[field] {
        Value::String(_) => Ok(()),
        other => Err(type_mismatch(other, "string", &format!("$.{field}"))),
    }
}

fn check_string_array(object: &Map<String, Value>, field: &str) -> Result<()> {
    let items = match &object[field] {
        Value::Array(items) => items,
        other => return Err(type_mismatch(other, "array", &format!("$.{field}"))),
    };

    for (index, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(type_mismatch(item, "string", &format!("$.{field}[{index}]")));
        }
    }

    Ok(())
}

fn type_mismatch(value: &Value, expected: &str, at: &str) -> BackupError {
    BackupError::ConfigSchema(format!("{value} is not of type '{expected}' (at {at})"))
}
