//! File system helpers: traversal and per-file metadata.

pub mod metadata;
pub mod walker;
