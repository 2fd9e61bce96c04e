//! CIDR list input: per-file parsing and directory scanning.

mod loader;
mod scanner;

use std::path::PathBuf;

use serde::Deserialize;

pub use loader::{load_list, parse_cidr, parse_list};
pub use scanner::{identifier_for, scan_dir, scan_files, RangeGroups};

/// A list file loaded under a fixed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListFile {
    /// Identifier the file's ranges are tagged with (e.g. `CN`)
    pub identifier: String,
    /// Path to the list file
    pub path: PathBuf,
}

impl ListFile {
    pub fn new(identifier: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            path: path.into(),
        }
    }
}
