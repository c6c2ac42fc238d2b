// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot `data.json`: the per-snapshot manifest of add/modify/remove
//! entries (spec.md §3, §6). The file is a bare JSON array of entries.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{BackupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Modify,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub hash: String,
    pub operation: Operation,
}

pub fn write_data_json(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries).map_err(|e| BackupError::CorruptManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| BackupError::io(path.to_path_buf(), e))
}

pub fn read_data_json(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
    serde_json::from_str(&content).map_err(|e| BackupError::CorruptManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
