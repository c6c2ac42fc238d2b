// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fingerprint data model and the fingerprinter (spec.md §3, §4.2).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::errors::{BackupError, Result};

/// Absolute tolerance for mtime comparisons (spec.md §3).
pub const MTIME_EQUALITY_TOLERANCE: f64 = 1e-5;

/// The fingerprint of one source file: size, mtime, and optional content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "name")]
    pub path: PathBuf,
    pub size: u64,
    #[serde(rename = "last_modified")]
    pub mtime: f64,
    pub hash: Option<String>,
}

impl FileInfo {
    pub fn new(path: PathBuf, size: u64, mtime: f64, hash: Option<String>) -> Self {
        Self {
            path,
            size,
            mtime,
            hash,
        }
    }

    /// Equality per spec.md §4.4: size must match exactly, mtimes must
    /// agree within [`MTIME_EQUALITY_TOLERANCE`], and hashes must match
    /// unless `simple_compare` skips that check.
    pub fn matches(&self, other: &FileInfo, simple_compare: bool) -> bool {
        self.size == other.size
            && (self.mtime - other.mtime).abs() <= MTIME_EQUALITY_TOLERANCE
            && (simple_compare || self.hash == other.hash)
    }
}

/// Mapping from path to fingerprint, produced by the Scanner.
#[derive(Debug, Clone, Default)]
pub struct FingerprintSet {
    entries: HashMap<PathBuf, FileInfo>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: FileInfo) {
        self.entries.insert(info.path.clone(), info);
    }

    pub fn get(&self, path: &Path) -> Option<&FileInfo> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &FileInfo> {
        self.entries.values()
    }

    pub fn from_vec(infos: Vec<FileInfo>) -> Self {
        let mut set = Self::new();
        for info in infos {
            set.insert(info);
        }
        set
    }

    pub fn to_vec(&self) -> Vec<FileInfo> {
        let mut values: Vec<FileInfo> = self.entries.values().cloned().collect();
        values.sort_by(|a, b| a.path.cmp(&b.path));
        values
    }
}

/// Given a path, produces a [`FileInfo`]. Two modes: simple (size +
/// mtime only) and hashed (also SHA-256 of content, read in fixed-size
/// blocks).
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    block_size: usize,
}

impl Fingerprinter {
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Size + mtime only, no content read.
    pub fn simple(&self, path: &Path) -> Result<FileInfo> {
        let metadata =
            std::fs::metadata(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
        Ok(FileInfo::new(
            path.to_path_buf(),
            metadata.len(),
            mtime_seconds(&metadata),
            None,
        ))
    }

    /// Size + mtime + SHA-256 hash of content.
    pub fn hashed(&self, path: &Path) -> Result<FileInfo> {
        let metadata =
            std::fs::metadata(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
        let hash = hash_file(path, self.block_size)?;
        Ok(FileInfo::new(
            path.to_path_buf(),
            metadata.len(),
            mtime_seconds(&metadata),
            Some(hash),
        ))
    }
}

/// Stream a file's content through SHA-256 in fixed-size blocks.
/// Changing `block_size` never changes the resulting digest.
pub fn hash_file(path: &Path, block_size: usize) -> Result<String> {
    let mut file = File::open(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| BackupError::io(path.to_path_buf(), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn mtime_seconds(metadata: &std::fs::Metadata) -> f64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("file.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        (dir, path)
    }

    #[test]
    fn hash_is_stable_across_block_sizes() {
        let (_dir, path) = write_temp(b"hello world, this is a test payload");
        let a = hash_file(&path, 4).unwrap();
        let b = hash_file(&path, 65_536).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_same_file_twice_is_stable() {
        let (_dir, path) = write_temp(b"stable content");
        let a = hash_file(&path, 16).unwrap();
        let b = hash_file(&path, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mtime_tolerance_matches_spec() {
        let a = FileInfo::new(PathBuf::from("/a"), 10, 1000.0, Some("h".into()));
        let mut b = a.clone();
        b.mtime = 1000.0 + 1e-5;
        assert!(a.matches(&b, false));

        let mut c = a.clone();
        c.mtime = 1000.0 + 1e-4;
        assert!(!a.matches(&c, false));
    }

    #[test]
    fn simple_compare_ignores_hash_mismatch() {
        let a = FileInfo::new(PathBuf::from("/a"), 10, 1000.0, Some("h1".into()));
        let b = FileInfo::new(PathBuf::from("/a"), 10, 1000.0, Some("h2".into()));
        assert!(!a.matches(&b, false));
        assert!(a.matches(&b, true));
    }
}
