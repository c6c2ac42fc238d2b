// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offsite snapshot output layout and per-backup-name historical
//! manifest (spec.md §3, §4.7).

pub mod archiver;
pub mod manifest;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::{BackupError, Result};
use crate::fingerprint::{FileInfo, FingerprintSet};
use crate::planner::{Plan, PlanEntry};
pub use manifest::{ManifestEntry, Operation};

/// Owns the historical manifest and snapshot directory layout for one
/// backup name, rooted at an explicit data directory (spec.md §9: no
/// process-wide global state).
pub struct SnapshotStore {
    data_dir: PathBuf,
    backup_name: String,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>, backup_name: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_name: backup_name.into(),
        }
    }

    fn live_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.backup", self.backup_name))
    }

    fn pending_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.backup.pending", self.backup_name))
    }

    /// Loads the committed historical set of `FileInfo` records. A
    /// missing or corrupt manifest is downgraded to a warning and
    /// treated as empty, forcing a full re-snapshot (spec.md §7).
    fn load_file_infos(&self, path: &Path) -> Vec<FileInfo> {
        if !path.exists() {
            return Vec::new();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read historical manifest, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<FileInfo>>(&content) {
            Ok(infos) => infos,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt historical manifest, treating as empty");
                Vec::new()
            }
        }
    }

    /// Current committed historical FingerprintSet (empty if none or corrupt).
    pub fn historical(&self) -> FingerprintSet {
        FingerprintSet::from_vec(self.load_file_infos(&self.live_path()))
    }

    /// Writes `fingerprints` to the `.pending` file (step 1 of the
    /// commit protocol).
    pub fn write_pending(&self, fingerprints: &FingerprintSet) -> Result<()> {
        let path = self.pending_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackupError::io(parent.to_path_buf(), e))?;
        }
        let infos = fingerprints.to_vec();
        let json = serde_json::to_string_pretty(&infos).map_err(|e| BackupError::CorruptManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| BackupError::io(path, e))
    }

    /// Commits a previously written `.pending` manifest over the live
    /// one: delete the live file, rename pending over it, optionally
    /// copy it aside for archival. Fails with `PendingMissing` if no
    /// `.pending` file exists.
    pub fn commit(&self, archive_suffix: Option<&str>) -> Result<()> {
        let pending = self.pending_path();
        if !pending.exists() {
            return Err(BackupError::PendingMissing {
                backup_name: self.backup_name.clone(),
            });
        }

        let live = self.live_path();
        let _ = std::fs::remove_file(&live);
        std::fs::rename(&pending, &live).map_err(|e| BackupError::io(live.clone(), e))?;

        if let Some(suffix) = archive_suffix {
            let archival = self.data_dir.join(format!("{}.backup.{}", self.backup_name, suffix));
            std::fs::copy(&live, &archival).map_err(|e| BackupError::io(archival, e))?;
        }

        Ok(())
    }

    /// Writes a snapshot's blobs and `data.json` into `output_dir`,
    /// applying the blob dedup rule against the union of all hashes in
    /// `historical` (spec.md §4.7). `output_dir` is fully emptied
    /// first. Returns the manifest entries written.
    pub fn write_snapshot(&self, output_dir: &Path, plan: &Plan, historical: &FingerprintSet) -> Result<Vec<ManifestEntry>> {
        if output_dir.exists() {
            std::fs::remove_dir_all(output_dir).map_err(|e| BackupError::io(output_dir.to_path_buf(), e))?;
        }
        std::fs::create_dir_all(output_dir).map_err(|e| BackupError::io(output_dir.to_path_buf(), e))?;

        let known_hashes: HashSet<&str> = historical
            .values()
            .filter_map(|fi| fi.hash.as_deref())
            .collect();
        let mut seen_this_snapshot: HashSet<String> = HashSet::new();

        let mut entries = Vec::new();

        for plan_entry in &plan.entries {
            match plan_entry {
                PlanEntry::Add { source, .. } => {
                    let hash = source.hash.clone().unwrap_or_default();
                    self.ensure_blob(output_dir, &source.path, &hash, &known_hashes, &mut seen_this_snapshot)?;
                    entries.push(ManifestEntry {
                        filename: source.path.to_string_lossy().into_owned(),
                        hash,
                        operation: Operation::Add,
                    });
                }
                PlanEntry::Modify { source, .. } => {
                    let hash = source.hash.clone().unwrap_or_default();
                    self.ensure_blob(output_dir, &source.path, &hash, &known_hashes, &mut seen_this_snapshot)?;
                    entries.push(ManifestEntry {
                        filename: source.path.to_string_lossy().into_owned(),
                        hash,
                        operation: Operation::Modify,
                    });
                }
                PlanEntry::Remove { dest } => {
                    entries.push(ManifestEntry {
                        filename: dest.path.to_string_lossy().into_owned(),
                        hash: String::new(),
                        operation: Operation::Remove,
                    });
                }
            }
        }

        manifest::write_data_json(&output_dir.join("data.json"), &entries)?;
        Ok(entries)
    }

    fn ensure_blob(
        &self,
        output_dir: &Path,
        source_path: &Path,
        hash: &str,
        known_hashes: &HashSet<&str>,
        seen_this_snapshot: &mut HashSet<String>,
    ) -> Result<()> {
        if known_hashes.contains(hash) || seen_this_snapshot.contains(hash) {
            return Ok(());
        }
        let blob_path = output_dir.join(hash);
        std::fs::copy(source_path, &blob_path).map_err(|e| BackupError::io(source_path.to_path_buf(), e))?;
        seen_this_snapshot.insert(hash.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_mapper::Identity;
    use crate::planner::diff;
    use std::fs;

    fn fi(path: &str, size: u64, mtime: f64, hash: &str) -> FileInfo {
        FileInfo::new(PathBuf::from(path), size, mtime, Some(hash.to_string()))
    }

    #[test]
    fn commit_without_pending_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), "myhost");
        assert!(matches!(
            store.commit(None),
            Err(BackupError::PendingMissing { .. })
        ));
    }

    #[test]
    fn pending_then_commit_replaces_live_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), "myhost");

        let mut set = FingerprintSet::new();
        set.insert(fi("/a/x.txt", 3, 1000.0, "h1"));
        store.write_pending(&set).unwrap();
        assert!(store.historical().is_empty());

        store.commit(None).unwrap();
        assert_eq!(store.historical().len(), 1);
    }

    #[test]
    fn corrupt_live_manifest_is_treated_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), "myhost");
        fs::write(store.live_path(), "not json").unwrap();
        assert!(store.historical().is_empty());
    }

    #[test]
    fn write_snapshot_dedups_identical_content_into_one_blob() {
        let source_dir = tempfile::TempDir::new().unwrap();
        let a_path = source_dir.path().join("a.txt");
        let b_path = source_dir.path().join("b.txt");
        fs::write(&a_path, b"same content").unwrap();
        fs::write(&b_path, b"same content").unwrap();

        let mut source = FingerprintSet::new();
        source.insert(fi(a_path.to_str().unwrap(), 12, 1000.0, "deadbeef"));
        source.insert(fi(b_path.to_str().unwrap(), 12, 1000.0, "deadbeef"));
        let dest = FingerprintSet::new();
        let plan = diff(&source, &dest, &Identity, false);
        assert_eq!(plan.added(), 2);

        let data_dir = tempfile::TempDir::new().unwrap();
        let output_dir = data_dir.path().join("out");
        let store = SnapshotStore::new(data_dir.path(), "myhost");
        let historical = FingerprintSet::new();
        let entries = store.write_snapshot(&output_dir, &plan, &historical).unwrap();

        assert_eq!(entries.len(), 2);
        let blob_count = fs::read_dir(&output_dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name() != "data.json")
            .count();
        assert_eq!(blob_count, 1);
    }

    #[test]
    fn write_snapshot_skips_blob_already_in_historical() {
        let source_dir = tempfile::TempDir::new().unwrap();
        let a_path = source_dir.path().join("a.txt");
        fs::write(&a_path, b"known content").unwrap();

        let mut source = FingerprintSet::new();
        source.insert(fi(a_path.to_str().unwrap(), 13, 1000.0, "knownhash"));
        let dest = FingerprintSet::new();
        let plan = diff(&source, &dest, &Identity, false);

        let mut historical = FingerprintSet::new();
        historical.insert(fi("/elsewhere/old.txt", 13, 900.0, "knownhash"));

        let data_dir = tempfile::TempDir::new().unwrap();
        let output_dir = data_dir.path().join("out");
        let store = SnapshotStore::new(data_dir.path(), "myhost");
        store.write_snapshot(&output_dir, &plan, &historical).unwrap();

        let blob_count = fs::read_dir(&output_dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name() != "data.json")
            .count();
        assert_eq!(blob_count, 0);
    }
}
