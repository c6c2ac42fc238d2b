// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered fold of snapshot manifests into a flat filename→blob map,
//! then materialization to disk (spec.md §4.8).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::ArchiverConfig;
use crate::errors::{BackupError, Result};
use crate::snapshot::archiver::Archiver;
use crate::snapshot::manifest::{self, ManifestEntry, Operation};

/// One per-snapshot violation recorded during replay; replay continues
/// past these (spec.md §4.8 step 2, §7).
#[derive(Debug, Clone)]
pub struct ReplayWarning {
    pub snapshot: String,
    pub filename: String,
    pub reason: String,
}

/// Result of folding a snapshot chain: the surviving filename→blob map
/// plus any warnings encountered along the way.
#[derive(Debug, Default)]
pub struct ReplayResult {
    pub mapping: HashMap<String, PathBuf>,
    pub warnings: Vec<ReplayWarning>,
}

/// Folds an ordered sequence of snapshot directories into a flat
/// filename→blob-path map, then materializes the surviving files.
pub struct RestoreReplay<'a> {
    archiver_config: &'a ArchiverConfig,
}

impl<'a> RestoreReplay<'a> {
    pub fn new(archiver_config: &'a ArchiverConfig) -> Self {
        Self { archiver_config }
    }

    /// Enumerates `source_root`'s immediate subdirectories in ascending
    /// name order — the replay order (spec.md §4.8, §5).
    fn snapshot_dirs(&self, source_root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(source_root)
            .map_err(|e| BackupError::io(source_root.to_path_buf(), e))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Locates (or extracts) `data.json` in `snapshot_dir`. A missing
    /// `data.json` with no archive present is a warning, not fatal —
    /// the snapshot is skipped entirely (spec.md §7).
    fn load_manifest(&self, snapshot_dir: &Path, extraction_dir: &Path) -> Option<(PathBuf, Vec<ManifestEntry>)> {
        let direct = snapshot_dir.join("data.json");
        if direct.exists() {
            return manifest::read_data_json(&direct).ok().map(|entries| (snapshot_dir.to_path_buf(), entries));
        }

        let archive = [snapshot_dir.join("Backup.7z"), snapshot_dir.join("Backup.7z.001")]
            .into_iter()
            .find(|path| path.exists());
        let Some(archive) = archive else {
            warn!(snapshot = %snapshot_dir.display(), "missing data.json and no archive to extract, skipping snapshot");
            return None;
        };

        let archiver = Archiver::new(self.archiver_config);
        if let Err(e) = archiver.unpack(&archive, extraction_dir) {
            warn!(snapshot = %snapshot_dir.display(), error = %e, "failed to extract archive, skipping snapshot");
            return None;
        }

        let extracted_manifest = extraction_dir.join("data.json");
        manifest::read_data_json(&extracted_manifest)
            .ok()
            .map(|entries| (extraction_dir.to_path_buf(), entries))
    }

    /// Folds every snapshot under `source_root` into a flat mapping.
    /// `dir_substitution` rewrites filename prefixes (`from` -> `to`)
    /// before recording each mapping entry.
    pub fn fold(&self, source_root: &Path, dir_substitution: Option<(&str, &str)>) -> Result<ReplayResult> {
        let mut result = ReplayResult::default();
        let mut blob_dirs: Vec<PathBuf> = Vec::new();

        for snapshot_dir in self.snapshot_dirs(source_root)? {
            let snapshot_name = snapshot_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let extraction_dir = snapshot_dir.join(".restore-extract");
            let Some((blob_dir, entries)) = self.load_manifest(&snapshot_dir, &extraction_dir) else {
                continue;
            };
            blob_dirs.push(blob_dir);

            for entry in entries {
                let filename = apply_substitution(&entry.filename, dir_substitution);
                match entry.operation {
                    Operation::Add => {
                        if result.mapping.contains_key(&filename) {
                            result.warnings.push(ReplayWarning {
                                snapshot: snapshot_name.clone(),
                                filename,
                                reason: "add of filename already present in accumulator".into(),
                            });
                            continue;
                        }
                        match self.resolve_blob(&blob_dirs, &entry.hash) {
                            Some(blob) => {
                                result.mapping.insert(filename, blob);
                            }
                            None => result.warnings.push(ReplayWarning {
                                snapshot: snapshot_name.clone(),
                                filename,
                                reason: format!("blob '{}' missing", entry.hash),
                            }),
                        }
                    }
                    Operation::Modify => {
                        if !result.mapping.contains_key(&filename) {
                            result.warnings.push(ReplayWarning {
                                snapshot: snapshot_name.clone(),
                                filename,
                                reason: "modify of filename not present in accumulator".into(),
                            });
                            continue;
                        }
                        match self.resolve_blob(&blob_dirs, &entry.hash) {
                            Some(blob) => {
                                result.mapping.insert(filename, blob);
                            }
                            None => result.warnings.push(ReplayWarning {
                                snapshot: snapshot_name.clone(),
                                filename,
                                reason: format!("blob '{}' missing", entry.hash),
                            }),
                        }
                    }
                    Operation::Remove => {
                        if result.mapping.remove(&filename).is_none() {
                            result.warnings.push(ReplayWarning {
                                snapshot: snapshot_name.clone(),
                                filename,
                                reason: "remove of filename not present in accumulator".into(),
                            });
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// A blob may have been deduplicated away in an earlier snapshot
    /// (spec.md §4.7), so search backward through every snapshot
    /// directory visited so far before giving up.
    fn resolve_blob(&self, blob_dirs: &[PathBuf], hash: &str) -> Option<PathBuf> {
        blob_dirs.iter().rev().find_map(|dir| {
            let path = dir.join(hash);
            path.exists().then_some(path)
        })
    }

    /// Materializes the surviving mapping into `destination_root`:
    /// creates parent directories and copies each blob to its filename.
    pub fn materialize(&self, mapping: &HashMap<String, PathBuf>, destination_root: &Path) -> Result<()> {
        for (filename, blob) in mapping {
            let target = destination_root.join(filename.trim_start_matches(['/', '\\']));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BackupError::io(parent.to_path_buf(), e))?;
            }
            std::fs::copy(blob, &target).map_err(|e| BackupError::io(target, e))?;
        }
        Ok(())
    }
}

fn apply_substitution(filename: &str, dir_substitution: Option<(&str, &str)>) -> String {
    match dir_substitution {
        Some((from, to)) if filename.starts_with(from) => format!("{to}{}", &filename[from.len()..]),
        _ => filename.to_string(),
    }
}
