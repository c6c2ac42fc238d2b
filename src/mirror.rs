// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applies a [`Plan`] to a local destination directory: copy-with-temp-
//! rename for add/modify, unlink for remove (spec.md §4.6).

use std::path::{Path, PathBuf};

use crate::errors::{BackupError, Result};
use crate::planner::{Plan, PlanEntry};

/// Outcome of applying one plan entry.
pub struct TaskResult {
    pub description: String,
    pub error: Option<BackupError>,
}

impl TaskResult {
    fn ok(description: String) -> Self {
        Self {
            description,
            error: None,
        }
    }

    fn failed(description: String, error: BackupError) -> Self {
        Self {
            description,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Applies a plan to a destination directory. Per-file failures are
/// captured, the file is skipped, and execution continues; the overall
/// operation reports failure if any task failed. Sequential by default
/// (one worker) per spec.md §4.6.
pub struct MirrorExecutor;

impl MirrorExecutor {
    pub fn apply(plan: &Plan) -> Vec<TaskResult> {
        let mut results = Vec::new();

        for entry in &plan.entries {
            match entry {
                PlanEntry::Add { source, dest_path } => {
                    results.push(copy_with_temp_rename(&source.path, dest_path));
                }
                PlanEntry::Modify { source, dest } => {
                    results.push(copy_with_temp_rename(&source.path, &dest.path));
                }
                PlanEntry::Remove { dest } => {
                    results.push(remove_file(&dest.path));
                }
            }
        }

        results
    }

    pub fn all_succeeded(results: &[TaskResult]) -> bool {
        results.iter().all(TaskResult::is_ok)
    }
}

fn copy_with_temp_rename(source: &Path, dest: &Path) -> TaskResult {
    let description = format!("copy '{}' to '{}'", source.display(), dest.display());

    let run = || -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackupError::io(parent.to_path_buf(), e))?;
        }

        let temp = temp_path(dest);
        let _ = std::fs::remove_file(&temp);

        std::fs::copy(source, &temp).map_err(|e| BackupError::io(source.to_path_buf(), e))?;
        if let Ok(metadata) = std::fs::metadata(source) {
            let mtime = filetime::FileTime::from_last_modification_time(&metadata);
            let _ = filetime::set_file_mtime(&temp, mtime);
        }

        let _ = std::fs::remove_file(dest);
        std::fs::rename(&temp, dest).map_err(|e| BackupError::io(dest.to_path_buf(), e))?;
        Ok(())
    };

    match run() {
        Ok(()) => TaskResult::ok(description),
        Err(e) => TaskResult::failed(description, e),
    }
}

fn remove_file(path: &Path) -> TaskResult {
    let description = format!("remove '{}'", path.display());
    match std::fs::remove_file(path) {
        Ok(()) => TaskResult::ok(description),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => TaskResult::ok(description),
        Err(e) => TaskResult::failed(description, BackupError::io(path.to_path_buf(), e)),
    }
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut os_string = dest.as_os_str().to_os_string();
    os_string.push(".copying");
    PathBuf::from(os_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_mapper::{Identity, NameMapper};
    use crate::planner::diff;
    use crate::fingerprint::{FileInfo, FingerprintSet};
    use std::fs;

    #[test]
    fn mirror_add_creates_destination_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let source_path = dir.path().join("x.txt");
        fs::write(&source_path, b"hi\n").unwrap();
        let dest_path = dir.path().join("dest/x.txt");

        let mut source = FingerprintSet::new();
        source.insert(FileInfo::new(source_path.clone(), 3, 1000.0, Some("h".into())));
        let dest = FingerprintSet::new();
        let mapper = FixedMapper {
            to: dest_path.clone(),
            from: source_path.clone(),
        };

        let plan = diff(&source, &dest, &mapper, false);
        assert_eq!(plan.added(), 1);

        let results = MirrorExecutor::apply(&plan);
        assert!(MirrorExecutor::all_succeeded(&results));
        assert_eq!(fs::read(&dest_path).unwrap(), b"hi\n");
    }

    #[test]
    fn mirror_modify_overwrites_destination_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let source_path = dir.path().join("x.txt");
        fs::write(&source_path, b"hiya").unwrap();
        let dest_path = dir.path().join("x_dest.txt");
        fs::write(&dest_path, b"hi\n").unwrap();

        let mut source = FingerprintSet::new();
        source.insert(FileInfo::new(source_path.clone(), 4, 1000.0, Some("h2".into())));
        let mut dest = FingerprintSet::new();
        dest.insert(FileInfo::new(dest_path.clone(), 3, 1000.0, Some("h1".into())));

        let mapper = FixedMapper {
            to: dest_path.clone(),
            from: source_path.clone(),
        };

        let plan = diff(&source, &dest, &mapper, false);
        assert_eq!(plan.modified(), 1);

        let results = MirrorExecutor::apply(&plan);
        assert!(MirrorExecutor::all_succeeded(&results));
        assert_eq!(fs::read(&dest_path).unwrap(), b"hiya");
    }

    #[test]
    fn mirror_remove_deletes_extraneous_destination_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest_path = dir.path().join("y.txt");
        fs::write(&dest_path, b"stale").unwrap();

        let source = FingerprintSet::new();
        let mut dest = FingerprintSet::new();
        dest.insert(FileInfo::new(dest_path.clone(), 5, 1000.0, Some("h".into())));

        let plan = diff(&source, &dest, &Identity, false);
        assert_eq!(plan.removed(), 1);

        let results = MirrorExecutor::apply(&plan);
        assert!(MirrorExecutor::all_succeeded(&results));
        assert!(!dest_path.exists());
    }

    #[test]
    fn copy_failure_is_captured_and_does_not_abort_other_tasks() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing_source = dir.path().join("missing.txt");
        let present_source = dir.path().join("present.txt");
        fs::write(&present_source, b"ok").unwrap();

        let mut source = FingerprintSet::new();
        source.insert(FileInfo::new(missing_source.clone(), 0, 1000.0, None));
        source.insert(FileInfo::new(present_source.clone(), 2, 1000.0, Some("h".into())));
        let dest = FingerprintSet::new();

        let plan = diff(&source, &dest, &Identity, false);
        let results = MirrorExecutor::apply(&plan);
        assert!(!MirrorExecutor::all_succeeded(&results));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }

    struct FixedMapper {
        to: PathBuf,
        from: PathBuf,
    }

    impl NameMapper for FixedMapper {
        fn to_dest(&self, _source: &Path) -> PathBuf {
            self.to.clone()
        }
        fn from_dest(&self, _dest: &Path) -> PathBuf {
            self.from.clone()
        }
    }
}
