// SPDX-License-Identifier: MIT OR Apache-2.0

//! External 7z-compatible archiver invocation (spec.md §6). The
//! archiver itself is a black box; only its file-list/volume/exit-code
//! protocol is specified.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::ArchiverConfig;
use crate::errors::{BackupError, Result};

/// Invokes the configured archiver to pack every path under
/// `output_dir` into a multi-volume `Backup.7z[.NNN]` archive inside
/// `work_dir`.
pub struct Archiver<'a> {
    config: &'a ArchiverConfig,
}

impl<'a> Archiver<'a> {
    pub fn new(config: &'a ArchiverConfig) -> Self {
        Self { config }
    }

    /// Lists every regular file under `output_dir`, one path per line,
    /// into `<work_dir>/filelist.txt`.
    fn write_file_list(&self, output_dir: &Path, work_dir: &Path) -> Result<PathBuf> {
        let list_path = work_dir.join("filelist.txt");
        let mut lines = String::new();
        for entry in walkdir::WalkDir::new(output_dir)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if entry.file_type().is_file() {
                lines.push_str(&entry.path().to_string_lossy());
                lines.push('\n');
            }
        }
        std::fs::write(&list_path, lines).map_err(|e| BackupError::io(list_path.clone(), e))?;
        Ok(list_path)
    }

    /// Packs `output_dir` into `<work_dir>/Backup.7z[.NNN]`. Returns the
    /// archive's base path (without volume suffix).
    pub fn pack(&self, output_dir: &Path, work_dir: &Path, password: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(work_dir).map_err(|e| BackupError::io(work_dir.to_path_buf(), e))?;
        let list_path = self.write_file_list(output_dir, work_dir)?;
        let archive_path = work_dir.join("Backup.7z");

        let mut command = Command::new(self.config.binary());
        command
            .arg("a")
            .arg(format!("-v{}b", self.config.volume_bytes()))
            .arg(format!("-mx{}", self.config.compression_level()))
            .arg(format!("-i@{}", list_path.display()));
        if let Some(password) = password {
            command.arg(format!("-p{password}")).arg("-mhe=on");
        }
        command.arg(&archive_path);

        debug!(?command, "invoking archiver");
        let status = command
            .status()
            .map_err(|e| BackupError::io(archive_path.clone(), e))?;
        if !status.success() {
            return Err(BackupError::ArchiverFailure { code: status.code() });
        }

        Ok(archive_path)
    }

    /// Extracts `archive_path` (its first volume, if multi-volume) into
    /// `dest_dir`.
    pub fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dest_dir).map_err(|e| BackupError::io(dest_dir.to_path_buf(), e))?;

        let mut command = Command::new(self.config.binary());
        command
            .arg("x")
            .arg(archive_path)
            .arg(format!("-o{}", dest_dir.display()))
            .arg("-y");

        debug!(?command, "invoking archiver for extraction");
        let status = command
            .status()
            .map_err(|e| BackupError::io(archive_path.to_path_buf(), e))?;
        if !status.success() {
            return Err(BackupError::ArchiverFailure { code: status.code() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_list_contains_every_regular_file_under_output_dir() {
        let output_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(output_dir.path().join("a"), b"1").unwrap();
        std::fs::create_dir(output_dir.path().join("sub")).unwrap();
        std::fs::write(output_dir.path().join("sub/b"), b"2").unwrap();

        let work_dir = tempfile::TempDir::new().unwrap();
        let config = ArchiverConfig::default();
        let archiver = Archiver::new(&config);
        let list_path = archiver.write_file_list(output_dir.path(), work_dir.path()).unwrap();

        let content = std::fs::read_to_string(&list_path).unwrap();
        assert!(content.contains("a"));
        assert!(content.contains("b"));
        assert_eq!(content.lines().count(), 2);
    }
}
