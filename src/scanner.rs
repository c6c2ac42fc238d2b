// SPDX-License-Identifier: MIT OR Apache-2.0

//! File scanner: input expansion, include/exclude filtering, and
//! traverse-include/traverse-exclude directory-descent filtering
//! (spec.md §4.1).

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::{BackupError, Result};

/// Builds the "`^.*<sep><expr><sep>.*$`" pattern spec.md §4.1 specifies:
/// the expression must match a path component bounded by separators.
fn compile_bounded_pattern(expr: &str) -> Result<Regex> {
    let sep = regex::escape(&std::path::MAIN_SEPARATOR.to_string());
    let pattern = format!("^.*{sep}{expr}{sep}.*$");
    Regex::new(&pattern).map_err(|source| BackupError::InvalidPattern {
        pattern: expr.to_string(),
        source,
    })
}

fn compile_all(exprs: &[String]) -> Result<Vec<Regex>> {
    exprs.iter().map(|e| compile_bounded_pattern(e)).collect()
}

/// Compiles traverse-include/traverse-exclude patterns as-is, matched
/// against a bare directory name (no separators to bound against).
fn compile_bare(exprs: &[String]) -> Result<Vec<Regex>> {
    exprs
        .iter()
        .map(|e| {
            Regex::new(e).map_err(|source| BackupError::InvalidPattern {
                pattern: e.clone(),
                source,
            })
        })
        .collect()
}

/// Expands a list of inputs (files or directories) into a deduplicated
/// list of absolute file paths, applying include/exclude filters on the
/// full path and traverse-include/traverse-exclude filters on directory
/// names encountered during descent.
pub struct Scanner {
    inputs: Vec<PathBuf>,
    include: Vec<String>,
    exclude: Vec<String>,
    traverse_include: Vec<String>,
    traverse_exclude: Vec<String>,
}

impl Scanner {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            include: Vec::new(),
            exclude: Vec::new(),
            traverse_include: Vec::new(),
            traverse_exclude: Vec::new(),
        }
    }

    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_traverse_include(mut self, traverse_include: Vec<String>) -> Self {
        self.traverse_include = traverse_include;
        self
    }

    pub fn with_traverse_exclude(mut self, traverse_exclude: Vec<String>) -> Self {
        self.traverse_exclude = traverse_exclude;
        self
    }

    /// Scan all inputs, returning a deduplicated, sorted list of
    /// absolute file paths.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let include_regexes = compile_all(&self.include)?;
        let traverse_include_regexes = compile_bare(&self.traverse_include)?;
        let traverse_exclude_regexes = compile_bare(&self.traverse_exclude)?;
        let exclude_regexes = compile_all(&self.exclude)?;

        let mut files = Vec::new();
        let mut dirs = Vec::new();

        for input in &self.inputs {
            if input.is_file() {
                files.push(input.clone());
            } else if input.is_dir() {
                dirs.push(input.clone());
            } else {
                return Err(BackupError::InvalidInput {
                    path: input.clone(),
                });
            }
        }

        for dir in &dirs {
            let walker = WalkDir::new(dir).follow_links(true).into_iter().filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if !traverse_include_regexes.is_empty()
                    && !traverse_include_regexes.iter().any(|r| r.is_match(&name))
                {
                    return false;
                }
                if traverse_exclude_regexes.iter().any(|r| r.is_match(&name)) {
                    return false;
                }
                true
            });

            for entry in walker {
                let Ok(entry) = entry else { continue };
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        }

        let matches_includes = |path: &Path| -> bool {
            let path_str = path.to_string_lossy();
            let included =
                include_regexes.is_empty() || include_regexes.iter().any(|r| r.is_match(&path_str));
            let excluded = exclude_regexes.iter().any(|r| r.is_match(&path_str));
            included && !excluded
        };

        let mut seen = HashSet::new();
        let mut result: Vec<PathBuf> = files
            .into_iter()
            .filter(|path| matches_includes(path))
            .filter(|path| seen.insert(path.clone()))
            .collect();
        result.sort();
        Ok(result)
    }
}
