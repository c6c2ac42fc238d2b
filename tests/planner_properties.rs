// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan completeness property (spec.md §8): `added + modified + removed
//! + matched == |source| + |removed_only_in_dest|`, with no filename
//! appearing in more than one output bucket.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use strongbox::fingerprint::{FileInfo, FingerprintSet};
use strongbox::name_mapper::Identity;
use strongbox::planner::{diff, PlanEntry};

fn fi(path: &str, size: u64, mtime: f64, hash: &str) -> FileInfo {
    FileInfo::new(PathBuf::from(path), size, mtime, Some(hash.to_string()))
}

#[test]
fn mixed_add_modify_remove_matched_is_complete_and_partitioned() {
    let mut source = FingerprintSet::new();
    source.insert(fi("/a", 1, 1.0, "h1")); // matched
    source.insert(fi("/b", 2, 2.0, "h2new")); // modified
    source.insert(fi("/c", 3, 3.0, "h3")); // added

    let mut dest = FingerprintSet::new();
    dest.insert(fi("/a", 1, 1.0, "h1"));
    dest.insert(fi("/b", 2, 2.0, "h2old"));
    dest.insert(fi("/d", 4, 4.0, "h4")); // removed

    let plan = diff(&source, &dest, &Identity, false);

    assert_eq!(plan.added(), 1);
    assert_eq!(plan.modified(), 1);
    assert_eq!(plan.removed(), 1);
    assert_eq!(plan.matched, 1);

    let removed_only_in_dest = plan.removed();
    assert_eq!(
        plan.added() + plan.modified() + plan.removed() + plan.matched,
        source.len() + removed_only_in_dest
    );

    let mut seen: HashSet<PathBuf> = HashSet::new();
    for entry in &plan.entries {
        let path: &Path = match entry {
            PlanEntry::Add { source, .. } => &source.path,
            PlanEntry::Modify { source, .. } => &source.path,
            PlanEntry::Remove { dest } => &dest.path,
        };
        assert!(seen.insert(path.to_path_buf()), "path appeared in more than one bucket: {path:?}");
    }
}

#[test]
fn empty_source_and_dest_produce_empty_plan() {
    let source = FingerprintSet::new();
    let dest = FingerprintSet::new();
    let plan = diff(&source, &dest, &Identity, false);
    assert!(plan.is_empty());
    assert_eq!(plan.matched, 0);
}

#[test]
fn identical_sets_produce_all_matched_no_entries() {
    let mut source = FingerprintSet::new();
    source.insert(fi("/a", 1, 1.0, "h1"));
    source.insert(fi("/b", 2, 2.0, "h2"));
    let mut dest = FingerprintSet::new();
    dest.insert(fi("/a", 1, 1.0, "h1"));
    dest.insert(fi("/b", 2, 2.0, "h2"));

    let plan = diff(&source, &dest, &Identity, false);
    assert!(plan.is_empty());
    assert_eq!(plan.matched, 2);
}
