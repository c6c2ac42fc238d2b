// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diffs two fingerprint sets into add/modify/remove work (spec.md §4.4).

use std::path::PathBuf;

use crate::fingerprint::{FileInfo, FingerprintSet};
use crate::name_mapper::NameMapper;
use crate::output::SummaryCounts;

#[derive(Debug, Clone)]
pub enum PlanEntry {
    Add {
        source: FileInfo,
        dest_path: PathBuf,
    },
    Modify {
        source: FileInfo,
        dest: FileInfo,
    },
    Remove {
        dest: FileInfo,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    pub matched: usize,
}

impl Plan {
    pub fn added(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, PlanEntry::Add { .. }))
            .count()
    }

    pub fn modified(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, PlanEntry::Modify { .. }))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, PlanEntry::Remove { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> SummaryCounts {
        SummaryCounts {
            added: self.added(),
            modified: self.modified(),
            removed: self.removed(),
            matched: self.matched,
        }
    }
}

/// Diff `source` against `dest` using `mapper` to translate between
/// the two namespaces. Output is stable-ordered: adds/modifies by
/// source path, then removes by dest path.
pub fn diff(
    source: &FingerprintSet,
    dest: &FingerprintSet,
    mapper: &dyn NameMapper,
    simple_compare: bool,
) -> Plan {
    let mut sources: Vec<&FileInfo> = source.values().collect();
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    let mut entries = Vec::new();
    let mut matched = 0;

    for sfi in sources {
        let dest_path = mapper.to_dest(&sfi.path);
        match dest.get(&dest_path) {
            None => entries.push(PlanEntry::Add {
                source: sfi.clone(),
                dest_path,
            }),
            Some(dfi) => {
                if sfi.matches(dfi, simple_compare) {
                    matched += 1;
                } else {
                    entries.push(PlanEntry::Modify {
                        source: sfi.clone(),
                        dest: dfi.clone(),
                    });
                }
            }
        }
    }

    let mut dests: Vec<&FileInfo> = dest.values().collect();
    dests.sort_by(|a, b| a.path.cmp(&b.path));

    for dfi in dests {
        let source_path = mapper.from_dest(&dfi.path);
        if !source.contains(&source_path) {
            entries.push(PlanEntry::Remove { dest: dfi.clone() });
        }
    }

    Plan { entries, matched }
}
