// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic source<->dest name mapping for mirror mode (spec.md §4.5).

use std::path::{Component, Path, PathBuf};

/// Maps between source and destination path namespaces. Implementations
/// must satisfy `from_dest(to_dest(p)) == p` for every source path `p`.
pub trait NameMapper: Send + Sync {
    fn to_dest(&self, source: &Path) -> PathBuf;
    fn from_dest(&self, dest: &Path) -> PathBuf;
}

/// Used when no local destination directory is specified (e.g. offsite
/// snapshot): the dest namespace is the source namespace.
pub struct Identity;

impl NameMapper for Identity {
    fn to_dest(&self, source: &Path) -> PathBuf {
        source.to_path_buf()
    }

    fn from_dest(&self, dest: &Path) -> PathBuf {
        dest.to_path_buf()
    }
}

/// Used for mirror. Decides multi-drive vs single-root by inspecting
/// whether all source paths share the same volume/drive prefix.
pub struct Rebase {
    destination_root: PathBuf,
    strategy: RebaseStrategy,
}

enum RebaseStrategy {
    MultiDrive,
    SingleRoot { common: PathBuf },
}

impl Rebase {
    /// Build a rebase mapper from the full set of source paths that will
    /// be mapped. `destination_root` must lie outside every source tree
    /// (spec.md §4.5's documented single-root inverse ambiguity).
    pub fn new(destination_root: PathBuf, source_paths: &[PathBuf]) -> Self {
        let strategy = if is_multi_drive(source_paths) {
            RebaseStrategy::MultiDrive
        } else {
            RebaseStrategy::SingleRoot {
                common: common_path_for(source_paths),
            }
        };
        Self {
            destination_root,
            strategy,
        }
    }
}

impl NameMapper for Rebase {
    fn to_dest(&self, source: &Path) -> PathBuf {
        match &self.strategy {
            RebaseStrategy::MultiDrive => {
                let (drive, rest) = split_drive(source);
                let escaped_drive = drive.replace(':', "_");
                self.destination_root
                    .join(escaped_drive)
                    .join(strip_leading_sep(&rest))
            }
            RebaseStrategy::SingleRoot { common } => {
                let stripped = source.strip_prefix(common).unwrap_or(source);
                self.destination_root.join(stripped)
            }
        }
    }

    fn from_dest(&self, dest: &Path) -> PathBuf {
        match &self.strategy {
            RebaseStrategy::MultiDrive => {
                let stripped = dest.strip_prefix(&self.destination_root).unwrap_or(dest);
                let mut components: Vec<String> = stripped
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(os) => Some(os.to_string_lossy().to_string()),
                        _ => None,
                    })
                    .collect();
                if let Some(first) = components.first_mut() {
                    *first = first.replace('_', ":");
                }
                PathBuf::from_iter(components)
            }
            RebaseStrategy::SingleRoot { common } => {
                let stripped = dest.strip_prefix(&self.destination_root).unwrap_or(dest);
                common.join(stripped)
            }
        }
    }
}

fn is_multi_drive(paths: &[PathBuf]) -> bool {
    let mut drive: Option<String> = None;
    for path in paths {
        let (this_drive, _) = split_drive(path);
        match &drive {
            None => drive = Some(this_drive),
            Some(d) if *d != this_drive => return true,
            _ => {}
        }
    }
    false
}

/// Splits a path's drive/volume prefix from the rest. On platforms
/// without drive letters this is always `("", path)`.
fn split_drive(path: &Path) -> (String, PathBuf) {
    let mut components = path.components();
    if let Some(Component::Prefix(prefix)) = components.next() {
        let drive = prefix.as_os_str().to_string_lossy().to_string();
        let rest: PathBuf = components.collect();
        (drive, rest)
    } else {
        (String::new(), path.to_path_buf())
    }
}

fn strip_leading_sep(path: &Path) -> PathBuf {
    let mut components = path.components().peekable();
    if matches!(components.peek(), Some(Component::RootDir)) {
        components.next();
    }
    components.collect()
}

/// The single-root common path. Open question (spec.md §9): when the
/// source set reduces to one file, the reference uses `dirname(that
/// file)` rather than the file itself, so the dest name keeps the
/// file's basename but not its parent's name. Reproduced here.
fn common_path_for(paths: &[PathBuf]) -> PathBuf {
    if paths.len() == 1 {
        return paths[0]
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(std::path::MAIN_SEPARATOR.to_string()));
    }

    let mut iter = paths.iter();
    let first = match iter.next() {
        Some(p) => p.components().collect::<Vec<_>>(),
        None => return PathBuf::new(),
    };

    let mut common_len = first.len();
    for path in iter {
        let components: Vec<_> = path.components().collect();
        let mut shared = 0;
        while shared < common_len && shared < components.len() && components[shared] == first[shared] {
            shared += 1;
        }
        common_len = shared;
    }

    first[..common_len].iter().collect()
}
