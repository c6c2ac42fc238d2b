// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap (spec.md §6).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// strongbox - content-addressed file backup engine
///
/// Mirrors a destination tree to a set of inputs, produces deduplicated
/// offsite snapshots with a pending/commit manifest protocol, and
/// restores a point-in-time view by replaying a snapshot chain.
#[derive(Parser, Debug)]
#[command(name = "strongbox", author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); overridden by STRONGBOX_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs/filters shared by every scanning command.
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// File or directory inputs to scan (repeatable)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Include only paths matching this pattern (repeatable)
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Exclude paths matching this pattern (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Only descend into directories matching this pattern (repeatable)
    #[arg(long = "traverse-include")]
    pub traverse_include: Vec<String>,

    /// Do not descend into directories matching this pattern (repeatable)
    #[arg(long = "traverse-exclude")]
    pub traverse_exclude: Vec<String>,

    /// Use the parallel (SSD) hashing strategy instead of rotational
    #[arg(long)]
    pub ssd: bool,

    /// Compare by size+mtime only, skipping content hashing
    #[arg(long = "simple-compare")]
    pub simple_compare: bool,

    /// Show what would change without touching the filesystem
    #[arg(long = "display-only")]
    pub display_only: bool,

    /// Log each add/modify/remove decision at debug level
    #[arg(long)]
    pub verbose_entries: bool,

    /// Suppress the summary/percentage status output
    #[arg(long = "no-status")]
    pub no_status: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize a destination directory to match the inputs
    Mirror {
        /// Destination directory to mirror into
        #[arg(long)]
        destination: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Re-copy everything as Adds instead of diffing the destination
        #[arg(long)]
        force: bool,
    },

    /// Produce a deduplicated offsite snapshot (pending, not yet committed)
    Offsite {
        /// Backup name namespacing the historical manifest
        #[arg(long)]
        backup_name: String,

        /// Directory to write this snapshot's data.json and blobs into
        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Pack output_dir through the external archiver after writing
        #[arg(long)]
        archive: bool,

        /// Password for the archiver, if --archive is set
        #[arg(long)]
        archive_password: Option<String>,
    },

    /// Commit a previously written offsite snapshot's pending manifest
    CommitOffsite {
        /// Backup name whose pending manifest should be committed
        #[arg(long)]
        backup_name: String,

        /// Also copy the committed manifest aside under this suffix
        #[arg(long)]
        archive_suffix: Option<String>,
    },

    /// Restore a point-in-time view by replaying a snapshot chain
    OffsiteRestore {
        /// Directory containing one subdirectory per historical snapshot
        #[arg(long)]
        source_root: PathBuf,

        /// Directory to materialize the restored files into
        #[arg(long)]
        destination: PathBuf,

        /// Rewrite filename prefixes: "from=to"
        #[arg(long = "dir-substitution")]
        dir_substitution: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn mirror_parses_inputs_and_flags() {
        let cli = Cli::try_parse_from([
            "strongbox",
            "mirror",
            "--destination",
            "/backup",
            "/src/a",
            "/src/b",
            "--force",
            "--ssd",
        ])
        .expect("parse mirror");

        match cli.command {
            Commands::Mirror { destination, scan, force } => {
                assert_eq!(destination, PathBuf::from("/backup"));
                assert_eq!(scan.inputs, vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")]);
                assert!(force);
                assert!(scan.ssd);
            }
            other => panic!("expected mirror command, got {other:?}"),
        }
    }

    #[test]
    fn offsite_requires_backup_name_and_output_dir() {
        let result = Cli::try_parse_from(["strongbox", "offsite", "/src"]);
        assert!(result.is_err());
    }

    #[test]
    fn offsite_restore_parses_dir_substitution() {
        let cli = Cli::try_parse_from([
            "strongbox",
            "offsite-restore",
            "--source-root",
            "/snaps",
            "--destination",
            "/out",
            "--dir-substitution",
            "/src=/dst",
        ])
        .expect("parse offsite-restore");

        match cli.command {
            Commands::OffsiteRestore {
                source_root,
                destination,
                dir_substitution,
            } => {
                assert_eq!(source_root, PathBuf::from("/snaps"));
                assert_eq!(destination, PathBuf::from("/out"));
                assert_eq!(dir_substitution.as_deref(), Some("/src=/dst"));
            }
            other => panic!("expected offsite-restore command, got {other:?}"),
        }
    }
}
