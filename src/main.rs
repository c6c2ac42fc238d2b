// SPDX-License-Identifier: MIT OR Apache-2.0

//! strongbox - content-addressed file backup engine.
//!
//! CLI entry point: parses arguments, wires the library modules
//! together, and converts `BackupError` to `anyhow::Result` at the
//! boundary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use strongbox::cli::{Cli, Commands, ScanArgs};
use strongbox::config::Config;
use strongbox::fingerprint::{FingerprintSet, Fingerprinter};
use strongbox::hash_pipeline::{CancellationToken, HashPipeline};
use strongbox::name_mapper::{Identity, Rebase};
use strongbox::output;
use strongbox::planner::{self, Plan};
use strongbox::restore::RestoreReplay;
use strongbox::scanner::Scanner;
use strongbox::snapshot::archiver::Archiver;
use strongbox::snapshot::SnapshotStore;

fn main() -> Result<()> {
    let cli = Cli::parse();
    strongbox::logging::init(cli.verbose);

    let config = Config::load();
    let exit_code = match cli.command {
        Commands::Mirror {
            destination,
            scan,
            force,
        } => run_mirror(&config, destination, scan, force)?,
        Commands::Offsite {
            backup_name,
            output_dir,
            scan,
            archive,
            archive_password,
        } => run_offsite(&config, backup_name, output_dir, scan, archive, archive_password)?,
        Commands::CommitOffsite {
            backup_name,
            archive_suffix,
        } => run_commit_offsite(&config, backup_name, archive_suffix)?,
        Commands::OffsiteRestore {
            source_root,
            destination,
            dir_substitution,
        } => run_offsite_restore(&config, source_root, destination, dir_substitution)?,
    };

    std::process::exit(exit_code);
}

fn build_pipeline(config: &Config, scan: &ScanArgs) -> HashPipeline {
    let hash = &config.hash;
    HashPipeline::new(
        Fingerprinter::new(hash.block_size()),
        scan.ssd,
        hash.ssd_workers(),
        hash.queue_capacity(),
        Duration::from_millis(hash.poll_timeout_ms()),
        hash.inline_cutover_bytes(),
    )
}

fn scan_and_hash(config: &Config, scan: &ScanArgs) -> Result<FingerprintSet> {
    let scanner = Scanner::new(scan.inputs.clone())
        .with_include(scan.include.clone())
        .with_exclude(scan.exclude.clone())
        .with_traverse_include(scan.traverse_include.clone())
        .with_traverse_exclude(scan.traverse_exclude.clone());
    let paths = scanner.scan().context("scanning inputs")?;

    let pipeline = build_pipeline(config, scan);
    let cancel = CancellationToken::new();
    let infos = pipeline
        .run(&paths, scan.simple_compare, &cancel)
        .context("hashing inputs")?;
    Ok(FingerprintSet::from_vec(infos))
}

fn display_plan(plan: &Plan) {
    println!("\nFiles to Add ({})", plan.added());
    for entry in &plan.entries {
        if let strongbox::planner::PlanEntry::Add { source, .. } = entry {
            println!("  {}", source.path.display());
        }
    }
    println!("\nFiles to Modify ({})", plan.modified());
    for entry in &plan.entries {
        if let strongbox::planner::PlanEntry::Modify { source, .. } = entry {
            println!("  {}", source.path.display());
        }
    }
    println!("\nFiles to Remove ({})", plan.removed());
    for entry in &plan.entries {
        if let strongbox::planner::PlanEntry::Remove { dest } = entry {
            println!("  {}", dest.path.display());
        }
    }
}

fn log_plan_entries(plan: &Plan) {
    for entry in &plan.entries {
        match entry {
            strongbox::planner::PlanEntry::Add { source, .. } => {
                tracing::debug!("[Add] '{}' does not exist.", source.path.display());
            }
            strongbox::planner::PlanEntry::Modify { source, .. } => {
                tracing::debug!("[Modify] '{}' has changed.", source.path.display());
            }
            strongbox::planner::PlanEntry::Remove { dest } => {
                tracing::debug!("[Remove] '{}' will be removed.", dest.path.display());
            }
        }
    }
}

fn run_mirror(config: &Config, destination: PathBuf, scan: ScanArgs, force: bool) -> Result<i32> {
    let source = scan_and_hash(config, &scan)?;

    let source_paths: Vec<PathBuf> = source.values().map(|fi| fi.path.clone()).collect();
    let mapper = Rebase::new(destination.clone(), &source_paths);

    let dest = if force || !destination.is_dir() {
        FingerprintSet::new()
    } else {
        let dest_scanner = Scanner::new(vec![destination.clone()]);
        let dest_paths = dest_scanner.scan().context("scanning destination")?;
        let pipeline = build_pipeline(config, &scan);
        let cancel = CancellationToken::new();
        let infos = pipeline
            .run(&dest_paths, scan.simple_compare, &cancel)
            .context("hashing destination")?;
        FingerprintSet::from_vec(infos)
    };

    let plan = planner::diff(&source, &dest, &mapper, scan.simple_compare);

    if scan.verbose_entries {
        log_plan_entries(&plan);
    }

    if scan.display_only {
        display_plan(&plan);
        return Ok(if plan.is_empty() { 1 } else { 0 });
    }

    if plan.is_empty() {
        if !scan.no_status {
            println!("Nothing to do.");
        }
        return Ok(1);
    }

    let results = strongbox::mirror::MirrorExecutor::apply(&plan);
    let succeeded = strongbox::mirror::MirrorExecutor::all_succeeded(&results);
    for result in &results {
        if let Some(error) = &result.error {
            output::error(&format!("{}: {error}", result.description));
        }
    }

    if !scan.no_status {
        plan.summary().print();
    }

    Ok(if succeeded { 0 } else { 2 })
}

fn run_offsite(
    config: &Config,
    backup_name: String,
    output_dir: PathBuf,
    scan: ScanArgs,
    archive: bool,
    archive_password: Option<String>,
) -> Result<i32> {
    let source = scan_and_hash(config, &scan)?;

    let store = SnapshotStore::new(config.data_dir(), &backup_name);
    let historical = store.historical();

    let plan = planner::diff(&source, &historical, &Identity, scan.simple_compare);

    if scan.verbose_entries {
        log_plan_entries(&plan);
    }

    if scan.display_only {
        display_plan(&plan);
        return Ok(if plan.is_empty() { 1 } else { 0 });
    }

    store.write_snapshot(&output_dir, &plan, &historical)?;
    store.write_pending(&source)?;

    if archive {
        let work_dir = output_dir.join(".archive-work");
        let archiver = Archiver::new(&config.archiver);
        archiver
            .pack(&output_dir, &work_dir, archive_password.as_deref())
            .context("packing snapshot")?;
        swap_into_place(&work_dir, &output_dir).context("swapping archive into place")?;
    }

    if !scan.no_status {
        plan.summary().print();
        println!(
            "\nSnapshot written to '{}'. Run `commit-offsite --backup-name {backup_name}` to finalize.",
            output_dir.display()
        );
    }

    Ok(if plan.is_empty() { 1 } else { 0 })
}

/// Swaps `work_dir`'s contents into `output_dir`, replacing whatever is
/// there (the raw blobs + `data.json`) with the packed archive
/// (spec.md §4.7). `work_dir` is a subdirectory of `output_dir`, so its
/// siblings are cleared first and its own entries are moved up one
/// level before the now-empty directory is removed.
fn swap_into_place(work_dir: &PathBuf, output_dir: &PathBuf) -> Result<()> {
    for entry in std::fs::read_dir(output_dir).context("reading output_dir")? {
        let entry = entry.context("reading output_dir entry")?;
        let path = entry.path();
        if path == *work_dir {
            continue;
        }
        if entry.file_type().context("reading entry file type")?.is_dir() {
            std::fs::remove_dir_all(&path).with_context(|| format!("removing '{}'", path.display()))?;
        } else {
            std::fs::remove_file(&path).with_context(|| format!("removing '{}'", path.display()))?;
        }
    }

    for entry in std::fs::read_dir(work_dir).context("reading work_dir")? {
        let entry = entry.context("reading work_dir entry")?;
        let src = entry.path();
        let dest = output_dir.join(entry.file_name());
        std::fs::rename(&src, &dest)
            .with_context(|| format!("moving '{}' to '{}'", src.display(), dest.display()))?;
    }

    std::fs::remove_dir(work_dir).with_context(|| format!("removing '{}'", work_dir.display()))?;
    Ok(())
}

fn run_commit_offsite(config: &Config, backup_name: String, archive_suffix: Option<String>) -> Result<i32> {
    let store = SnapshotStore::new(config.data_dir(), &backup_name);
    match store.commit(archive_suffix.as_deref()) {
        Ok(()) => Ok(0),
        Err(e) => {
            output::error(&e.to_string());
            Ok(3)
        }
    }
}

fn run_offsite_restore(
    config: &Config,
    source_root: PathBuf,
    destination: PathBuf,
    dir_substitution: Option<String>,
) -> Result<i32> {
    let substitution = dir_substitution
        .as_deref()
        .and_then(|spec| spec.split_once('='));

    let replay = RestoreReplay::new(&config.archiver);
    let result = replay
        .fold(&source_root, substitution)
        .context("replaying snapshot chain")?;

    for warning in &result.warnings {
        output::warning(&format!(
            "[{}] {}: {}",
            warning.snapshot, warning.filename, warning.reason
        ));
    }

    replay
        .materialize(&result.mapping, &destination)
        .context("materializing restored files")?;

    println!("Restored {} files to '{}'.", result.mapping.len(), destination.display());
    Ok(0)
}
