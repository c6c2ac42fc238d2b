// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives the [`Fingerprinter`](crate::fingerprint::Fingerprinter) across a
//! scanned file list with the concurrency strategy appropriate to the
//! storage medium (spec.md §4.3, §5).

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::errors::{BackupError, Result};
use crate::fingerprint::{FileInfo, Fingerprinter};

/// Shared cancellation flag. A single signal stops the hash pipeline;
/// the rotational worker observes it at each 0.25s queue poll.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct HashPipeline {
    fingerprinter: Fingerprinter,
    is_ssd: bool,
    ssd_workers: usize,
    queue_capacity: usize,
    poll_timeout: Duration,
    inline_cutover_bytes: u64,
}

impl HashPipeline {
    pub fn new(
        fingerprinter: Fingerprinter,
        is_ssd: bool,
        ssd_workers: usize,
        queue_capacity: usize,
        poll_timeout: Duration,
        inline_cutover_bytes: u64,
    ) -> Self {
        Self {
            fingerprinter,
            is_ssd,
            ssd_workers,
            queue_capacity,
            poll_timeout,
            inline_cutover_bytes,
        }
    }

    /// Fingerprint every path, with or without content hashing depending
    /// on `simple_compare`. Output preserves input order.
    pub fn run(
        &self,
        paths: &[PathBuf],
        simple_compare: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileInfo>> {
        if simple_compare {
            return paths
                .iter()
                .map(|path| self.fingerprinter.simple(path))
                .collect();
        }

        if self.is_ssd {
            self.run_ssd(paths, cancel)
        } else {
            self.run_rotational(paths, cancel)
        }
    }

    fn run_ssd(&self, paths: &[PathBuf], cancel: &CancellationToken) -> Result<Vec<FileInfo>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.ssd_workers.max(1))
            .build()
            .expect("failed to build SSD hashing thread pool");

        pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        return Err(BackupError::io(
                            path.clone(),
                            std::io::Error::new(std::io::ErrorKind::Interrupted, "cancelled"),
                        ));
                    }
                    self.fingerprinter.hashed(path)
                })
                .collect()
        })
    }

    /// One file at a time: a reader thread enqueues blocks into a bounded
    /// queue, a hasher thread consumes them. Files at or below the
    /// inline-cutover size bypass the queue.
    fn run_rotational(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Vec<FileInfo>> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            if cancel.is_cancelled() {
                return Err(BackupError::io(
                    path.clone(),
                    std::io::Error::new(std::io::ErrorKind::Interrupted, "cancelled"),
                ));
            }
            results.push(self.hash_one_rotational(path, cancel)?);
        }
        Ok(results)
    }

    fn hash_one_rotational(&self, path: &Path, cancel: &CancellationToken) -> Result<FileInfo> {
        let metadata = std::fs::metadata(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
        let size = metadata.len();

        if size <= self.inline_cutover_bytes {
            return self.fingerprinter.hashed(path);
        }

        let block_size = self.fingerprinter.block_size();
        let (tx, rx) = sync_channel::<Vec<u8>>(self.queue_capacity);
        let poll_timeout = self.poll_timeout;
        let worker_cancel = cancel.clone();

        let hasher_handle = thread::spawn(move || -> Sha256 {
            let mut hasher = Sha256::new();
            loop {
                match rx.recv_timeout(poll_timeout) {
                    Ok(block) => hasher.update(&block),
                    Err(RecvTimeoutError::Timeout) => {
                        if worker_cancel.is_cancelled() {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            hasher
        });

        let read_result: Result<()> = (|| {
            let mut file = File::open(path).map_err(|e| BackupError::io(path.to_path_buf(), e))?;
            let mut buf = vec![0u8; block_size.max(1)];
            loop {
                let read = file
                    .read(&mut buf)
                    .map_err(|e| BackupError::io(path.to_path_buf(), e))?;
                if read == 0 {
                    break;
                }
                let _ = tx.send(buf[..read].to_vec());
            }
            Ok(())
        })();

        drop(tx);
        let hasher = hasher_handle.join().expect("hasher thread panicked");
        read_result?;

        let hash = hex::encode(hasher.finalize());
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Ok(FileInfo::new(path.to_path_buf(), size, mtime, Some(hash)))
    }
}
