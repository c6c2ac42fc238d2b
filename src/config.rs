// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for strongbox.
//!
//! Loads tunables from `strongbox.toml` in the current directory or
//! `~/.config/strongbox/config.toml`. Missing or unparsable config
//! falls back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_HASH_BLOCK_SIZE: usize = 65_536;
const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_POLL_TIMEOUT_MS: u64 = 250;
const DEFAULT_INLINE_CUTOVER_MULTIPLIER: u64 = 5;
const DEFAULT_ARCHIVE_VOLUME_BYTES: u64 = 250 * 1024 * 1024;
const DEFAULT_ARCHIVE_COMPRESSION_LEVEL: u8 = 9;

/// Hashing and I/O tunables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Block size in bytes used when streaming file content through the hasher.
    pub block_size: Option<usize>,
    /// Capacity of the bounded block queue in the rotational strategy.
    pub queue_capacity: Option<usize>,
    /// Poll timeout (milliseconds) for the rotational hasher thread.
    pub poll_timeout_ms: Option<u64>,
    /// Files at or below `block_size * inline_cutover_multiplier` bytes
    /// bypass the queue and are hashed inline.
    pub inline_cutover_multiplier: Option<u64>,
    /// Number of worker threads for the SSD (parallel) strategy. Defaults
    /// to the number of logical CPUs when unset.
    pub ssd_workers: Option<usize>,
}

impl HashConfig {
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_HASH_BLOCK_SIZE)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn poll_timeout_ms(&self) -> u64 {
        self.poll_timeout_ms.unwrap_or(DEFAULT_POLL_TIMEOUT_MS)
    }

    pub fn inline_cutover_bytes(&self) -> u64 {
        self.block_size() as u64
            * self
                .inline_cutover_multiplier
                .unwrap_or(DEFAULT_INLINE_CUTOVER_MULTIPLIER)
    }

    pub fn ssd_workers(&self) -> usize {
        self.ssd_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }
}

/// External archiver tunables (§6 archiver protocol).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Path to the 7z-compatible archiver executable.
    pub binary: Option<String>,
    /// Volume size in bytes for multi-volume archives.
    pub volume_bytes: Option<u64>,
    /// Compression level (0-9); 0 disables compression.
    pub compression_level: Option<u8>,
}

impl ArchiverConfig {
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or("7z")
    }

    pub fn volume_bytes(&self) -> u64 {
        self.volume_bytes.unwrap_or(DEFAULT_ARCHIVE_VOLUME_BYTES)
    }

    pub fn compression_level(&self) -> u8 {
        self.compression_level
            .unwrap_or(DEFAULT_ARCHIVE_COMPRESSION_LEVEL)
    }
}

/// Top-level strongbox configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hash: HashConfig,
    pub archiver: ArchiverConfig,
    /// Override for the data directory holding historical manifests
    /// and pending snapshots. Defaults to `dirs::data_dir()/strongbox`.
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with the usual precedence:
    /// 1. `<dir>/strongbox.toml`
    /// 2. `~/.config/strongbox/config.toml`
    /// 3. built-in defaults
    pub fn load_for_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        let local_path = dir.join("strongbox.toml");
        if let Some(config) = Self::load_from_path(&local_path) {
            return config;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("strongbox").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    pub fn load() -> Self {
        Self::load_for_dir(".")
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("WARNING: failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Resolve the data directory used for historical manifests.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("strongbox")
        })
    }
}
