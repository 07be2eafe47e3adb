//! Configuration for an index run.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content hash algorithm for the file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Name as recorded in persisted indexes.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

/// How the walker treats symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymlinkPolicy {
    /// Ignore all symlinks (default).
    Skip,
    /// Resolve symlinks that point to regular files.
    FollowFile,
    /// Also follow directory symlinks, with a realpath cycle guard.
    FollowAll,
}

/// Index run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Content hash algorithm
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: HashAlgorithm,

    /// Number of concurrent hashing workers
    #[serde(default = "default_hash_workers")]
    pub hash_workers: usize,

    /// Symlink policy for the walker
    #[serde(default = "default_symlink_policy")]
    pub symlink_policy: SymlinkPolicy,

    /// Maximum traversal depth (entries deeper than this are skipped)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Caller-supplied ignore override patterns, evaluated last
    #[serde(default)]
    pub ignore_overrides: Vec<String>,

    /// Changed-path count at which an incremental run falls back to full
    #[serde(default = "default_full_change_count")]
    pub full_change_count: usize,

    /// Changed-path fraction of the tree at which an incremental run
    /// falls back to full
    #[serde(default = "default_full_change_ratio")]
    pub full_change_ratio: f64,
}

fn default_hash_algorithm() -> HashAlgorithm {
    HashAlgorithm::Sha256
}

fn default_hash_workers() -> usize {
    8
}

fn default_symlink_policy() -> SymlinkPolicy {
    SymlinkPolicy::Skip
}

fn default_full_change_count() -> usize {
    2000
}

fn default_full_change_ratio() -> f64 {
    0.25
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: default_hash_algorithm(),
            hash_workers: default_hash_workers(),
            symlink_policy: default_symlink_policy(),
            max_depth: None,
            ignore_overrides: Vec::new(),
            full_change_count: default_full_change_count(),
            full_change_ratio: default_full_change_ratio(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from a YAML file, falling back to defaults on
    /// a missing or malformed file.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific path, surfacing errors.
    pub fn load_from(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
