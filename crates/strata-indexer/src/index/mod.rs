//! Content-addressed file index.
//!
//! Attaches size, mtime and a streamed content hash to every walked file.
//! Hashing fans out over a fixed pool of workers pulling from a shared
//! atomic cursor, then fans back in: the caller never observes a partial
//! index. A file that vanishes or becomes unreadable between enumeration
//! and hashing is recorded with a `None` hash rather than dropped, so it
//! stays visible as a problem.

mod diff;

pub use diff::ChangeSet;

use crate::{Diagnostics, IndexerError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use strata_core::{HashAlgorithm, RepoPath};
use tokio::io::AsyncReadExt;
use tracing::debug;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// One indexed file. Identity key is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndexEntry {
    /// Repository-relative path
    pub path: RepoPath,
    /// File size in bytes (best effort when unreadable)
    pub size: u64,
    /// Last modified time, seconds since the Unix epoch
    pub mtime: u64,
    /// Content hash, `None` when the file could not be read
    pub hash: Option<String>,
}

/// A sorted snapshot of every included file's content identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIndex {
    /// Repository root the index was built from
    pub repo_root: PathBuf,
    /// Algorithm the hashes were computed with
    pub hash_algorithm: HashAlgorithm,
    /// Entries sorted ascending by path
    pub files: Vec<FileIndexEntry>,
}

impl FileIndex {
    /// Build an index for the given file list.
    ///
    /// `workers` bounds hashing concurrency (clamped to at least one).
    /// Fatal only when the root itself is missing or not a directory;
    /// every per-file problem becomes a `None` hash and a diagnostic.
    pub async fn build(
        repo_root: &Path,
        files: Vec<RepoPath>,
        hash_algorithm: HashAlgorithm,
        workers: usize,
        diags: &Diagnostics,
    ) -> Result<FileIndex, IndexerError> {
        let meta = tokio::fs::metadata(repo_root)
            .await
            .map_err(|_| IndexerError::RootNotFound(repo_root.to_path_buf()))?;
        if !meta.is_dir() {
            return Err(IndexerError::NotADirectory(repo_root.to_path_buf()));
        }

        let total = files.len();
        let files = Arc::new(files);
        let cursor = Arc::new(AtomicUsize::new(0));
        let root = Arc::new(repo_root.to_path_buf());

        let mut handles = Vec::new();
        for _ in 0..workers.max(1) {
            let files = Arc::clone(&files);
            let cursor = Arc::clone(&cursor);
            let root = Arc::clone(&root);
            let diags = diags.clone();

            handles.push(tokio::spawn(async move {
                let mut collected = Vec::new();
                loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    if i >= files.len() {
                        break;
                    }
                    collected.push(index_one(&root, &files[i], hash_algorithm, &diags).await);
                }
                collected
            }));
        }

        // Join barrier: every entry is collected before sorting.
        let mut entries = Vec::with_capacity(total);
        for handle in handles {
            let collected = handle
                .await
                .map_err(|e| IndexerError::Worker(e.to_string()))?;
            entries.extend(collected);
        }

        entries.sort_by(|a: &FileIndexEntry, b: &FileIndexEntry| a.path.cmp(&b.path));

        debug!(
            files = entries.len(),
            algorithm = hash_algorithm.name(),
            "Built file index"
        );

        Ok(FileIndex {
            repo_root: repo_root.to_path_buf(),
            hash_algorithm,
            files: entries,
        })
    }

    /// Compare two indexes into an add/modify/delete change set.
    pub fn diff(previous: &FileIndex, current: &FileIndex) -> ChangeSet {
        diff::diff(previous, current)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Binary search by path (the index is sorted by construction).
    pub fn get(&self, path: &RepoPath) -> Option<&FileIndexEntry> {
        self.files
            .binary_search_by(|entry| entry.path.cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }
}

async fn index_one(
    root: &Path,
    path: &RepoPath,
    algorithm: HashAlgorithm,
    diags: &Diagnostics,
) -> FileIndexEntry {
    let abs = path.to_fs_path(root);

    let (size, mtime) = match tokio::fs::metadata(&abs).await {
        Ok(meta) => {
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            (meta.len(), mtime)
        }
        Err(_) => (0, 0), // best effort; the hash failure below reports it
    };

    let hash = match stream_hash(&abs, algorithm).await {
        Ok(hash) => Some(hash),
        Err(e) => {
            diags.report(Some(path.clone()), format!("failed to hash: {e}"));
            None
        }
    };

    FileIndexEntry {
        path: path.clone(),
        size,
        mtime,
        hash,
    }
}

/// Stream a file through the configured hasher in fixed-size chunks, so
/// memory cost is independent of file size.
async fn stream_hash(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];

    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().to_hex().to_string())
        }
    }
}
