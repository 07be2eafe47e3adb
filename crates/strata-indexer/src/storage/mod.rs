//! Persistence of previous-run state.
//!
//! The orchestrator compares each fresh run against the last fully
//! written `FileIndex` and module catalogue. Both are stored per
//! repository in a state directory keyed by a short digest of the
//! canonical repository path, written atomically (temp file then rename)
//! so a subsequent diff never observes partial output. Absence of stored
//! state is a valid initial state, not an error.

use crate::index::FileIndex;
use crate::modules::ModuleInfo;
use crate::IndexerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persisted form of a run's file index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// When the index was written
    pub generated_at: DateTime<Utc>,
    pub index: FileIndex,
}

/// Persisted form of a run's module catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCatalogue {
    /// When the catalogue was written
    pub generated_at: DateTime<Utc>,
    pub modules: Vec<ModuleInfo>,
}

/// Storage options.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Base directory for per-repository state
    pub base_dir: PathBuf,
    /// Whether to use MessagePack instead of JSON
    pub use_msgpack: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            base_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("strata")
                .join("repos"),
            use_msgpack: false,
        }
    }
}

/// Manages persisted state for indexed repositories.
pub struct Storage {
    options: StorageOptions,
}

impl Storage {
    /// Create a storage manager rooted at `base_dir`.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            options: StorageOptions {
                base_dir,
                ..Default::default()
            },
        }
    }

    pub fn with_options(options: StorageOptions) -> Self {
        Self { options }
    }

    /// Short digest keying a repository's state directory.
    pub fn repo_key(&self, repo_root: &Path) -> String {
        let canonical = std::fs::canonicalize(repo_root)
            .unwrap_or_else(|_| repo_root.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }

    /// State directory for a repository.
    pub fn repo_dir(&self, repo_root: &Path) -> PathBuf {
        self.options.base_dir.join(self.repo_key(repo_root))
    }

    /// Persist a file index snapshot atomically.
    pub async fn save_index(
        &self,
        repo_root: &Path,
        snapshot: &IndexSnapshot,
    ) -> Result<(), IndexerError> {
        self.write(repo_root, "index", snapshot).await
    }

    /// Load the previous run's file index.
    pub async fn load_index(&self, repo_root: &Path) -> Result<IndexSnapshot, IndexerError> {
        self.read(repo_root, "index").await
    }

    /// Persist a module catalogue atomically.
    pub async fn save_catalogue(
        &self,
        repo_root: &Path,
        catalogue: &ModuleCatalogue,
    ) -> Result<(), IndexerError> {
        self.write(repo_root, "modules", catalogue).await
    }

    /// Load the previous run's module catalogue.
    pub async fn load_catalogue(&self, repo_root: &Path) -> Result<ModuleCatalogue, IndexerError> {
        self.read(repo_root, "modules").await
    }

    /// Whether any stored state exists for a repository.
    pub async fn exists(&self, repo_root: &Path) -> bool {
        let dir = self.repo_dir(repo_root);
        for stem in ["index", "modules"] {
            if dir.join(format!("{stem}.json")).exists()
                || dir.join(format!("{stem}.msgpack")).exists()
            {
                return true;
            }
        }
        false
    }

    /// Delete all stored state for a repository.
    pub async fn delete(&self, repo_root: &Path) -> Result<(), IndexerError> {
        let dir = self.repo_dir(repo_root);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }

    async fn write<T: Serialize>(
        &self,
        repo_root: &Path,
        stem: &str,
        value: &T,
    ) -> Result<(), IndexerError> {
        let dir = self.repo_dir(repo_root);
        tokio::fs::create_dir_all(&dir).await?;

        let msgpack_path = dir.join(format!("{stem}.msgpack"));
        let json_path = dir.join(format!("{stem}.json"));
        let (path, stale_path, data) = if self.options.use_msgpack {
            (msgpack_path, json_path, rmp_serde::to_vec(value)?)
        } else {
            (json_path, msgpack_path, serde_json::to_vec_pretty(value)?)
        };

        // Atomic write: temp file, then rename.
        let temp_path = dir.join(format!(".{stem}.tmp"));
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        // A leftover file in the other format would shadow or stale out
        // this write on the next load, so it goes with the rename.
        match tokio::fs::remove_file(&stale_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(path = ?path, size = data.len(), "Saved state");
        Ok(())
    }

    async fn read<T: for<'de> Deserialize<'de>>(
        &self,
        repo_root: &Path,
        stem: &str,
    ) -> Result<T, IndexerError> {
        let dir = self.repo_dir(repo_root);

        // Either format is accepted on load; `write` leaves at most one
        // behind, so whichever exists is the latest write.
        let msgpack_path = dir.join(format!("{stem}.msgpack"));
        if msgpack_path.exists() {
            let data = tokio::fs::read(&msgpack_path).await?;
            return Ok(rmp_serde::from_slice(&data)?);
        }

        let json_path = dir.join(format!("{stem}.json"));
        if json_path.exists() {
            let data = tokio::fs::read(&json_path).await?;
            return Ok(serde_json::from_slice(&data)?);
        }

        Err(IndexerError::NotFound(dir))
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::with_options(StorageOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileIndexEntry;
    use strata_core::{HashAlgorithm, RepoPath};
    use tempfile::tempdir;

    fn storage(base: &Path, use_msgpack: bool) -> Storage {
        Storage::with_options(StorageOptions {
            base_dir: base.to_path_buf(),
            use_msgpack,
        })
    }

    fn snapshot(repo_root: &Path) -> IndexSnapshot {
        IndexSnapshot {
            generated_at: Utc::now(),
            index: FileIndex {
                repo_root: repo_root.to_path_buf(),
                hash_algorithm: HashAlgorithm::Sha256,
                files: vec![FileIndexEntry {
                    path: RepoPath::new("a.txt"),
                    size: 3,
                    mtime: 100,
                    hash: Some("abc".to_string()),
                }],
            },
        }
    }

    #[tokio::test]
    async fn test_save_and_load_index_json() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let storage = storage(&temp_dir.path().join("state"), false);

        storage.save_index(&repo, &snapshot(&repo)).await.unwrap();
        let loaded = storage.load_index(&repo).await.unwrap();
        assert_eq!(loaded.index.files.len(), 1);
        assert_eq!(loaded.index.files[0].path, RepoPath::new("a.txt"));
    }

    #[tokio::test]
    async fn test_save_and_load_index_msgpack() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let storage = storage(&temp_dir.path().join("state"), true);

        storage.save_index(&repo, &snapshot(&repo)).await.unwrap();
        let loaded = storage.load_index(&repo).await.unwrap();
        assert_eq!(loaded.index.hash_algorithm, HashAlgorithm::Sha256);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let storage = storage(temp_dir.path(), false);

        let result = storage.load_index(Path::new("/nonexistent/repo")).await;
        assert!(matches!(result, Err(IndexerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_and_load_catalogue() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let storage = storage(&temp_dir.path().join("state"), false);

        let catalogue = ModuleCatalogue {
            generated_at: Utc::now(),
            modules: vec![ModuleInfo {
                name: "root".to_string(),
                path: RepoPath::root(),
                language: crate::modules::ModuleLanguage::Unknown,
                file_count: 0,
            }],
        };
        storage.save_catalogue(&repo, &catalogue).await.unwrap();
        let loaded = storage.load_catalogue(&repo).await.unwrap();
        assert_eq!(loaded.modules, catalogue.modules);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let storage = storage(&temp_dir.path().join("state"), false);

        assert!(!storage.exists(&repo).await);
        storage.save_index(&repo, &snapshot(&repo)).await.unwrap();
        assert!(storage.exists(&repo).await);

        storage.delete(&repo).await.unwrap();
        assert!(!storage.exists(&repo).await);
    }

    #[tokio::test]
    async fn test_distinct_repos_distinct_keys() {
        let temp_dir = tempdir().unwrap();
        let repo_a = temp_dir.path().join("a");
        let repo_b = temp_dir.path().join("b");
        std::fs::create_dir_all(&repo_a).unwrap();
        std::fs::create_dir_all(&repo_b).unwrap();
        let storage = storage(&temp_dir.path().join("state"), false);

        assert_ne!(storage.repo_key(&repo_a), storage.repo_key(&repo_b));
    }

    #[tokio::test]
    async fn test_format_switch_loads_latest_write() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let base = temp_dir.path().join("state");

        let mut first = snapshot(&repo);
        first.index.files[0].mtime = 100;
        storage(&base, true).save_index(&repo, &first).await.unwrap();

        // Same base dir, switched to JSON: the later write must win.
        let mut second = snapshot(&repo);
        second.index.files[0].mtime = 200;
        let json_storage = storage(&base, false);
        json_storage.save_index(&repo, &second).await.unwrap();

        let loaded = json_storage.load_index(&repo).await.unwrap();
        assert_eq!(loaded.index.files[0].mtime, 200);

        let dir = json_storage.repo_dir(&repo);
        assert!(dir.join("index.json").exists());
        assert!(!dir.join("index.msgpack").exists());

        // And the switch back as well.
        let mut third = snapshot(&repo);
        third.index.files[0].mtime = 300;
        let msgpack_storage = storage(&base, true);
        msgpack_storage.save_index(&repo, &third).await.unwrap();
        let loaded = msgpack_storage.load_index(&repo).await.unwrap();
        assert_eq!(loaded.index.files[0].mtime, 300);
        assert!(!dir.join("index.json").exists());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let storage = storage(&temp_dir.path().join("state"), false);

        storage.save_index(&repo, &snapshot(&repo)).await.unwrap();
        let dir = storage.repo_dir(&repo);
        assert!(dir.join("index.json").exists());
        assert!(!dir.join(".index.tmp").exists());
    }
}
