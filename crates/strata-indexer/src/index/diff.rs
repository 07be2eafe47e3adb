//! Change-set computation between two file indexes.

use super::{FileIndex, FileIndexEntry};
use serde::{Deserialize, Serialize};
use strata_core::RepoPath;

/// Added/modified/deleted paths between two index snapshots, each list
/// sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<RepoPath>,
    pub modified: Vec<RepoPath>,
    pub deleted: Vec<RepoPath>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Total changed-path count, the input to the full-rebuild thresholds.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// All changed paths in one sorted list.
    pub fn paths(&self) -> Vec<RepoPath> {
        let mut all: Vec<RepoPath> = self
            .added
            .iter()
            .chain(self.modified.iter())
            .chain(self.deleted.iter())
            .cloned()
            .collect();
        all.sort();
        all
    }
}

/// Linear merge over both indexes' sorted entry lists.
///
/// Hashes are compared only when both sides carry one and the two indexes
/// share an algorithm; otherwise modification falls back to size/mtime
/// inequality. A `None` hash on either side never satisfies hash-based
/// diffing.
pub fn diff(previous: &FileIndex, current: &FileIndex) -> ChangeSet {
    let hashes_comparable = previous.hash_algorithm == current.hash_algorithm;

    let mut changes = ChangeSet::default();
    let mut prev_iter = previous.files.iter().peekable();
    let mut curr_iter = current.files.iter().peekable();

    loop {
        match (prev_iter.peek(), curr_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => {
                changes.deleted.push(prev_iter.next().unwrap().path.clone());
            }
            (None, Some(_)) => {
                changes.added.push(curr_iter.next().unwrap().path.clone());
            }
            (Some(prev), Some(curr)) => match prev.path.cmp(&curr.path) {
                std::cmp::Ordering::Less => {
                    changes.deleted.push(prev_iter.next().unwrap().path.clone());
                }
                std::cmp::Ordering::Greater => {
                    changes.added.push(curr_iter.next().unwrap().path.clone());
                }
                std::cmp::Ordering::Equal => {
                    if is_modified(prev, curr, hashes_comparable) {
                        changes.modified.push(curr.path.clone());
                    }
                    prev_iter.next();
                    curr_iter.next();
                }
            },
        }
    }

    changes
}

fn is_modified(prev: &FileIndexEntry, curr: &FileIndexEntry, hashes_comparable: bool) -> bool {
    if hashes_comparable {
        if let (Some(prev_hash), Some(curr_hash)) = (&prev.hash, &curr.hash) {
            return prev_hash != curr_hash;
        }
    }
    prev.size != curr.size || prev.mtime != curr.mtime
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use strata_core::HashAlgorithm;

    fn entry(path: &str, size: u64, mtime: u64, hash: Option<&str>) -> FileIndexEntry {
        FileIndexEntry {
            path: RepoPath::new(path),
            size,
            mtime,
            hash: hash.map(str::to_string),
        }
    }

    fn index(algorithm: HashAlgorithm, mut files: Vec<FileIndexEntry>) -> FileIndex {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        FileIndex {
            repo_root: PathBuf::from("/repo"),
            hash_algorithm: algorithm,
            files,
        }
    }

    #[test]
    fn test_identical_indexes_yield_empty() {
        let a = index(
            HashAlgorithm::Sha256,
            vec![entry("a.txt", 1, 10, Some("h1")), entry("b.txt", 2, 20, Some("h2"))],
        );
        let changes = diff(&a, &a.clone());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_added_and_deleted() {
        let prev = index(
            HashAlgorithm::Sha256,
            vec![entry("gone.txt", 1, 1, Some("h")), entry("kept.txt", 1, 1, Some("k"))],
        );
        let curr = index(
            HashAlgorithm::Sha256,
            vec![entry("kept.txt", 1, 1, Some("k")), entry("new.txt", 1, 1, Some("n"))],
        );

        let changes = diff(&prev, &curr);
        assert_eq!(changes.added, vec![RepoPath::new("new.txt")]);
        assert_eq!(changes.deleted, vec![RepoPath::new("gone.txt")]);
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn test_hash_change_is_modified() {
        let prev = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, Some("old"))]);
        // Same size and mtime; only the hash differs.
        let curr = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, Some("new"))]);

        let changes = diff(&prev, &curr);
        assert_eq!(changes.modified, vec![RepoPath::new("a.txt")]);
    }

    #[test]
    fn test_same_hash_ignores_mtime_churn() {
        let prev = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, Some("h"))]);
        let curr = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 99, Some("h"))]);

        let changes = diff(&prev, &curr);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_algorithm_mismatch_forces_fallback() {
        let prev = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, Some("aaa"))]);
        // Different algorithm: hashes must never be compared, so equal
        // size/mtime means unchanged even with different hash strings.
        let curr = index(HashAlgorithm::Blake3, vec![entry("a.txt", 5, 10, Some("bbb"))]);
        assert!(diff(&prev, &curr).is_empty());

        // And a size change is still caught.
        let curr = index(HashAlgorithm::Blake3, vec![entry("a.txt", 6, 10, Some("bbb"))]);
        assert_eq!(diff(&prev, &curr).modified, vec![RepoPath::new("a.txt")]);
    }

    #[test]
    fn test_null_hash_forces_fallback() {
        let prev = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, None)]);
        let curr = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 10, Some("h"))]);
        assert!(diff(&prev, &curr).is_empty());

        let curr = index(HashAlgorithm::Sha256, vec![entry("a.txt", 5, 11, Some("h"))]);
        assert_eq!(diff(&prev, &curr).modified, vec![RepoPath::new("a.txt")]);
    }

    #[test]
    fn test_output_lists_sorted() {
        let prev = index(
            HashAlgorithm::Sha256,
            vec![entry("z.txt", 1, 1, Some("z")), entry("m.txt", 1, 1, Some("m"))],
        );
        let curr = index(
            HashAlgorithm::Sha256,
            vec![entry("b.txt", 1, 1, Some("b")), entry("a.txt", 1, 1, Some("a"))],
        );

        let changes = diff(&prev, &curr);
        assert_eq!(
            changes.added,
            vec![RepoPath::new("a.txt"), RepoPath::new("b.txt")]
        );
        assert_eq!(
            changes.deleted,
            vec![RepoPath::new("m.txt"), RepoPath::new("z.txt")]
        );
    }

    #[test]
    fn test_added_deleted_disjoint() {
        let prev = index(
            HashAlgorithm::Sha256,
            vec![entry("a.txt", 1, 1, Some("a")), entry("b.txt", 1, 1, Some("b"))],
        );
        let curr = index(
            HashAlgorithm::Sha256,
            vec![entry("b.txt", 2, 2, Some("b2")), entry("c.txt", 1, 1, Some("c"))],
        );

        let changes = diff(&prev, &curr);
        for added in &changes.added {
            assert!(!changes.deleted.contains(added));
        }
        assert_eq!(changes.len(), 3);
        assert_eq!(
            changes.paths(),
            vec![
                RepoPath::new("a.txt"),
                RepoPath::new("b.txt"),
                RepoPath::new("c.txt")
            ]
        );
    }
}
