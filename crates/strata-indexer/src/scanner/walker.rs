//! Deterministic file system walker.
//!
//! Explicit-stack depth-first traversal: memory is bounded at arbitrary
//! depth, sibling order is decided by sorting each directory's entries
//! once, and emission order is ascending by `RepoPath`. Per-directory
//! `.gitignore` files extend the inherited matcher stack for that subtree
//! only. The only fatal condition is a missing or non-directory root;
//! every per-entry error is reported and skipped.

use crate::scanner::{IgnoreLayer, IgnoreStack};
use crate::{Diagnostics, IndexerError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{RepoPath, SymlinkPolicy};

/// Walk configuration.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Symlink policy (`Skip` by default)
    pub symlink_policy: SymlinkPolicy,
    /// Maximum depth below the root; entries deeper are skipped
    pub max_depth: Option<usize>,
    /// Caller override patterns, always evaluated last
    pub ignore_overrides: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            symlink_policy: SymlinkPolicy::Skip,
            max_depth: None,
            ignore_overrides: Vec::new(),
        }
    }
}

/// File system walker rooted at one repository directory.
pub struct Walker {
    root: PathBuf,
    options: WalkOptions,
}

impl Walker {
    pub fn new(root: &Path, options: WalkOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            options,
        }
    }

    /// Start a walk. Each call re-walks the tree from scratch; the
    /// returned iterator lazily yields included files in ascending
    /// `RepoPath` order.
    pub fn walk(&self, diags: &Diagnostics) -> Result<FileWalk, IndexerError> {
        let meta = fs::metadata(&self.root)
            .map_err(|_| IndexerError::RootNotFound(self.root.clone()))?;
        if !meta.is_dir() {
            return Err(IndexerError::NotADirectory(self.root.clone()));
        }

        // Canonical root anchors the cycle guard under follow-all and
        // keeps the walk from escaping its own subtree.
        let canonical_root = fs::canonicalize(&self.root)?;
        let mut visited_dirs = HashSet::new();
        visited_dirs.insert(canonical_root.clone());

        let stack_base = IgnoreStack::new(&self.options.ignore_overrides, diags);

        Ok(FileWalk {
            root: self.root.clone(),
            canonical_root,
            policy: self.options.symlink_policy,
            max_depth: self.options.max_depth,
            diags: diags.clone(),
            visited_dirs,
            stack: vec![Frame::Dir {
                rel: RepoPath::root(),
                ignores: stack_base,
                depth: 0,
            }],
        })
    }

    /// Convenience: run the walk to completion and collect the file list.
    pub fn collect(&self, diags: &Diagnostics) -> Result<Vec<RepoPath>, IndexerError> {
        Ok(self.walk(diags)?.collect())
    }
}

enum Frame {
    File(RepoPath),
    Dir {
        rel: RepoPath,
        ignores: IgnoreStack,
        depth: usize,
    },
}

/// An in-progress walk. No generator state survives the iterator; a new
/// walk starts from a fresh `Walker::walk` call.
pub struct FileWalk {
    root: PathBuf,
    canonical_root: PathBuf,
    policy: SymlinkPolicy,
    max_depth: Option<usize>,
    diags: Diagnostics,
    visited_dirs: HashSet<PathBuf>,
    stack: Vec<Frame>,
}

/// How one directory entry should be treated after symlink resolution.
enum EntryKind {
    File,
    Dir,
    Skipped,
}

impl FileWalk {
    fn expand_dir(&mut self, rel: RepoPath, ignores: IgnoreStack, depth: usize) {
        if let Some(max) = self.max_depth {
            // Children sit one level deeper than this directory.
            if depth >= max {
                return;
            }
        }

        let abs = rel.to_fs_path(&self.root);
        let ignores = self.load_local_gitignore(&rel, &abs, ignores);

        let read = match fs::read_dir(&abs) {
            Ok(read) => read,
            Err(e) => {
                self.diags
                    .report(Some(rel), format!("failed to read directory: {e}"));
                return;
            }
        };

        let mut children: Vec<(String, Frame)> = Vec::new();
        for entry in read {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.diags
                        .report(Some(rel.clone()), format!("unreadable entry: {e}"));
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    self.diags.report(
                        Some(rel.clone()),
                        format!("non-UTF-8 entry name skipped: {raw:?}"),
                    );
                    continue;
                }
            };
            let child_rel = rel.join(&name);

            let kind = self.classify(&entry, &child_rel);
            match kind {
                EntryKind::Skipped => continue,
                EntryKind::File => {
                    if ignores.is_ignored(&child_rel, false) {
                        continue;
                    }
                    children.push((name, Frame::File(child_rel)));
                }
                EntryKind::Dir => {
                    // A negated override may re-include entries below an
                    // ignored directory, so only prune when none exists.
                    if ignores.is_ignored(&child_rel, true) && !ignores.overrides_whitelist() {
                        continue;
                    }
                    let frame = Frame::Dir {
                        rel: child_rel,
                        ignores: ignores.clone(),
                        depth: depth + 1,
                    };
                    // Directories sort with a trailing slash so emission
                    // order matches ordinal RepoPath order even when a
                    // sibling file name is a prefix of a directory name.
                    children.push((format!("{name}/"), frame));
                }
            }
        }

        children.sort_by(|a, b| a.0.cmp(&b.0));
        // Reverse push so the smallest name is popped first.
        for (_, frame) in children.into_iter().rev() {
            self.stack.push(frame);
        }
    }

    fn load_local_gitignore(
        &self,
        rel: &RepoPath,
        abs: &Path,
        ignores: IgnoreStack,
    ) -> IgnoreStack {
        let gitignore = abs.join(".gitignore");
        match fs::symlink_metadata(&gitignore) {
            Err(_) => ignores, // absent, not an error
            Ok(meta) if !meta.is_file() => ignores,
            Ok(_) => match fs::read_to_string(&gitignore) {
                Ok(content) => {
                    ignores.push(IgnoreLayer::from_gitignore(rel.clone(), &content, &self.diags))
                }
                Err(e) => {
                    // Fail open: this layer only is treated as absent.
                    self.diags.report(
                        Some(rel.join(".gitignore")),
                        format!("unreadable .gitignore: {e}"),
                    );
                    ignores
                }
            },
        }
    }

    fn classify(&mut self, entry: &fs::DirEntry, rel: &RepoPath) -> EntryKind {
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                self.diags
                    .report(Some(rel.clone()), format!("failed to stat entry: {e}"));
                return EntryKind::Skipped;
            }
        };

        if file_type.is_file() {
            return EntryKind::File;
        }
        if file_type.is_dir() {
            if self.policy == SymlinkPolicy::FollowAll && !self.note_visited(entry.path(), rel) {
                return EntryKind::Skipped;
            }
            return EntryKind::Dir;
        }
        if !file_type.is_symlink() {
            return EntryKind::Skipped; // fifo, socket, device
        }

        match self.policy {
            SymlinkPolicy::Skip => EntryKind::Skipped,
            SymlinkPolicy::FollowFile => match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Skipped,
                Err(e) => {
                    self.diags
                        .report(Some(rel.clone()), format!("broken symlink: {e}"));
                    EntryKind::Skipped
                }
            },
            SymlinkPolicy::FollowAll => match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(meta) if meta.is_dir() => {
                    if self.note_visited(entry.path(), rel) {
                        EntryKind::Dir
                    } else {
                        EntryKind::Skipped
                    }
                }
                Ok(_) => EntryKind::Skipped,
                Err(e) => {
                    self.diags
                        .report(Some(rel.clone()), format!("broken symlink: {e}"));
                    EntryKind::Skipped
                }
            },
        }
    }

    /// Cycle guard for follow-all: refuse to re-enter any realpath
    /// already seen, and refuse to leave the walk's own subtree.
    fn note_visited(&mut self, path: PathBuf, rel: &RepoPath) -> bool {
        let canonical = match fs::canonicalize(&path) {
            Ok(canonical) => canonical,
            Err(e) => {
                self.diags
                    .report(Some(rel.clone()), format!("failed to canonicalize: {e}"));
                return false;
            }
        };
        if !canonical.starts_with(&self.canonical_root) {
            return false;
        }
        self.visited_dirs.insert(canonical)
    }
}

impl Iterator for FileWalk {
    type Item = RepoPath;

    fn next(&mut self) -> Option<RepoPath> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::File(rel) => return Some(rel),
                Frame::Dir {
                    rel,
                    ignores,
                    depth,
                } => self.expand_dir(rel, ignores, depth),
            }
        }
        None
    }
}
