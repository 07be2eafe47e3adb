//! Normalized repository-relative paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A normalized, repository-relative, slash-separated path.
///
/// `.` denotes the repository root. Backslashes are converted to slashes,
/// a leading `./` is stripped, and trailing slashes are stripped at
/// construction, so two `RepoPath`s are equal iff they denote the same
/// file. `Ord` is ordinal byte comparison of the canonical form; this
/// ordering defines the output order of every downstream component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoPath(String);

impl RepoPath {
    /// The repository root, `.`.
    pub fn root() -> Self {
        RepoPath(".".to_string())
    }

    /// Normalize a raw path string into a `RepoPath`.
    ///
    /// Pure and infallible: empty input maps to the root.
    pub fn new(raw: &str) -> Self {
        let mut s = raw.replace('\\', "/");

        while let Some(rest) = s.strip_prefix("./") {
            s = rest.to_string();
        }
        while s.len() > 1 && s.ends_with('/') {
            s.pop();
        }
        if s.is_empty() || s == "." || s == "/" {
            return Self::root();
        }

        RepoPath(s)
    }

    /// Normalize a platform path (lossy on non-UTF-8 segments).
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    /// Append one or more segments.
    pub fn join(&self, segment: &str) -> Self {
        if self.is_root() {
            Self::new(segment)
        } else {
            Self::new(&format!("{}/{}", self.0, segment))
        }
    }

    /// The enclosing directory; `None` for the root itself.
    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(RepoPath(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// The final path segment (the repository directory itself for `.`).
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Component-wise ancestry test. The root is an ancestor of every path,
    /// and every path starts with itself.
    pub fn starts_with(&self, ancestor: &RepoPath) -> bool {
        if ancestor.is_root() {
            return true;
        }
        if self.0 == ancestor.0 {
            return true;
        }
        self.0.len() > ancestor.0.len()
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
            && self.0.starts_with(ancestor.0.as_str())
    }

    /// The path relative to `base`, as a slash-separated string.
    ///
    /// Returns `None` when `base` is not an ancestor, and `None` for the
    /// path relative to itself (there is no `.` entry below a base).
    pub fn relative_to(&self, base: &RepoPath) -> Option<&str> {
        if base.is_root() {
            if self.is_root() {
                return None;
            }
            return Some(&self.0);
        }
        if self.0 == base.0 {
            return None;
        }
        if self.starts_with(base) {
            Some(&self.0[base.0.len() + 1..])
        } else {
            None
        }
    }

    /// Path components, root-first. Empty for `.`.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        let inner = if self.is_root() { "" } else { self.0.as_str() };
        inner.split('/').filter(|c| !c.is_empty())
    }

    /// Depth below the repository root (`.` is 0, `a/b` is 2).
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Resolve against a filesystem root directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            let mut out = root.to_path_buf();
            for component in self.components() {
                out.push(component);
            }
            out
        }
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
