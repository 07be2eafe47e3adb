//! Layered gitignore-style matching.
//!
//! Ignore state for a path is decided by an ordered stack of matchers:
//! the built-in defaults (rooted at `.`), then every `.gitignore`
//! discovered on the way down to the path, then the caller-supplied
//! override patterns, which always have final say. Within a layer the
//! last matching pattern wins; across layers the last layer with any
//! applicable match wins.

use crate::Diagnostics;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::sync::Arc;
use strata_core::RepoPath;

/// Directories excluded by default: version control, the tool's own
/// output directory, and common dependency/build trees. A negated
/// override pattern can re-include any of them.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git/",
    ".hg/",
    ".svn/",
    ".strata/",
    "node_modules/",
    "target/",
    "dist/",
    "build/",
    "out/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "vendor/",
    "coverage/",
    ".idea/",
    ".vscode/",
];

/// One compiled pattern set scoped to a base directory.
#[derive(Debug)]
pub struct IgnoreLayer {
    base: RepoPath,
    matcher: Gitignore,
}

impl IgnoreLayer {
    /// Compile a layer from individual pattern lines. Invalid patterns
    /// are reported and skipped; the rest of the layer still applies.
    pub fn from_patterns<S: AsRef<str>>(
        base: RepoPath,
        patterns: &[S],
        diags: &Diagnostics,
    ) -> Self {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            let line = pattern.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(e) = builder.add_line(None, line) {
                diags.report(
                    Some(base.clone()),
                    format!("invalid ignore pattern {line:?}: {e}"),
                );
            }
        }
        let matcher = builder.build().unwrap_or_else(|_| Gitignore::empty());
        Self { base, matcher }
    }

    /// Compile a layer from the contents of a `.gitignore` file found at
    /// `base`.
    pub fn from_gitignore(base: RepoPath, content: &str, diags: &Diagnostics) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        Self::from_patterns(base, &lines, diags)
    }

    pub fn base(&self) -> &RepoPath {
        &self.base
    }

    /// `Some(true)` ignored, `Some(false)` whitelisted, `None` when this
    /// layer has no applicable pattern (including when `base` is not an
    /// ancestor of the path).
    fn decide(&self, path: &RepoPath, is_dir: bool) -> Option<bool> {
        let relative = path.relative_to(&self.base)?;
        // Parent matching makes `dir/` patterns cover everything beneath
        // the directory, as in git.
        let matched = self
            .matcher
            .matched_path_or_any_parents(relative, is_dir);
        if matched.is_ignore() {
            Some(true)
        } else if matched.is_whitelist() {
            Some(false)
        } else {
            None
        }
    }

    fn has_whitelist(&self) -> bool {
        self.matcher.num_whitelists() > 0
    }
}

/// The accumulated matcher stack for one point in the tree.
///
/// Cheap to clone; pushing a per-directory layer produces a new stack for
/// that subtree only, so sibling directories never see each other's
/// `.gitignore` files.
#[derive(Debug, Clone)]
pub struct IgnoreStack {
    layers: Arc<Vec<Arc<IgnoreLayer>>>,
    overrides: Option<Arc<IgnoreLayer>>,
}

impl IgnoreStack {
    /// Root stack: the built-in defaults plus the caller's override
    /// patterns (evaluated last, regardless of directory depth).
    pub fn new<S: AsRef<str>>(override_patterns: &[S], diags: &Diagnostics) -> Self {
        let defaults = IgnoreLayer::from_patterns(RepoPath::root(), DEFAULT_IGNORES, diags);
        let overrides = if override_patterns.is_empty() {
            None
        } else {
            Some(Arc::new(IgnoreLayer::from_patterns(
                RepoPath::root(),
                override_patterns,
                diags,
            )))
        };
        Self {
            layers: Arc::new(vec![Arc::new(defaults)]),
            overrides,
        }
    }

    /// Extend the stack with a per-directory layer for a subtree.
    pub fn push(&self, layer: IgnoreLayer) -> Self {
        let mut layers = (*self.layers).clone();
        layers.push(Arc::new(layer));
        Self {
            layers: Arc::new(layers),
            overrides: self.overrides.clone(),
        }
    }

    /// Is this candidate excluded? Directories are tested with
    /// `is_dir = true` so directory-only patterns apply.
    pub fn is_ignored(&self, path: &RepoPath, is_dir: bool) -> bool {
        let mut state = None;
        for layer in self.layers.iter() {
            if let Some(decision) = layer.decide(path, is_dir) {
                state = Some(decision);
            }
        }
        if let Some(overrides) = &self.overrides {
            if let Some(decision) = overrides.decide(path, is_dir) {
                state = Some(decision);
            }
        }
        state.unwrap_or(false)
    }

    /// Whether the override layer can re-include paths, in which case an
    /// ignored directory must still be descended.
    pub fn overrides_whitelist(&self) -> bool {
        self.overrides
            .as_ref()
            .map(|layer| layer.has_whitelist())
            .unwrap_or(false)
    }
}
