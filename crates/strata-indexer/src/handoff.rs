//! Handoff surface toward downstream consumers of an index run.
//!
//! Consumers that keep per-module derived artifacts use
//! [`merge_artifacts`] to combine what they already hold with what they
//! recomputed for the affected modules, without touching the rest.

use crate::modules::ModuleInfo;
use crate::update::{UpdateMode, UpdatePlan};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use strata_core::RepoPath;

/// What a completed run hands to downstream consumers.
#[derive(Debug, Clone)]
pub struct IndexHandoff {
    pub repo_root: PathBuf,
    /// All included files, in index order
    pub files: Vec<RepoPath>,
    pub modules: Vec<ModuleInfo>,
    /// Module roots to recompute; `None` means recompute everything
    pub affected_modules: Option<Vec<RepoPath>>,
}

impl IndexHandoff {
    pub fn new(
        repo_root: &Path,
        files: Vec<RepoPath>,
        modules: Vec<ModuleInfo>,
        plan: &UpdatePlan,
    ) -> Self {
        let affected_modules = match plan.mode {
            UpdateMode::Full => None,
            UpdateMode::Incremental => Some(plan.affected.clone()),
        };
        Self {
            repo_root: repo_root.to_path_buf(),
            files,
            modules,
            affected_modules,
        }
    }
}

/// Merge previously held per-module artifacts with freshly recomputed
/// ones.
///
/// In full mode the previous artifacts are discarded wholesale. In
/// incremental mode untouched modules keep their previous artifact
/// byte for byte; modules absent from the current catalogue are
/// dropped.
pub fn merge_artifacts<T: Clone>(
    previous: &BTreeMap<RepoPath, T>,
    fresh: BTreeMap<RepoPath, T>,
    modules: &[ModuleInfo],
    mode: UpdateMode,
) -> BTreeMap<RepoPath, T> {
    match mode {
        UpdateMode::Full => fresh,
        UpdateMode::Incremental => {
            let current_roots: BTreeSet<&RepoPath> =
                modules.iter().map(|m| &m.path).collect();
            let mut merged: BTreeMap<RepoPath, T> = previous
                .iter()
                .filter(|(root, _)| current_roots.contains(root))
                .map(|(root, artifact)| (root.clone(), artifact.clone()))
                .collect();
            merged.extend(fresh);
            merged
        }
    }
}
