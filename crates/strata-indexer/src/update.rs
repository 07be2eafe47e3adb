//! Incremental update orchestration.
//!
//! One decision per invocation: rebuild derived per-module data in full,
//! or recompute it only for the modules a change set actually touches.
//! Structural changes (workspace config edits, large change sets, no
//! previous state) force the full path because module boundaries
//! themselves may have shifted.

use crate::handoff::IndexHandoff;
use crate::index::{ChangeSet, FileIndex};
use crate::modules::{self, ModuleInfo, WORKSPACE_CONFIG_FILES};
use crate::scanner::{WalkOptions, Walker};
use crate::storage::{IndexSnapshot, ModuleCatalogue, Storage};
use crate::{Diagnostics, IndexerError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use strata_core::{IndexConfig, RepoPath};
use tracing::{debug, info};

/// Derived-data recomputation mode, chosen once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Full,
    Incremental,
}

/// The orchestrator's contract surface toward the collaborators that
/// recompute per-module derived data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub mode: UpdateMode,
    pub changes: ChangeSet,
    /// Module roots whose derived data must be refreshed; in full mode,
    /// every current module
    pub affected: Vec<RepoPath>,
}

/// Decide the update mode and compute the affected-module set.
///
/// `populated` is the set of module roots the collaborators actually
/// hold data for from the previous run; `None` means assume all previous
/// modules are populated.
pub fn plan_update(
    changes: ChangeSet,
    current_modules: &[ModuleInfo],
    previous_modules: Option<&[ModuleInfo]>,
    populated: Option<&BTreeSet<RepoPath>>,
    total_current_files: usize,
    config: &IndexConfig,
) -> UpdatePlan {
    let current_roots: BTreeSet<RepoPath> = root_set(current_modules);

    let Some(previous_modules) = previous_modules else {
        debug!("No previous module catalogue, full rebuild");
        return full_plan(changes, &current_roots);
    };

    if let Some(path) = changes.paths().iter().find(|p| is_workspace_config(p)) {
        debug!(path = %path, "Workspace config changed, full rebuild");
        return full_plan(changes, &current_roots);
    }

    let changed = changes.len();
    if changed >= config.full_change_count {
        debug!(changed, "Change count above absolute threshold, full rebuild");
        return full_plan(changes, &current_roots);
    }
    if total_current_files > 0
        && changed as f64 / total_current_files as f64 >= config.full_change_ratio
    {
        debug!(changed, total_current_files, "Change ratio above threshold, full rebuild");
        return full_plan(changes, &current_roots);
    }

    let previous_roots: BTreeSet<RepoPath> = root_set(previous_modules);
    let mut affected: BTreeSet<RepoPath> = BTreeSet::new();

    // New modules have no carried-forward data at all.
    for root in current_roots.difference(&previous_roots) {
        affected.insert(root.clone());
    }

    // Defensive catch-up: known modules the collaborators never populated.
    if let Some(populated) = populated {
        for root in &previous_roots {
            if !populated.contains(root) {
                affected.insert(root.clone());
            }
        }
    }

    // A changed file is resolved under both root sets independently: if
    // boundaries shifted between runs, both the old and the new owning
    // module carry stale data.
    let mut current_cache: HashMap<RepoPath, RepoPath> = HashMap::new();
    let mut previous_cache: HashMap<RepoPath, RepoPath> = HashMap::new();
    for path in changes.paths() {
        let dir = path.parent().unwrap_or_else(RepoPath::root);
        affected.insert(modules::nearest_enclosing_root(
            &current_roots,
            &dir,
            &mut current_cache,
        ));
        affected.insert(modules::nearest_enclosing_root(
            &previous_roots,
            &dir,
            &mut previous_cache,
        ));
    }

    // Only roots present in the current catalogue are handed out.
    let affected: Vec<RepoPath> = affected
        .into_iter()
        .filter(|root| current_roots.contains(root))
        .collect();

    UpdatePlan {
        mode: UpdateMode::Incremental,
        changes,
        affected,
    }
}

fn root_set(modules: &[ModuleInfo]) -> BTreeSet<RepoPath> {
    let mut roots: BTreeSet<RepoPath> = modules.iter().map(|m| m.path.clone()).collect();
    // The synthetic root module always terminates an ancestry walk.
    roots.insert(RepoPath::root());
    roots
}

fn full_plan(changes: ChangeSet, current_roots: &BTreeSet<RepoPath>) -> UpdatePlan {
    UpdatePlan {
        mode: UpdateMode::Full,
        changes,
        affected: current_roots.iter().cloned().collect(),
    }
}

/// Is this changed path a top-level workspace-configuration file?
fn is_workspace_config(path: &RepoPath) -> bool {
    path.depth() == 1 && WORKSPACE_CONFIG_FILES.contains(&path.file_name())
}

/// Everything one run produces.
#[derive(Debug)]
pub struct IndexRun {
    pub index: FileIndex,
    pub modules: Vec<ModuleInfo>,
    pub plan: UpdatePlan,
    pub handoff: IndexHandoff,
}

/// Drives one full invocation: walk, index, diff against persisted
/// state, resolve modules, plan the update and persist the new snapshot.
pub struct Indexer {
    root: PathBuf,
    config: IndexConfig,
    storage: Storage,
    diags: Diagnostics,
}

impl Indexer {
    pub fn new(root: &Path, config: IndexConfig, storage: Storage) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            storage,
            diags: Diagnostics::new(),
        }
    }

    /// Recoverable problems from the last `run`.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Execute one invocation. `populated` is the collaborator-held
    /// module set from the previous run, when the caller tracks it.
    pub async fn run(
        &self,
        populated: Option<&BTreeSet<RepoPath>>,
    ) -> Result<IndexRun, IndexerError> {
        // Each run reports only its own problems.
        self.diags.take();

        let walker = Walker::new(&self.root, WalkOptions::from(&self.config));
        let files = walker.collect(&self.diags)?;

        let index = FileIndex::build(
            &self.root,
            files.clone(),
            self.config.hash_algorithm,
            self.config.hash_workers,
            &self.diags,
        )
        .await?;

        let previous_index = self.load_previous_index().await?;
        let previous_catalogue = self.load_previous_catalogue().await?;

        let changes = match &previous_index {
            Some(previous) => FileIndex::diff(previous, &index),
            // First run: everything is new.
            None => ChangeSet {
                added: files.clone(),
                ..Default::default()
            },
        };

        let modules = modules::resolve_modules(&self.root, &files, &self.diags).await;

        let plan = plan_update(
            changes,
            &modules,
            previous_catalogue.as_deref(),
            populated,
            index.len(),
            &self.config,
        );

        // Persist only after the whole snapshot is assembled; a later
        // diff must never observe partial output.
        let now = Utc::now();
        self.storage
            .save_index(
                &self.root,
                &IndexSnapshot {
                    generated_at: now,
                    index: index.clone(),
                },
            )
            .await?;
        self.storage
            .save_catalogue(
                &self.root,
                &ModuleCatalogue {
                    generated_at: now,
                    modules: modules.clone(),
                },
            )
            .await?;

        info!(
            files = index.len(),
            modules = modules.len(),
            mode = ?plan.mode,
            affected = plan.affected.len(),
            "Index run complete"
        );

        let handoff = IndexHandoff::new(&self.root, files, modules.clone(), &plan);
        Ok(IndexRun {
            index,
            modules,
            plan,
            handoff,
        })
    }

    async fn load_previous_index(&self) -> Result<Option<FileIndex>, IndexerError> {
        match self.storage.load_index(&self.root).await {
            Ok(snapshot) => Ok(Some(snapshot.index)),
            Err(IndexerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn load_previous_catalogue(&self) -> Result<Option<Vec<ModuleInfo>>, IndexerError> {
        match self.storage.load_catalogue(&self.root).await {
            Ok(catalogue) => Ok(Some(catalogue.modules)),
            Err(IndexerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
