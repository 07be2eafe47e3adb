//! Module boundary resolution.
//!
//! Partitions the walked file set into disjoint modules: candidate roots
//! come from language markers, workspace configuration and a top-level
//! fallback, and every file is assigned to its nearest enclosing root.
//! The synthetic root module `.` always exists, so coverage is total.

mod language;
mod workspace;

pub use language::{extension_language, marker_language, ModuleLanguage, MARKER_FILES};
pub use workspace::{
    discover as discover_workspace, WorkspaceConfig, WorkspaceGlobs, WORKSPACE_CONFIG_FILES,
};

use crate::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use strata_core::RepoPath;
use tracing::debug;

/// One resolved module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Manifest-declared name, or the root directory's base name
    pub name: String,
    /// Module root directory (`.` for the synthetic root module)
    pub path: RepoPath,
    /// Classified language
    pub language: ModuleLanguage,
    /// Number of files assigned to this module
    pub file_count: usize,
}

/// Nearest-enclosing-root resolution against an arbitrary root set.
///
/// The memo cache is populated for every directory visited along the
/// resolution path, not just the final hit, so sibling files amortize to
/// near-constant time. Entries are only added within one invocation,
/// never invalidated.
pub fn nearest_enclosing_root(
    roots: &BTreeSet<RepoPath>,
    dir: &RepoPath,
    cache: &mut HashMap<RepoPath, RepoPath>,
) -> RepoPath {
    let mut visited = Vec::new();
    let mut cursor = dir.clone();
    let owner = loop {
        if let Some(hit) = cache.get(&cursor) {
            break hit.clone();
        }
        if roots.contains(&cursor) || cursor.is_root() {
            break cursor;
        }
        let parent = cursor.parent().unwrap_or_else(RepoPath::root);
        visited.push(cursor);
        cursor = parent;
    };
    for dir in visited {
        cache.insert(dir, owner.clone());
    }
    owner
}

/// Derive the candidate module-root set for a file list plus workspace
/// configuration. The repository root is always a candidate.
pub fn candidate_roots(files: &[RepoPath], config: &WorkspaceConfig) -> BTreeSet<RepoPath> {
    let mut roots = BTreeSet::new();
    roots.insert(RepoPath::root());

    // Directories implied by the file list, for glob matching and the
    // top-level fallback.
    let mut dirs = BTreeSet::new();
    for file in files {
        let mut cursor = file.parent();
        while let Some(dir) = cursor {
            if dir.is_root() || !dirs.insert(dir.clone()) {
                break;
            }
            cursor = dir.parent();
        }
    }

    let mut has_nonroot_marker = false;
    for file in files {
        if marker_language(file.file_name()).is_some() {
            let parent = file.parent().unwrap_or_else(RepoPath::root);
            if !parent.is_root() {
                has_nonroot_marker = true;
            }
            roots.insert(parent);
        }
    }

    for root in &config.roots {
        roots.insert(root.clone());
    }

    let globs = WorkspaceGlobs::compile(&config.globs);
    for dir in &dirs {
        if globs.matches(dir) {
            roots.insert(dir.clone());
        }
    }

    // A conventionally-structured but config-less repository still splits
    // into top-level modules instead of collapsing to one.
    if !has_nonroot_marker && config.is_empty() {
        for dir in &dirs {
            if dir.depth() == 1 {
                roots.insert(dir.clone());
            }
        }
    }

    roots
}

/// Resolve the module catalogue for a walked file list.
///
/// Reads workspace configuration and module manifests under `repo_root`;
/// every read or parse failure degrades that one source and never aborts
/// detection.
pub async fn resolve_modules(
    repo_root: &Path,
    files: &[RepoPath],
    diags: &Diagnostics,
) -> Vec<ModuleInfo> {
    let config = workspace::discover(repo_root).await;
    let roots = candidate_roots(files, &config);

    // Per-root accumulation keyed by module path.
    let mut file_counts: BTreeMap<RepoPath, usize> = BTreeMap::new();
    let mut extension_counts: BTreeMap<RepoPath, BTreeMap<ModuleLanguage, usize>> = BTreeMap::new();
    let mut marker_names: BTreeMap<RepoPath, BTreeSet<String>> = BTreeMap::new();
    let mut cache: HashMap<RepoPath, RepoPath> = HashMap::new();

    for file in files {
        let dir = file.parent().unwrap_or_else(RepoPath::root);
        let owner = nearest_enclosing_root(&roots, &dir, &mut cache);

        *file_counts.entry(owner.clone()).or_default() += 1;
        if let Some(language) = extension_language(file) {
            *extension_counts
                .entry(owner.clone())
                .or_default()
                .entry(language)
                .or_default() += 1;
        }
        // A marker's own directory is always a candidate root, so the
        // marker attributes to exactly that module.
        if marker_language(file.file_name()).is_some() {
            marker_names
                .entry(owner)
                .or_default()
                .insert(file.file_name().to_string());
        }
    }

    let mut modules = Vec::with_capacity(roots.len());
    for root in &roots {
        let markers = marker_names.get(root).cloned().unwrap_or_default();
        let marker_languages: BTreeSet<ModuleLanguage> = markers
            .iter()
            .filter_map(|name| marker_language(name))
            .collect();
        let extensions = extension_counts.get(root).cloned().unwrap_or_default();

        let name = module_name(repo_root, root, &markers, diags).await;
        modules.push(ModuleInfo {
            name,
            path: root.clone(),
            language: language::classify(&marker_languages, &extensions),
            file_count: file_counts.get(root).copied().unwrap_or(0),
        });
    }

    debug!(modules = modules.len(), "Resolved module catalogue");
    modules
}

/// Prefer a name declared in the module's own manifest; fall back to the
/// root directory's base name, or the repository directory's name for the
/// synthetic root module.
async fn module_name(
    repo_root: &Path,
    module_root: &RepoPath,
    markers: &BTreeSet<String>,
    _diags: &Diagnostics,
) -> String {
    let dir = module_root.to_fs_path(repo_root);

    for (manifest, parse) in [
        ("package.json", parse_package_name as fn(&str) -> Option<String>),
        ("Cargo.toml", parse_cargo_name),
        ("go.mod", parse_go_module_name),
        ("pyproject.toml", parse_pyproject_name),
    ] {
        if !markers.contains(manifest) {
            continue;
        }
        if let Ok(content) = tokio::fs::read_to_string(dir.join(manifest)).await {
            if let Some(name) = parse(&content) {
                return name;
            }
        }
    }

    if module_root.is_root() {
        repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string())
    } else {
        module_root.file_name().to_string()
    }
}

fn parse_package_name(content: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    value.get("name")?.as_str().map(str::to_string)
}

fn parse_cargo_name(content: &str) -> Option<String> {
    let value: toml::Value = content.parse().ok()?;
    value
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn parse_go_module_name(content: &str) -> Option<String> {
    let line = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("module "))?;
    let module_path = line.trim_start_matches("module ").trim();
    module_path.rsplit('/').next().map(str::to_string)
}

fn parse_pyproject_name(content: &str) -> Option<String> {
    let value: toml::Value = content.parse().ok()?;
    value
        .get("project")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}
