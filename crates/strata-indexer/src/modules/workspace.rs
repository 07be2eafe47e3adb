//! Workspace configuration discovery.
//!
//! Recognized monorepo configuration sources are parsed into one
//! `WorkspaceConfig` of glob patterns and explicit roots. Every source
//! degrades silently to empty on a missing or malformed file; workspace
//! discovery never fails module detection as a whole.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_core::RepoPath;
use tracing::debug;

/// Top-level file names whose change invalidates module boundaries and
/// forces a full rebuild.
pub const WORKSPACE_CONFIG_FILES: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pnpm-workspace.yaml",
    "lerna.json",
    "go.work",
];

/// Declared monorepo sub-project locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace-style glob patterns, possibly negated, in source order
    pub globs: Vec<String>,
    /// Explicit root directories from non-glob sources
    pub roots: Vec<RepoPath>,
}

impl WorkspaceConfig {
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty() && self.roots.is_empty()
    }
}

/// Read and combine all recognized configuration sources under the
/// repository root.
pub async fn discover(repo_root: &Path) -> WorkspaceConfig {
    let mut config = WorkspaceConfig::default();

    if let Some(content) = read_source(repo_root, "package.json").await {
        config.globs.extend(parse_package_workspaces(&content));
    }
    if let Some(content) = read_source(repo_root, "pnpm-workspace.yaml").await {
        config.globs.extend(parse_pnpm_workspace(&content));
    }
    if let Some(content) = read_source(repo_root, "lerna.json").await {
        config.globs.extend(parse_lerna(&content));
    }
    if let Some(content) = read_source(repo_root, "Cargo.toml").await {
        config.globs.extend(parse_cargo_workspace(&content));
    }
    if let Some(content) = read_source(repo_root, "go.work").await {
        config.roots.extend(parse_go_work(&content));
    }

    debug!(
        globs = config.globs.len(),
        roots = config.roots.len(),
        "Discovered workspace config"
    );

    config
}

async fn read_source(repo_root: &Path, name: &str) -> Option<String> {
    tokio::fs::read_to_string(repo_root.join(name)).await.ok()
}

/// `package.json` `workspaces`: a bare array or `{ "packages": [...] }`.
pub fn parse_package_workspaces(content: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        debug!("Malformed package.json, ignoring workspaces");
        return Vec::new();
    };
    let workspaces = match value.get("workspaces") {
        Some(serde_json::Value::Array(items)) => items,
        Some(serde_json::Value::Object(map)) => match map.get("packages") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    workspaces
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// `pnpm-workspace.yaml` `packages` list.
pub fn parse_pnpm_workspace(content: &str) -> Vec<String> {
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(content) else {
        debug!("Malformed pnpm-workspace.yaml, ignoring");
        return Vec::new();
    };
    match value.get("packages") {
        Some(serde_yaml::Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// `lerna.json` `packages` list.
pub fn parse_lerna(content: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        debug!("Malformed lerna.json, ignoring");
        return Vec::new();
    };
    match value.get("packages") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// `Cargo.toml` `[workspace].members`, with `exclude` entries appended as
/// negated globs so the last matching pattern wins per directory.
pub fn parse_cargo_workspace(content: &str) -> Vec<String> {
    let Ok(value) = content.parse::<toml::Value>() else {
        debug!("Malformed Cargo.toml, ignoring workspace");
        return Vec::new();
    };
    let Some(workspace) = value.get("workspace") else {
        return Vec::new();
    };

    let mut globs = Vec::new();
    if let Some(members) = workspace.get("members").and_then(|m| m.as_array()) {
        globs.extend(
            members
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string)),
        );
    }
    if let Some(exclude) = workspace.get("exclude").and_then(|e| e.as_array()) {
        globs.extend(
            exclude
                .iter()
                .filter_map(|item| item.as_str().map(|s| format!("!{s}"))),
        );
    }
    globs
}

/// `go.work` `use` directives: single form and block form.
pub fn parse_go_work(content: &str) -> Vec<RepoPath> {
    let mut roots = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else {
                roots.push(RepoPath::new(line));
            }
        } else if line == "use (" {
            in_block = true;
        } else if let Some(rest) = line.strip_prefix("use ") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
            } else {
                roots.push(RepoPath::new(rest));
            }
        }
    }

    roots
}

/// Compiled workspace glob matcher over repository-relative directories.
///
/// `*` matches within one path segment, `**` crosses segments, and a
/// negated pattern excludes a previously included directory; the last
/// matching pattern in listed order wins.
#[derive(Debug)]
pub struct WorkspaceGlobs {
    matcher: Option<Gitignore>,
}

impl WorkspaceGlobs {
    pub fn compile(globs: &[String]) -> Self {
        if globs.is_empty() {
            return Self { matcher: None };
        }
        let mut builder = GitignoreBuilder::new("");
        for glob in globs {
            // Anchor at the repository root; workspace globs are always
            // root-relative, unlike bare gitignore patterns.
            let anchored = match glob.strip_prefix('!') {
                Some(rest) if !rest.starts_with('/') => format!("!/{rest}"),
                None if !glob.starts_with('/') => format!("/{glob}"),
                _ => glob.clone(),
            };
            if let Err(e) = builder.add_line(None, &anchored) {
                debug!(pattern = %glob, "Invalid workspace glob, skipping: {}", e);
            }
        }
        Self {
            matcher: builder.build().ok(),
        }
    }

    /// Does this directory match the workspace globs?
    pub fn matches(&self, dir: &RepoPath) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        if dir.is_root() {
            return false;
        }
        matcher.matched(dir.as_str(), true).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_package_workspaces_array() {
        let globs = parse_package_workspaces(r#"{"workspaces": ["packages/*", "tools/cli"]}"#);
        assert_eq!(globs, vec!["packages/*", "tools/cli"]);
    }

    #[test]
    fn test_parse_package_workspaces_object() {
        let globs =
            parse_package_workspaces(r#"{"workspaces": {"packages": ["apps/**"], "nohoist": []}}"#);
        assert_eq!(globs, vec!["apps/**"]);
    }

    #[test]
    fn test_parse_package_workspaces_malformed() {
        assert!(parse_package_workspaces("{not json").is_empty());
        assert!(parse_package_workspaces(r#"{"name": "x"}"#).is_empty());
    }

    #[test]
    fn test_parse_pnpm_workspace() {
        let globs = parse_pnpm_workspace("packages:\n  - 'packages/*'\n  - '!packages/legacy'\n");
        assert_eq!(globs, vec!["packages/*", "!packages/legacy"]);
        assert!(parse_pnpm_workspace(": : :").is_empty());
    }

    #[test]
    fn test_parse_lerna() {
        let globs = parse_lerna(r#"{"packages": ["packages/*"]}"#);
        assert_eq!(globs, vec!["packages/*"]);
    }

    #[test]
    fn test_parse_cargo_workspace() {
        let globs = parse_cargo_workspace(
            "[workspace]\nmembers = [\"crates/*\"]\nexclude = [\"crates/old\"]\n",
        );
        assert_eq!(globs, vec!["crates/*", "!crates/old"]);
        assert!(parse_cargo_workspace("[package]\nname = \"x\"\n").is_empty());
        assert!(parse_cargo_workspace("not toml [").is_empty());
    }

    #[test]
    fn test_parse_go_work() {
        let roots = parse_go_work("go 1.21\n\nuse ./tools\nuse (\n\t./a\n\t./b // comment\n)\n");
        assert_eq!(
            roots,
            vec![RepoPath::new("tools"), RepoPath::new("a"), RepoPath::new("b")]
        );
    }

    #[test]
    fn test_globs_star_does_not_cross_separator() {
        let globs = WorkspaceGlobs::compile(&["packages/*".to_string()]);
        assert!(globs.matches(&RepoPath::new("packages/x")));
        assert!(!globs.matches(&RepoPath::new("packages/x/nested")));
        assert!(!globs.matches(&RepoPath::new("other/x")));
    }

    #[test]
    fn test_globs_double_star_crosses_separator() {
        let globs = WorkspaceGlobs::compile(&["apps/**".to_string()]);
        assert!(globs.matches(&RepoPath::new("apps/x")));
        assert!(globs.matches(&RepoPath::new("apps/x/nested")));
    }

    #[test]
    fn test_globs_negation_last_match_wins() {
        let globs = WorkspaceGlobs::compile(&[
            "packages/*".to_string(),
            "!packages/legacy".to_string(),
        ]);
        assert!(globs.matches(&RepoPath::new("packages/x")));
        assert!(!globs.matches(&RepoPath::new("packages/legacy")));
    }

    #[test]
    fn test_globs_anchored_at_root() {
        let globs = WorkspaceGlobs::compile(&["tools".to_string()]);
        assert!(globs.matches(&RepoPath::new("tools")));
        // Not a bare gitignore pattern: must not match at depth.
        assert!(!globs.matches(&RepoPath::new("nested/tools")));
    }

    #[test]
    fn test_globs_empty_and_invalid() {
        let globs = WorkspaceGlobs::compile(&[]);
        assert!(!globs.matches(&RepoPath::new("anything")));

        let globs = WorkspaceGlobs::compile(&["a[bad".to_string(), "ok".to_string()]);
        assert!(globs.matches(&RepoPath::new("ok")));
    }

    #[tokio::test]
    async fn test_discover_combines_sources() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("go.work"), "use ./gotools\n").unwrap();

        let config = discover(temp_dir.path()).await;
        assert_eq!(config.globs, vec!["packages/*"]);
        assert_eq!(config.roots, vec![RepoPath::new("gotools")]);
    }

    #[tokio::test]
    async fn test_discover_empty_repo() {
        let temp_dir = tempdir().unwrap();
        let config = discover(temp_dir.path()).await;
        assert!(config.is_empty());
    }

    #[tokio::test]
    async fn test_discover_malformed_source_degrades() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("package.json"), "{broken").unwrap();
        std::fs::write(
            temp_dir.path().join("pnpm-workspace.yaml"),
            "packages:\n  - 'libs/*'\n",
        )
        .unwrap();

        let config = discover(temp_dir.path()).await;
        assert_eq!(config.globs, vec!["libs/*"]);
    }
}
