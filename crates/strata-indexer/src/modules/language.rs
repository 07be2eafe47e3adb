//! Module language classification.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strata_core::RepoPath;

/// Language assigned to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleLanguage {
    Node,
    Rust,
    Go,
    Python,
    Java,
    /// Marker files or file extensions name more than one language
    Mixed,
    /// No classifiable files at all
    Unknown,
}

impl ModuleLanguage {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleLanguage::Node => "node",
            ModuleLanguage::Rust => "rust",
            ModuleLanguage::Go => "go",
            ModuleLanguage::Python => "python",
            ModuleLanguage::Java => "java",
            ModuleLanguage::Mixed => "mixed",
            ModuleLanguage::Unknown => "unknown",
        }
    }
}

/// Language-marker files that make a directory a candidate module root.
pub const MARKER_FILES: &[(&str, ModuleLanguage)] = &[
    ("package.json", ModuleLanguage::Node),
    ("Cargo.toml", ModuleLanguage::Rust),
    ("go.mod", ModuleLanguage::Go),
    ("pyproject.toml", ModuleLanguage::Python),
    ("setup.py", ModuleLanguage::Python),
    ("pom.xml", ModuleLanguage::Java),
    ("build.gradle", ModuleLanguage::Java),
    ("build.gradle.kts", ModuleLanguage::Java),
];

/// Language implied by a marker file name, if any.
pub fn marker_language(file_name: &str) -> Option<ModuleLanguage> {
    MARKER_FILES
        .iter()
        .find(|(marker, _)| *marker == file_name)
        .map(|(_, language)| *language)
}

/// Language implied by a source file's extension, if recognized.
pub fn extension_language(path: &RepoPath) -> Option<ModuleLanguage> {
    let name = path.file_name();
    let ext = name.rsplit_once('.')?.1.to_lowercase();
    match ext.as_str() {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Some(ModuleLanguage::Node),
        "rs" => Some(ModuleLanguage::Rust),
        "go" => Some(ModuleLanguage::Go),
        "py" | "pyi" => Some(ModuleLanguage::Python),
        "java" | "kt" | "kts" => Some(ModuleLanguage::Java),
        _ => None,
    }
}

/// Fraction of classified files a language must hold to win the
/// extension-majority fallback.
const MAJORITY_PERCENT: usize = 60;

/// Classify a module from its marker languages and per-extension counts.
///
/// Markers decide when unambiguous; more than one marker language is
/// `Mixed`. Without markers, the majority extension language wins only at
/// a 60% share of classified files; a module with zero classifiable files
/// is `Unknown`.
pub fn classify(
    marker_languages: &BTreeSet<ModuleLanguage>,
    extension_counts: &BTreeMap<ModuleLanguage, usize>,
) -> ModuleLanguage {
    match marker_languages.len() {
        1 => return *marker_languages.iter().next().unwrap(),
        0 => {}
        _ => return ModuleLanguage::Mixed,
    }

    let total: usize = extension_counts.values().sum();
    if total == 0 {
        return ModuleLanguage::Unknown;
    }
    let (language, count) = extension_counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(language, count)| (*language, *count))
        .unwrap();
    if count * 100 >= total * MAJORITY_PERCENT {
        language
    } else {
        ModuleLanguage::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(languages: &[ModuleLanguage]) -> BTreeSet<ModuleLanguage> {
        languages.iter().copied().collect()
    }

    fn counts(pairs: &[(ModuleLanguage, usize)]) -> BTreeMap<ModuleLanguage, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_marker_language() {
        assert_eq!(marker_language("package.json"), Some(ModuleLanguage::Node));
        assert_eq!(marker_language("Cargo.toml"), Some(ModuleLanguage::Rust));
        assert_eq!(marker_language("go.mod"), Some(ModuleLanguage::Go));
        assert_eq!(marker_language("README.md"), None);
    }

    #[test]
    fn test_extension_language() {
        assert_eq!(
            extension_language(&RepoPath::new("src/a.ts")),
            Some(ModuleLanguage::Node)
        );
        assert_eq!(
            extension_language(&RepoPath::new("src/main.RS")),
            Some(ModuleLanguage::Rust)
        );
        assert_eq!(extension_language(&RepoPath::new("README.md")), None);
        assert_eq!(extension_language(&RepoPath::new("Makefile")), None);
    }

    #[test]
    fn test_single_marker_wins() {
        let result = classify(
            &markers(&[ModuleLanguage::Rust]),
            &counts(&[(ModuleLanguage::Node, 100)]),
        );
        assert_eq!(result, ModuleLanguage::Rust);
    }

    #[test]
    fn test_multiple_markers_is_mixed() {
        let result = classify(
            &markers(&[ModuleLanguage::Rust, ModuleLanguage::Node]),
            &counts(&[]),
        );
        assert_eq!(result, ModuleLanguage::Mixed);
    }

    #[test]
    fn test_extension_majority_at_threshold() {
        // Exactly 60% holds the majority.
        let result = classify(
            &markers(&[]),
            &counts(&[(ModuleLanguage::Go, 6), (ModuleLanguage::Python, 4)]),
        );
        assert_eq!(result, ModuleLanguage::Go);
    }

    #[test]
    fn test_extension_below_threshold_is_mixed() {
        let result = classify(
            &markers(&[]),
            &counts(&[(ModuleLanguage::Go, 5), (ModuleLanguage::Python, 5)]),
        );
        assert_eq!(result, ModuleLanguage::Mixed);
    }

    #[test]
    fn test_no_classifiable_files_is_unknown() {
        assert_eq!(classify(&markers(&[]), &counts(&[])), ModuleLanguage::Unknown);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ModuleLanguage::Node).unwrap(),
            "\"node\""
        );
        assert_eq!(
            serde_json::to_string(&ModuleLanguage::Mixed).unwrap(),
            "\"mixed\""
        );
    }
}
