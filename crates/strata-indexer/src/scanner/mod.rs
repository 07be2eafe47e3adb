//! File system scanning.
//!
//! A deterministic, ignore-filtered walk of the repository tree: layered
//! gitignore matching plus an explicit-stack depth-first walker whose
//! output order is the ordinal `RepoPath` order every downstream
//! component relies on.

mod ignore;
mod walker;

pub use ignore::{IgnoreLayer, IgnoreStack, DEFAULT_IGNORES};
pub use walker::{FileWalk, WalkOptions, Walker};

use strata_core::IndexConfig;

impl From<&IndexConfig> for WalkOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            symlink_policy: config.symlink_policy,
            max_depth: config.max_depth,
            ignore_overrides: config.ignore_overrides.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::SymlinkPolicy;

    #[test]
    fn test_walk_options_from_config() {
        let config = IndexConfig {
            symlink_policy: SymlinkPolicy::FollowFile,
            max_depth: Some(4),
            ignore_overrides: vec!["!node_modules/pkg/**".to_string()],
            ..Default::default()
        };

        let options = WalkOptions::from(&config);
        assert_eq!(options.symlink_policy, SymlinkPolicy::FollowFile);
        assert_eq!(options.max_depth, Some(4));
        assert_eq!(options.ignore_overrides.len(), 1);
    }
}
