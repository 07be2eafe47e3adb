//! Strata Core
//!
//! Shared currency types for the Strata structural indexer:
//! - `RepoPath`: normalized repository-relative paths, the universal path
//!   form used by every other component
//! - `IndexConfig`: thresholds, hash algorithm and walker policy settings

pub mod config;
pub mod path;

pub use config::{HashAlgorithm, IndexConfig, SymlinkPolicy};
pub use path::RepoPath;
