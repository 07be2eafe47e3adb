//! Incremental structural repository indexer.
//!
//! Walks a repository in deterministic order under layered gitignore
//! rules, builds a content-addressed file index with a small worker
//! pool, resolves module boundaries from workspace configuration and
//! marker files, and plans full or incremental derived-data updates
//! from the diff against the previous persisted snapshot.

mod diag;
mod error;
pub mod handoff;
pub mod index;
pub mod modules;
pub mod scanner;
pub mod storage;
pub mod update;

pub use diag::{Diagnostic, Diagnostics};
pub use error::IndexerError;
pub use handoff::{merge_artifacts, IndexHandoff};
pub use index::{ChangeSet, FileIndex, FileIndexEntry};
pub use modules::{ModuleInfo, ModuleLanguage, WorkspaceConfig};
pub use scanner::{WalkOptions, Walker};
pub use storage::{IndexSnapshot, ModuleCatalogue, Storage, StorageOptions};
pub use update::{plan_update, IndexRun, Indexer, UpdateMode, UpdatePlan};

pub use strata_core::{HashAlgorithm, IndexConfig, RepoPath, SymlinkPolicy};
