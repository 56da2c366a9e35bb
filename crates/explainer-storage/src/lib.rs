//! Explainer Storage Library
//!
//! This crate provides the storage layer for Explainer: the snapshot store that
//! keeps each repository's immutable file set, and a local blob store used for
//! generated audio.
//!
//! # Snapshot layout
//!
//! - `{root}/{repository_id}/CURRENT` names the live generation
//! - `{root}/{repository_id}/{generation}/catalog.json` is the file catalog
//! - `{root}/{repository_id}/{generation}/files/...` mirrors repository paths
//!
//! Repository file paths must be relative and must not contain `..`; see the
//! `paths` module. Rejected paths are never rewritten into acceptable ones.

pub mod local;
pub mod paths;
pub mod snapshot;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use paths::normalize_relative_path;
pub use snapshot::LocalSnapshotStore;
pub use traits::{SnapshotStore, Storage, StorageError, StorageResult};
