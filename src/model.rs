//! Core data model.
//!
//! Tasks live in the ledger document; image assets live under the
//! `raw/` and `processed/` key namespaces of the blob store.

pub mod asset;
pub mod task;

pub use asset::{ImageKind, PROCESSED_PREFIX, RAW_PREFIX};
pub use task::Task;
