//! # thumbledger
//!
//! Signed direct uploads of images, event-triggered normalization of those
//! images into centered square thumbnails, and a small task ledger kept as a
//! single JSON document in the same blob store.

pub mod app;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod ledger;
pub mod model;
pub mod normalizer;
pub mod store;
pub mod telemetry;
pub mod trigger;
