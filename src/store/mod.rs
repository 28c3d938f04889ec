//! Blob store abstraction.
//!
//! The store is a plain key/value object store: per-key read-after-write
//! consistency, no compare-and-swap, no multi-key transactions. Handles are
//! built once at startup and shared behind `Arc<dyn BlobStore>`.

pub mod fs;
pub mod memory;
pub mod signing;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use signing::UploadSigner;

/// Object body plus the content type it was stored with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// A time-limited credential to write exactly one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedPut {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Name of the bucket this handle addresses.
    fn bucket(&self) -> &str;

    /// Read a whole object, refusing bodies larger than `max_bytes`.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str, max_bytes: u64) -> Result<Option<StoredObject>>;

    /// Create or replace an object.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: Option<&str>) -> Result<()>;

    /// Issue a write-only credential for `key`, scoped to `content_type`.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<PresignedPut>;
}

/// Reject keys that could escape the bucket or collide with store internals.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(Error::InvalidRequest(format!("invalid object key: {key:?}")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment.starts_with('.') || segment.contains('\\'))
    {
        return Err(Error::InvalidRequest(format!("invalid object key: {key:?}")));
    }
    Ok(())
}

pub(crate) fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| Error::Other(format!("credential ttl out of range: {e}")))?;
    Ok(Utc::now() + ttl)
}
