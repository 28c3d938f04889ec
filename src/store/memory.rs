//! In-memory blob store for tests and dry runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobStore, PresignedPut, StoredObject, expiry_after, validate_key};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// All keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str, max_bytes: u64) -> Result<Option<StoredObject>> {
        validate_key(key)?;
        let objects = self.objects.read().await;
        match objects.get(key) {
            Some(object) if object.body.len() as u64 > max_bytes => Err(Error::ObjectTooLarge {
                key: key.to_string(),
                limit: max_bytes,
            }),
            other => Ok(other.cloned()),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        validate_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<PresignedPut> {
        validate_key(key)?;
        let expires_at = expiry_after(ttl)?;
        Ok(PresignedPut {
            url: format!(
                "memory://{}/{key}?contentType={content_type}&expires={}",
                self.bucket,
                expires_at.timestamp()
            ),
            expires_at,
        })
    }
}
