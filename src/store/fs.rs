//! Directory-backed blob store.
//!
//! One directory per bucket. Object bytes live at `<root>/<key>`; the content
//! type lives in a sidecar under `<root>/.meta/<key>.json`. Every write goes
//! to a temp file first and is renamed into place, so a single object write
//! is atomic. Nothing coordinates writers of the same key: last rename wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use super::{BlobStore, PresignedPut, StoredObject, UploadSigner, expiry_after, validate_key};
use crate::error::{Error, Result};

const META_DIR: &str = ".meta";

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: Option<String>,
}

#[derive(Debug)]
pub struct FsStore {
    bucket: String,
    root: PathBuf,
    signer: Arc<UploadSigner>,
}

impl FsStore {
    /// Open (creating if needed) the bucket directory at `root`.
    pub async fn open(
        bucket: impl Into<String>,
        root: impl Into<PathBuf>,
        signer: Arc<UploadSigner>,
    ) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            bucket: bucket.into(),
            root,
            signer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{key}.json"))
    }

    async fn read_meta(&self, key: &str) -> Result<ObjectMeta> {
        match tokio::fs::read(self.meta_path(key)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ObjectMeta { content_type: None }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FsStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str, max_bytes: u64) -> Result<Option<StoredObject>> {
        validate_key(key)?;

        let file = match tokio::fs::File::open(self.object_path(key)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let too_large = || Error::ObjectTooLarge {
            key: key.to_string(),
            limit: max_bytes,
        };
        if file.metadata().await?.len() > max_bytes {
            return Err(too_large());
        }

        // The file may grow between the stat and the read; the take() keeps
        // the buffer bounded regardless.
        let mut body = Vec::new();
        file.take(max_bytes.saturating_add(1))
            .read_to_end(&mut body)
            .await?;
        if body.len() as u64 > max_bytes {
            return Err(too_large());
        }

        let meta = self.read_meta(key).await?;
        Ok(Some(StoredObject {
            body,
            content_type: meta.content_type,
        }))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        validate_key(key)?;

        let meta = ObjectMeta {
            content_type: content_type.map(str::to_string),
        };
        // Body first: a failed write leaves the previous object and its
        // content type paired.
        write_atomic(&self.object_path(key), &body).await?;
        write_atomic(&self.meta_path(key), &serde_json::to_vec(&meta)?).await?;

        tracing::debug!(bucket = %self.bucket, key, bytes = body.len(), "object written");
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<PresignedPut> {
        validate_key(key)?;
        self.signer.presign(key, content_type, expiry_after(ttl)?)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("no parent directory for {}", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let tmp = parent.join(format!(".tmp-{}", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
