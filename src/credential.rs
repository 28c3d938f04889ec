//! Upload credential issuer.
//!
//! Hands out a fresh `raw/` key plus a short-lived, write-only credential
//! for it. Nothing is written to the store here; the object appears only when
//! the client uploads.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::model::ImageKind;
use crate::model::asset::raw_key;
use crate::store::BlobStore;
use crate::telemetry::metrics;

/// How long an upload credential stays valid.
pub const UPLOAD_TTL: Duration = Duration::from_secs(300);

/// Response to a credential request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub key: String,
    pub file_id: String,
}

pub struct CredentialIssuer {
    store: Arc<dyn BlobStore>,
    collection: String,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn BlobStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Issue a credential for one upload of the requested content type.
    ///
    /// Unrecognized or missing content types fall back to JPEG.
    pub async fn issue(&self, content_type: Option<&str>) -> Result<UploadTicket> {
        let kind = ImageKind::from_content_type(content_type);
        let file_id = Uuid::new_v4().to_string();
        let key = raw_key(&self.collection, &file_id, kind);

        let presigned = self
            .store
            .presign_put(&key, kind.content_type(), UPLOAD_TTL)
            .await;
        metrics::uploads_issued().add(
            1,
            &[
                KeyValue::new("content_type", kind.content_type()),
                KeyValue::new("result", if presigned.is_ok() { "ok" } else { "error" }),
            ],
        );
        let presigned = presigned?;

        tracing::info!(
            bucket = self.store.bucket(),
            key = %key,
            expires_at = %presigned.expires_at,
            "issued upload credential"
        );

        Ok(UploadTicket {
            upload_url: presigned.url,
            key,
            file_id,
        })
    }
}
