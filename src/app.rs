//! Service wiring: every handle is built once at startup and shared by `Arc`.

use std::sync::Arc;

use axum::Router;
use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::credential::CredentialIssuer;
use crate::error::Result;
use crate::http::{self, AppState, UploadEndpoint};
use crate::ledger::TaskLedger;
use crate::normalizer::ImageNormalizer;
use crate::store::{BlobStore, FsStore, UploadSigner};
use crate::trigger::IngestSender;

pub struct App {
    pub store: Arc<dyn BlobStore>,
    pub signer: Arc<UploadSigner>,
    pub ledger: Arc<TaskLedger>,
    pub issuer: Arc<CredentialIssuer>,
    pub normalizer: Arc<ImageNormalizer>,
    max_object_bytes: u64,
    api_stage: Option<String>,
}

impl App {
    /// Open the configured bucket directory and build all services on it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let signer = Arc::new(UploadSigner::new(
            SecretString::from(config.upload_signing_secret.expose_secret().to_string()),
            &config.public_base_url,
        ));
        let store: Arc<dyn BlobStore> = Arc::new(
            FsStore::open(&config.bucket_name, config.bucket_dir(), Arc::clone(&signer)).await?,
        );

        tracing::info!(
            bucket = %config.bucket_name,
            root = %config.bucket_dir().display(),
            ledger_key = %config.todo_object_key,
            "blob store ready"
        );

        let mut app = Self::with_store(
            store,
            signer,
            &config.todo_object_key,
            &config.upload_collection,
            config.max_object_bytes,
        );
        app.api_stage = config.api_stage.clone();
        Ok(app)
    }

    /// Build services on an existing store.
    pub fn with_store(
        store: Arc<dyn BlobStore>,
        signer: Arc<UploadSigner>,
        ledger_key: &str,
        collection: &str,
        max_object_bytes: u64,
    ) -> Self {
        Self {
            ledger: Arc::new(TaskLedger::new(
                Arc::clone(&store),
                ledger_key,
                max_object_bytes,
            )),
            issuer: Arc::new(CredentialIssuer::new(Arc::clone(&store), collection)),
            normalizer: Arc::new(ImageNormalizer::new(Arc::clone(&store), max_object_bytes)),
            store,
            signer,
            max_object_bytes,
            api_stage: None,
        }
    }

    /// HTTP router over these services. Uploads received through the signed
    /// upload route are announced on `ingest` when given.
    pub fn router(&self, ingest: Option<IngestSender>) -> Router {
        let uploads = Arc::new(UploadEndpoint {
            store: Arc::clone(&self.store),
            signer: Arc::clone(&self.signer),
            ingest,
            max_bytes: self.max_object_bytes,
        });
        http::router(
            AppState {
                ledger: Arc::clone(&self.ledger),
                issuer: Arc::clone(&self.issuer),
            },
            Some(uploads),
            self.api_stage.as_deref(),
        )
    }
}
