//! Task ledger: one JSON array document in the blob store.
//!
//! Every mutation is a full read, an in-memory edit and a full rewrite of
//! the document. There is no version token and no lock, so two overlapping
//! mutations can both start from the same snapshot and the later write drops
//! the earlier change (plain last-write-wins).

use std::sync::Arc;
use std::time::Instant;

use base64::prelude::{BASE64_STANDARD, Engine as _};
use opentelemetry::KeyValue;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::model::Task;
use crate::store::BlobStore;
use crate::telemetry::{metrics, spans};

const DOCUMENT_CONTENT_TYPE: &str = "application/json";

/// Decode a create-request body into the trimmed task text.
///
/// `base64` marks bodies that arrive base64-encoded. An empty body counts as
/// `{}`. Anything that does not decode to JSON is [`Error::InvalidJson`]; a
/// missing, non-string or blank `text` is [`Error::InvalidRequest`].
pub fn parse_create_body(body: &[u8], base64: bool) -> Result<String> {
    let decoded;
    let json = if base64 {
        let trimmed = body.trim_ascii();
        decoded = BASE64_STANDARD
            .decode(trimmed)
            .map_err(|_| Error::InvalidJson)?;
        decoded.as_slice()
    } else {
        body
    };

    let value: serde_json::Value = if json.trim_ascii().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_slice(json).map_err(|_| Error::InvalidJson)?
    };

    value
        .get("text")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(text_required)
}

fn text_required() -> Error {
    Error::InvalidRequest("Text is required".to_string())
}

pub struct TaskLedger {
    store: Arc<dyn BlobStore>,
    object_key: String,
    max_document_bytes: u64,
}

impl TaskLedger {
    pub fn new(
        store: Arc<dyn BlobStore>,
        object_key: impl Into<String>,
        max_document_bytes: u64,
    ) -> Self {
        Self {
            store,
            object_key: object_key.into(),
            max_document_bytes,
        }
    }

    /// All tasks in insertion order. A document that was never written is
    /// an empty ledger.
    pub async fn list(&self) -> Result<Vec<Task>> {
        let span = spans::start_ledger_span("list");
        let started = Instant::now();
        let result = self.read_document().instrument(span.clone()).await;
        if let Ok(tasks) = &result {
            spans::record_ledger_size(&span, tasks.len());
        }
        observe("list", started, &result);
        result
    }

    /// Append a task with the given text.
    pub async fn create(&self, text: &str) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(text_required());
        }

        let span = spans::start_ledger_span("create");
        let started = Instant::now();
        let result = async {
            let mut tasks = self.read_document().await?;
            let task = Task::new(text);
            tasks.push(task.clone());
            self.write_document(&tasks).await?;
            spans::record_ledger_size(&span, tasks.len());
            tracing::info!(id = %task.id, "task created");
            Ok::<_, Error>(task)
        }
        .instrument(span.clone())
        .await;
        observe("create", started, &result);
        result
    }

    /// Parse a raw request body and append the task it describes.
    ///
    /// The body is validated before the document is read.
    pub async fn create_from_body(&self, body: &[u8], base64: bool) -> Result<Task> {
        let text = parse_create_body(body, base64)?;
        self.create(&text).await
    }

    /// Remove the task with exactly this id and return it.
    pub async fn delete(&self, id: &str) -> Result<Task> {
        if id.is_empty() {
            return Err(Error::InvalidRequest("ID is required".to_string()));
        }

        let span = spans::start_ledger_span("delete");
        let started = Instant::now();
        let result = async {
            let mut tasks = self.read_document().await?;
            let index = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| {
                    tracing::info!(id, "task not found");
                    Error::NotFound("TODO not found".to_string())
                })?;
            let removed = tasks.remove(index);
            self.write_document(&tasks).await?;
            spans::record_ledger_size(&span, tasks.len());
            tracing::info!(id, "task deleted");
            Ok::<_, Error>(removed)
        }
        .instrument(span.clone())
        .await;
        observe("delete", started, &result);
        result
    }

    async fn read_document(&self) -> Result<Vec<Task>> {
        let Some(object) = self
            .store
            .get(&self.object_key, self.max_document_bytes)
            .await?
        else {
            tracing::debug!(key = %self.object_key, "ledger document absent, starting empty");
            return Ok(Vec::new());
        };

        serde_json::from_slice(&object.body).map_err(|e| {
            Error::Storage(format!("ledger document {} is corrupt: {e}", self.object_key))
        })
    }

    async fn write_document(&self, tasks: &[Task]) -> Result<()> {
        let body = serde_json::to_vec_pretty(tasks)?;
        self.store
            .put(&self.object_key, body, Some(DOCUMENT_CONTENT_TYPE))
            .await
    }
}

fn observe<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) if e.is_client_error() => "rejected",
        Err(_) => "error",
    };
    metrics::ledger_operations().add(
        1,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("result", outcome),
        ],
    );
    metrics::record_duration(operation, started);
}
