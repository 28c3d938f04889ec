//! Ingest trigger: events announcing new objects, and a local dispatcher that
//! feeds them to the normalizer.
//!
//! On the wire an event is either `{"bucket": .., "key": ..}` or an S3-style
//! notification envelope. Wire keys are URL-encoded with `+` for spaces;
//! [`IngestEvent`] always holds the decoded key.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::normalizer::{ImageNormalizer, NormalizeOutcome};

/// A new object appeared in `bucket` at `key` (decoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestEvent {
    pub bucket: String,
    pub key: String,
}

impl IngestEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Build from a key as delivered by a store notification.
    pub fn from_wire(bucket: impl Into<String>, encoded_key: &str) -> Self {
        Self::new(bucket, decode_object_key(encoded_key))
    }
}

/// Undo notification key encoding: `+` becomes space, then `%XX` escapes
/// are decoded.
pub fn decode_object_key(encoded: &str) -> String {
    let spaced = encoded.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireEvent {
    Envelope {
        #[serde(rename = "Records")]
        records: Vec<WireRecord>,
    },
    Direct {
        bucket: String,
        key: String,
    },
}

#[derive(Deserialize)]
struct WireRecord {
    s3: WireEntity,
}

#[derive(Deserialize)]
struct WireEntity {
    bucket: WireBucket,
    object: WireObject,
}

#[derive(Deserialize)]
struct WireBucket {
    name: String,
}

#[derive(Deserialize)]
struct WireObject {
    key: String,
}

/// Parse a notification payload into events, in delivery order.
pub fn parse_events(payload: &[u8]) -> Result<Vec<IngestEvent>> {
    let wire: WireEvent = serde_json::from_slice(payload)
        .map_err(|e| Error::InvalidRequest(format!("unrecognized ingest event: {e}")))?;
    Ok(match wire {
        WireEvent::Envelope { records } => records
            .into_iter()
            .map(|r| IngestEvent::from_wire(r.s3.bucket.name, &r.s3.object.key))
            .collect(),
        WireEvent::Direct { bucket, key } => vec![IngestEvent::from_wire(bucket, &key)],
    })
}

/// Run events through the normalizer in order; the first failure aborts.
pub async fn handle_all(
    normalizer: &ImageNormalizer,
    events: &[IngestEvent],
) -> Result<Vec<NormalizeOutcome>> {
    let mut outcomes = Vec::with_capacity(events.len());
    for event in events {
        outcomes.push(normalizer.handle(event).await?);
    }
    Ok(outcomes)
}

/// Sending half handed to whatever creates objects locally.
#[derive(Clone)]
pub struct IngestSender {
    tx: mpsc::UnboundedSender<IngestEvent>,
}

impl IngestSender {
    pub fn notify(&self, event: IngestEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|e| Error::Other(format!("ingest dispatcher is gone, dropped {}", e.0.key)))
    }
}

/// Local stand-in for the store's notification mechanism.
///
/// Failed events are logged and dropped; redelivery is not simulated.
pub struct IngestDispatcher {
    rx: mpsc::UnboundedReceiver<IngestEvent>,
    normalizer: Arc<ImageNormalizer>,
}

impl IngestDispatcher {
    pub fn new(normalizer: Arc<ImageNormalizer>) -> (IngestSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (IngestSender { tx }, Self { rx, normalizer })
    }

    /// Process events until every sender is dropped. Returns how many
    /// events were received.
    pub async fn run(mut self) -> usize {
        let mut received = 0;
        while let Some(event) = self.rx.recv().await {
            received += 1;
            match self.normalizer.handle(&event).await {
                Ok(outcome) => tracing::debug!(?outcome, "ingest event handled"),
                Err(e) => tracing::error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    "ingest event failed"
                ),
            }
        }
        tracing::info!(received, "ingest dispatcher stopped");
        received
    }
}
