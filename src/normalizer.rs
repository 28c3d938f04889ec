//! Image normalizer: turns a `raw/` upload into a centered square under
//! `processed/`.
//!
//! One call handles one ingest event: fetch → decode → crop → encode → write.
//! Failures propagate so the trigger can redeliver; there is no retry here.
//! Re-running for the same key rewrites the same bytes, so redelivery is safe.

use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;
use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::model::ImageKind;
use crate::model::asset::processed_key;
use crate::store::BlobStore;
use crate::telemetry::{metrics, spans};
use crate::trigger::IngestEvent;

/// Why an event was acknowledged without doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Key is not under `raw/`, e.g. our own `processed/` output.
    OutsideRawNamespace,
    /// Event names a bucket other than the one this store addresses.
    ForeignBucket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NormalizeOutcome {
    Skipped {
        key: String,
        reason: SkipReason,
    },
    Processed {
        source_key: String,
        dest_key: String,
        /// Side length of the square, `min(width, height)` of the source.
        size: u32,
        content_type: String,
    },
}

impl NormalizeOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Processed { .. } => "processed",
        }
    }
}

/// Offset and side of a centered square inside a `width × height` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Largest centered square; the longer axis loses `(long - short) / 2` on
/// the leading edge, the remainder on the trailing edge.
pub fn center_square(width: u32, height: u32) -> CropWindow {
    let size = width.min(height);
    CropWindow {
        x: (width - size) / 2,
        y: (height - size) / 2,
        size,
    }
}

/// Encoded square plus the source geometry it came from.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub bytes: Vec<u8>,
    pub source_width: u32,
    pub source_height: u32,
    pub window: CropWindow,
}

/// Decode `bytes`, cut the centered square and encode it as `output`.
///
/// No resampling happens: the square keeps the source's pixels 1:1.
pub fn crop_to_square(bytes: &[u8], output: ImageKind) -> Result<CroppedImage> {
    let img = image::load_from_memory(bytes)?;
    let (source_width, source_height) = (img.width(), img.height());
    let window = center_square(source_width, source_height);
    if window.size == 0 {
        return Err(Error::Other("image has no pixels".to_string()));
    }

    let square = img.crop_imm(window.x, window.y, window.size, window.size);
    // JPEG has no alpha channel.
    let square = match output {
        ImageKind::Jpeg => DynamicImage::ImageRgb8(square.to_rgb8()),
        ImageKind::Png => square,
    };

    let mut out = Cursor::new(Vec::new());
    square.write_to(&mut out, output.format())?;

    Ok(CroppedImage {
        bytes: out.into_inner(),
        source_width,
        source_height,
        window,
    })
}

pub struct ImageNormalizer {
    store: Arc<dyn BlobStore>,
    max_object_bytes: u64,
}

impl ImageNormalizer {
    pub fn new(store: Arc<dyn BlobStore>, max_object_bytes: u64) -> Self {
        Self {
            store,
            max_object_bytes,
        }
    }

    /// Handle one ingest event.
    pub async fn handle(&self, event: &IngestEvent) -> Result<NormalizeOutcome> {
        let span = spans::start_normalize_span(&event.bucket, &event.key);
        let started = std::time::Instant::now();

        let result = self.normalize(event).instrument(span.clone()).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "error",
        };
        spans::record_outcome(&span, label);
        metrics::images_normalized().add(1, &[KeyValue::new("result", label)]);
        metrics::record_duration("normalize", started);

        result
    }

    async fn normalize(&self, event: &IngestEvent) -> Result<NormalizeOutcome> {
        let source_key = event.key.clone();

        if event.bucket != self.store.bucket() {
            tracing::warn!(
                bucket = %event.bucket,
                expected = self.store.bucket(),
                "skipping event for foreign bucket"
            );
            return Ok(NormalizeOutcome::Skipped {
                key: source_key,
                reason: SkipReason::ForeignBucket,
            });
        }

        let Some(dest_key) = processed_key(&source_key) else {
            tracing::info!(key = %source_key, "skipping object outside raw/ namespace");
            return Ok(NormalizeOutcome::Skipped {
                key: source_key,
                reason: SkipReason::OutsideRawNamespace,
            });
        };

        tracing::info!(key = %source_key, "processing image");

        let object = self
            .store
            .get(&source_key, self.max_object_bytes)
            .await?
            .ok_or_else(|| Error::ObjectMissing(source_key.clone()))?;

        let content_type = object
            .content_type
            .unwrap_or_else(|| ImageKind::Jpeg.content_type().to_string());
        let output = ImageKind::from_content_type(Some(&content_type));

        let body = object.body;
        let cropped = tokio::task::spawn_blocking(move || crop_to_square(&body, output))
            .await
            .map_err(|e| Error::Other(format!("crop task failed: {e}")))??;

        tracing::info!(
            width = cropped.source_width,
            height = cropped.source_height,
            size = cropped.window.size,
            dest = %dest_key,
            "uploading cropped image"
        );

        self.store
            .put(&dest_key, cropped.bytes, Some(&content_type))
            .await?;

        tracing::info!(dest = %dest_key, "image normalized");

        Ok(NormalizeOutcome::Processed {
            source_key,
            dest_key,
            size: cropped.window.size,
            content_type,
        })
    }
}
