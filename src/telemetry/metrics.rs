//! Metric instruments.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op, so recording is
//! always safe.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("thumbledger")
}

/// Counter: upload credentials issued.
/// Labels: `content_type`, `result` ("ok" | "error").
pub fn uploads_issued() -> Counter<u64> {
    meter()
        .u64_counter("thumbledger.uploads.issued")
        .with_description("Number of upload credentials requested")
        .build()
}

/// Counter: ingest events handled by the normalizer.
/// Labels: `result` ("processed" | "skipped" | "error").
pub fn images_normalized() -> Counter<u64> {
    meter()
        .u64_counter("thumbledger.images.normalized")
        .with_description("Number of ingest events handled")
        .build()
}

/// Counter: ledger operations.
/// Labels: `operation`, `result`.
pub fn ledger_operations() -> Counter<u64> {
    meter()
        .u64_counter("thumbledger.ledger.operations")
        .with_description("Number of task ledger operations")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("thumbledger.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Record one timed operation on the duration histogram.
pub fn record_duration(operation: &'static str, started: std::time::Instant) {
    operation_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("operation", operation)],
    );
}
