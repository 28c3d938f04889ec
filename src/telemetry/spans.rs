//! Span helpers for the image pipeline and the ledger.

use tracing::Span;

/// Span covering one ingest event.
///
/// `normalize.outcome` is declared empty and filled by [`record_outcome`].
pub fn start_normalize_span(bucket: &str, key: &str) -> Span {
    tracing::info_span!(
        "image.normalize",
        "blob.bucket" = bucket,
        "blob.key" = key,
        "normalize.outcome" = tracing::field::Empty,
    )
}

/// Span covering one ledger read-modify-write cycle.
pub fn start_ledger_span(operation: &'static str) -> Span {
    tracing::info_span!(
        "ledger.operation",
        "ledger.operation" = operation,
        "ledger.size" = tracing::field::Empty,
    )
}

/// Record how an ingest event ended.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("normalize.outcome", outcome);
}

/// Record the number of tasks in the document after an operation.
pub fn record_ledger_size(span: &Span, size: usize) {
    span.record("ledger.size", size);
}
