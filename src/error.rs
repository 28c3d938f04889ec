//! Error types for thumbledger.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Request body could not be decoded or parsed as JSON.
    #[error("request body is not valid JSON")]
    InvalidJson,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A ledger entry addressed by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The trigger named an object that is not in the store.
    #[error("object missing: {0}")]
    ObjectMissing(String),

    #[error("object {key} exceeds {limit} bytes")]
    ObjectTooLarge { key: String, limit: u64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for faults the caller caused (bad input, unknown ids or routes).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidJson
                | Error::InvalidRequest(_)
                | Error::NotFound(_)
                | Error::RouteNotFound { .. }
                | Error::Forbidden(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
