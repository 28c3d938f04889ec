//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The upload signing key is wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_OBJECT_KEY: &str = "todos.json";
pub const DEFAULT_COLLECTION: &str = "todo-images";
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug)]
pub struct Config {
    pub bucket_name: String,
    pub upload_signing_secret: SecretString,
    pub storage_root: PathBuf,
    pub todo_object_key: String,
    pub upload_collection: String,
    pub public_base_url: String,
    pub listen_addr: SocketAddr,
    /// Deployment stage prefix, e.g. `prod` for `/prod/api/todos`.
    pub api_stage: Option<String>,
    pub max_object_bytes: u64,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let listen_addr = optional_var("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("LISTEN_ADDR is not a socket address: {e}")))?;

        let max_object_bytes = match optional_var("MAX_OBJECT_BYTES") {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("MAX_OBJECT_BYTES is not a number: {e}")))?,
            None => DEFAULT_MAX_OBJECT_BYTES,
        };

        Ok(Self {
            bucket_name: required_var("BUCKET_NAME")?,
            upload_signing_secret: SecretString::from(required_var("UPLOAD_SIGNING_SECRET")?),
            storage_root: optional_var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            todo_object_key: optional_var("TODO_OBJECT_KEY")
                .unwrap_or_else(|| DEFAULT_OBJECT_KEY.to_string()),
            upload_collection: optional_var("UPLOAD_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            public_base_url: optional_var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            listen_addr,
            api_stage: optional_var("API_STAGE").map(|s| s.trim_matches('/').to_string()),
            max_object_bytes,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Directory holding the configured bucket's objects.
    pub fn bucket_dir(&self) -> PathBuf {
        self.storage_root.join(&self.bucket_name)
    }
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name)
        .ok_or_else(|| Error::Config(format!("required environment variable {name} is not set")))
}

/// Unset and empty variables are treated the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
