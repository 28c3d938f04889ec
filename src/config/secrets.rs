//! Secret handling utilities.
//!
//! Re-exports secrecy types used for the upload signing key.

pub use secrecy::{ExposeSecret, SecretString};
