//! HMAC-SHA256 signed upload URLs.
//!
//! A presigned URL carries the key in its path and `contentType`, `expires`
//! (unix seconds) and `signature` in its query. The signature covers method,
//! key, content type and expiry, so a credential cannot be replayed against
//! another key or content type.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::PresignedPut;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Route prefix the signed URLs point at.
pub const UPLOAD_ROUTE: &str = "/uploads";

const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');
const PATH: &AsciiSet = &QUERY.remove(b'/');

pub struct UploadSigner {
    secret: SecretString,
    base_url: String,
}

impl UploadSigner {
    pub fn new(secret: SecretString, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { secret, base_url }
    }

    pub fn presign(
        &self,
        key: &str,
        content_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PresignedPut> {
        let expires = expires_at.timestamp();
        let signature = self.sign(key, content_type, expires)?;
        let url = format!(
            "{}{UPLOAD_ROUTE}/{}?contentType={}&expires={expires}&signature={signature}",
            self.base_url,
            utf8_percent_encode(key, PATH),
            utf8_percent_encode(content_type, QUERY),
        );
        Ok(PresignedPut {
            url,
            // Round-trip through the unix timestamp so the reported expiry
            // matches what the URL enforces.
            expires_at: Utc
                .timestamp_opt(expires, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Check a presented credential against `now`.
    pub fn verify(
        &self,
        key: &str,
        content_type: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let presented = hex::decode(signature)
            .map_err(|_| Error::Forbidden("malformed upload signature".to_string()))?;
        self.mac(key, content_type, expires)?
            .verify_slice(&presented)
            .map_err(|_| Error::Forbidden("upload signature mismatch".to_string()))?;
        if now.timestamp() > expires {
            return Err(Error::Forbidden("upload credential expired".to_string()));
        }
        Ok(())
    }

    fn sign(&self, key: &str, content_type: &str, expires: i64) -> Result<String> {
        let mac = self.mac(key, content_type, expires)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self, key: &str, content_type: &str, expires: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| Error::Config(format!("bad upload signing secret: {e}")))?;
        mac.update(format!("PUT\n{key}\n{content_type}\n{expires}").as_bytes());
        Ok(mac)
    }
}

impl std::fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
