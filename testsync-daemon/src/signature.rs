//! `X-Hub-Signature-256` verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use testsync_core::Secret;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "sha256=";

/// Checks payload signatures against the configured webhook secret.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    secret: Option<Secret>,
}

impl SignatureVerifier {
    /// An empty secret counts as none.
    pub fn new(secret: Option<Secret>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.secret.is_none()
    }

    /// `true` when `header` is `sha256=<hex>` of the HMAC of `payload`.
    ///
    /// Without a secret every payload passes. A missing or malformed header
    /// fails.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> bool {
        let Some(secret) = &self.secret else {
            warn!("no webhook secret configured; accepting unsigned payload");
            return true;
        };
        let Some(provided) = header.and_then(|h| h.trim().strip_prefix(PREFIX)) else {
            return false;
        };
        let Ok(provided) = hex::decode(provided) else {
            return false;
        };
        let Some(expected) = mac(secret.expose().as_bytes(), payload) else {
            return false;
        };
        if provided.len() != expected.len() {
            return false;
        }
        expected.ct_eq(provided.as_slice()).into()
    }
}

/// `sha256=<hex>` header value for `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> Option<String> {
    mac(secret.as_bytes(), payload).map(|digest| format!("{PREFIX}{}", hex::encode(digest)))
}

fn mac(secret: &[u8], payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}
