//! Webhook signature verification
//!
//! Inbound requests carry an HMAC-SHA256 of the raw body in the
//! `X-Hub-Signature-256` header, keyed by the shared webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::HookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the `sha256=<hex>` signature of a request body
pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, HookError> {
    let mut mac = new_mac(secret)?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
}

/// Verify a `sha256=<hex>` signature against the raw request body.
///
/// Comparison happens on the decoded digest via `Mac::verify_slice`,
/// which is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), HookError> {
    let hex_digest = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| HookError::AuthError("invalid signature".to_string()))?;

    let digest = hex::decode(hex_digest)
        .ok_or_else(|| HookError::AuthError("invalid signature".to_string()))?;

    let mut mac = new_mac(secret)?;
    mac.update(body);
    mac.verify_slice(&digest)
        .map_err(|_| HookError::AuthError("invalid signature".to_string()))
}

fn new_mac(secret: &str) -> Result<HmacSha256, HookError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| HookError::AuthError("failed to initialize hmac".to_string()))
}

/// Hex encoding utilities
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(data: impl AsRef<[u8]>) -> String {
        let data = data.as_ref();
        let mut result = String::with_capacity(data.len() * 2);
        for byte in data {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}
