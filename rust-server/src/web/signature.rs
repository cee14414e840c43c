//! Meta webhook signature verification.
//!
//! Meta signs webhook requests with HMAC-SHA256 over the raw request body
//! and sends the result in the `X-Hub-Signature-256` header as
//! `sha256=<hex>`.
//! Reference: https://developers.facebook.com/docs/graph-api/webhooks/getting-started#validating-payloads
//!
//! The digest must be computed over the exact bytes received on the wire;
//! re-serializing a parsed body is not guaranteed to reproduce them.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify a Meta webhook signature header against the raw request body.
///
/// # Arguments
///
/// * `app_secret` - The app secret shared with Meta
/// * `body` - The raw request body bytes, exactly as received
/// * `signature_header` - The `X-Hub-Signature-256` header value, if present
///
/// # Returns
///
/// `true` iff the header is present, carries the `sha256=` algorithm tag,
/// and its hex digest matches HMAC-SHA256(app_secret, body). All failure
/// modes return `false`; this function never panics.
///
/// The digest comparison goes through [`subtle::ConstantTimeEq`] so the
/// time taken does not depend on where the first differing byte occurs.
pub fn verify_signature(app_secret: &str, body: &[u8], signature_header: Option<&str>) -> bool {
    let header = match signature_header {
        Some(h) => h,
        None => {
            warn!("signature_header_missing");
            return false;
        }
    };

    // Only the sha256 algorithm tag is accepted, case-sensitively
    let claimed_hex = match header.strip_prefix("sha256=") {
        Some(rest) => rest,
        None => {
            warn!("signature_header_unexpected_format");
            return false;
        }
    };

    if claimed_hex.is_empty() {
        warn!("signature_digest_empty");
        return false;
    }

    let claimed = match hex::decode(claimed_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!("signature_digest_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("signature_invalid_key");
            return false;
        }
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    // Reject length mismatches before comparing
    if claimed.len() != expected.len() {
        warn!(
            claimed_length = claimed.len(),
            expected_length = expected.len(),
            "signature_length_mismatch"
        );
        return false;
    }

    let valid: bool = expected.as_slice().ct_eq(claimed.as_slice()).into();

    if !valid {
        warn!("signature_mismatch");
    }

    valid
}
