//! Webhook signature verification
//!
//! Shopify signs each delivery with HMAC-SHA-256 over the raw request body
//! and sends the base64 digest in `X-Shopify-Hmac-Sha256`. Verification must
//! run on the bytes exactly as received; any re-serialization invalidates the
//! signature. The final comparison is constant-time (`subtle`), after a
//! plain length gate.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Why a delivery failed verification. Recorded in the audit trail; the
/// sender only ever sees a generic 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    MissingSignature,
    MissingSecret,
    EmptyBody,
    MalformedSignature,
    Mismatch,
}

impl std::fmt::Display for SignatureRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SignatureRejection::MissingSignature => "signature header missing",
            SignatureRejection::MissingSecret => "shared secret not configured",
            SignatureRejection::EmptyBody => "request body empty",
            SignatureRejection::MalformedSignature => "signature header is not valid base64",
            SignatureRejection::Mismatch => "signature mismatch",
        };
        f.write_str(reason)
    }
}

/// Verify a delivery, reporting why it was rejected. Never panics.
pub fn check_signature(
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: &str,
) -> Result<(), SignatureRejection> {
    let header = signature_header
        .filter(|h| !h.is_empty())
        .ok_or(SignatureRejection::MissingSignature)?;
    if secret.is_empty() {
        return Err(SignatureRejection::MissingSecret);
    }
    if raw_body.is_empty() {
        return Err(SignatureRejection::EmptyBody);
    }

    let received = base64::engine::general_purpose::STANDARD
        .decode(header)
        .map_err(|_| SignatureRejection::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureRejection::MissingSecret)?;
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    // Length gate first; lengths are not secret.
    if received.len() != expected.len() {
        return Err(SignatureRejection::Mismatch);
    }
    if bool::from(received.as_slice().ct_eq(expected.as_slice())) {
        Ok(())
    } else {
        Err(SignatureRejection::Mismatch)
    }
}

/// Boolean form of [`check_signature`]
pub fn verify(raw_body: &[u8], signature_header: Option<&str>, secret: &str) -> bool {
    check_signature(raw_body, signature_header, secret).is_ok()
}

/// Compute the base64 signature Shopify would send for `raw_body`. Used by
/// tests and local tooling to forge valid deliveries.
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(raw_body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
