//! Callback signature verification
//!
//! The gateway callback carries `x-gateway-signature`: lowercase hex of
//! HMAC-SHA256 over the raw request body. Unsigned or mis-signed
//! callbacks are rejected before any status transition is attempted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn verify_callback_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Sign a body the way the gateway does. Used by tests and by local
/// tooling that replays callbacks.
pub fn sign_callback(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
