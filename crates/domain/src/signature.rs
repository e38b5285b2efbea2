//! Gateway callback signing.
//!
//! The gateway signs its callback as hex-encoded
//! `HMAC-SHA256(secret, gateway_order_id + "|" + gateway_payment_id)`.
//! Everything else in the callback is client-relayed and untrusted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> HmacSha256 {
    // HMAC accepts keys of any length; new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    mac
}

/// Computes the expected hex-encoded callback signature.
pub fn compute(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    hex::encode(mac(secret, gateway_order_id, gateway_payment_id).finalize().into_bytes())
}

/// Verifies a supplied hex-encoded signature in constant time.
///
/// Malformed hex is simply a failed verification, never an error that
/// escapes this boundary.
pub fn verify(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    supplied: &str,
) -> bool {
    let Ok(supplied_bytes) = hex::decode(supplied) else {
        return false;
    };

    mac(secret, gateway_order_id, gateway_payment_id)
        .verify_slice(&supplied_bytes)
        .is_ok()
}
