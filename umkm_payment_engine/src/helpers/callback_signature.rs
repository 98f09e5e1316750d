//! # Gateway callback signatures
//!
//! Every payment notification from the gateway carries a `signature_key`. It is the lowercase hex encoding of
//!
//! ```text
//!    SHA-512( order_id || status_code || gross_amount || server_key )
//! ```
//!
//! where `||` is plain string concatenation of the fields exactly as they appear in the payload, and `server_key` is
//! the merchant's secret server key shared with the gateway.
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Calculates the expected signature for the given callback fields.
pub fn callback_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares the supplied signature against the expected one, byte for byte. The comparison time does not depend on
/// where the first mismatch occurs.
pub fn verify_callback_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    signature: &str,
) -> bool {
    let expected = callback_signature(order_id, status_code, gross_amount, server_key);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
