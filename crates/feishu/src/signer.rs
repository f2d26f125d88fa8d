//! Request signing for custom bots with "signature verification" enabled.
//!
//! signature = base64(HMAC-SHA256(key = secret, message = "{timestamp}\n{secret}"))

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Pure; an empty secret is signed like any other; callers decide whether to sign.
pub fn sign(secret: &str, timestamp: i64) -> String {
    let string_to_sign = format!("{}\n{}", timestamp, secret);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take any key size");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
