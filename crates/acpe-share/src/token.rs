//! Share token generation.

use acpe_core::ShareToken;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Fewest random bytes a token may carry.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Most random bytes a token may carry (128 base64url characters).
pub const MAX_TOKEN_BYTES: usize = 96;

/// Generate a fresh URL-safe token from `bytes` random bytes.
///
/// `bytes` is clamped to `MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES`.
pub fn generate_token(bytes: usize) -> ShareToken {
    let mut buf = vec![0u8; bytes.clamp(MIN_TOKEN_BYTES, MAX_TOKEN_BYTES)];
    OsRng.fill_bytes(&mut buf);
    ShareToken::new(URL_SAFE_NO_PAD.encode(&buf))
}
