use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `message` keyed with `secret`.
/// Returns the lowercase hex-encoded MAC.
pub fn compute_hmac(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time equality that leaks neither content nor length.
///
/// Both sides are hashed to fixed-length digests first, then compared with
/// `subtle::ConstantTimeEq`. Used for signature and bearer token checks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}
