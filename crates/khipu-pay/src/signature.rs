//! Canonical signing and verification of parameter sets.
//!
//! Signing side and verifying side both go through [`canonical_encode`]:
//! fields sorted by name (byte order), `hash` dropped, values form-encoded,
//! joined with `&`. The HMAC-SHA256 of that string under the shared secret,
//! as lowercase hex, is the signature.

use std::fmt;

use crate::encoding;
use crate::hmac::{compute_hmac, constant_time_eq};
use crate::params::ParameterSet;

/// Shared credential used as the HMAC key. Never transmitted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

/// Lowercase hex HMAC-SHA256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The exact string that gets signed.
pub fn canonical_encode(params: &ParameterSet) -> String {
    encoding::encode_fields(params.signable())
}

/// Sign `params` with `secret`. Any `hash` field in `params` is ignored.
pub fn sign(params: &ParameterSet, secret: &Secret) -> Signature {
    let canonical = canonical_encode(params);
    tracing::debug!(canonical = %canonical, "signing canonical string");
    Signature(compute_hmac(secret.as_bytes(), canonical.as_bytes()))
}

/// Check `claimed` against the signature of `params` under `secret`.
///
/// The `hash` field, if present in `params`, is excluded before signing.
/// Comparison is exact and case-sensitive; a mismatch is `false`, not an error.
pub fn verify(params: &ParameterSet, claimed: &str, secret: &Secret) -> bool {
    let expected = sign(params, secret);
    constant_time_eq(expected.as_str().as_bytes(), claimed.as_bytes())
}

/// Stateless codec bound to one secret.
#[derive(Debug, Clone)]
pub struct SignatureCodec {
    secret: Secret,
}

impl SignatureCodec {
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn canonical_encode(&self, params: &ParameterSet) -> String {
        canonical_encode(params)
    }

    pub fn sign(&self, params: &ParameterSet) -> Signature {
        sign(params, &self.secret)
    }

    pub fn verify(&self, params: &ParameterSet, claimed: &str) -> bool {
        verify(params, claimed, &self.secret)
    }
}
