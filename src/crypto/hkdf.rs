//! Generic HKDF-SHA256, the primitive the `keys` module builds its
//! environment-salted derivations on top of.

use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HkdfPrimitiveError {
    #[error("HKDF derivation failed")]
    DerivationFailed,
}

/// HKDF-SHA256 extract-then-expand.
///
/// `out_len` is unbounded by this function (SHA-256 HKDF supports up to
/// 255*32 bytes); callers ask for exactly the key material size they need.
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, HkdfPrimitiveError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; out_len];
    hk.expand(info, &mut okm)
        .map_err(|_| HkdfPrimitiveError::DerivationFailed)?;
    Ok(okm)
}
