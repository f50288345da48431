//! TEE enrollment protocol: wrap a Name's signing key under the TEE's
//! current epoch public key so the TEE can republish on a schedule without
//! ever seeing a plaintext key.
//!
//! Grounded on the teacher's `api::types::TeeKeysResponse` (current/previous
//! epoch public keys) and its zero-on-drop discipline; the actual attested
//! enclave is an external collaborator (spec section 1), so `TeeClient` is
//! a thin trait seam like [`crate::transport::NameRelay`]. The epoch-
//! fallback decrypt function models the TEE's own "try current, then
//! previous" logic purely so this crate's tests can exercise the wire
//! protocol end to end; it is not meant to run inside the real enclave.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::ecies::{unwrap_key, wrap_key};
use crate::error::CoreError;
use crate::ipns::Name;

#[derive(Debug, Error)]
pub enum TeeError {
    /// Deliberately generic: the TEE must never distinguish wrong key,
    /// corrupt ciphertext, or unknown epoch to a caller (no oracle).
    #[error("enrollment failed")]
    EnrollmentFailed,
}

impl From<TeeError> for CoreError {
    fn from(_: TeeError) -> Self {
        CoreError::DecryptionFailed
    }
}

/// The TEE's currently published epoch keypairs, fetched by the client
/// before every enrollment.
#[derive(Debug, Clone)]
pub struct TeeEpochKeys {
    pub current_epoch: u64,
    pub current_public_key: Vec<u8>,
    pub previous_epoch: Option<u64>,
    pub previous_public_key: Option<Vec<u8>>,
}

/// Trait seam for the TEE's republish/enrollment endpoint.
#[async_trait]
pub trait TeeClient: Send + Sync {
    async fn fetch_epoch_keys(&self) -> Result<TeeEpochKeys, TeeError>;
    async fn enroll(
        &self,
        name: &Name,
        enc_wrapped_signing_key: Vec<u8>,
        epoch: u64,
    ) -> Result<(), TeeError>;
}

/// Ed25519 private keys travel in the 64-byte libp2p layout (seed ‖
/// public key), per the data model.
fn libp2p_private_key_bytes(signing_key: &SigningKey) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(signing_key.as_bytes());
    buf[32..].copy_from_slice(signing_key.verifying_key().as_bytes());
    buf
}

/// Wrap `signing_key` under the TEE's current epoch public key for
/// enrollment. The intermediate plaintext key buffer is zeroed before
/// returning on every exit path.
pub fn wrap_signing_key_for_epoch(
    signing_key: &SigningKey,
    epoch_public_key: &[u8],
) -> Result<Vec<u8>, TeeError> {
    let mut priv_bytes = libp2p_private_key_bytes(signing_key);
    let result = wrap_key(&priv_bytes, epoch_public_key).map_err(|_| TeeError::EnrollmentFailed);
    priv_bytes.zeroize();
    result
}

/// Enroll `signing_key` for `name`: wrap under the TEE's current epoch and
/// return the bytes a caller submits alongside its next publish as
/// `encWrappedSigningKey` plus `teeEpoch`.
pub async fn enroll<T: TeeClient>(
    client: &T,
    name: &Name,
    signing_key: &SigningKey,
) -> Result<(), TeeError> {
    let epoch_keys = client.fetch_epoch_keys().await?;
    let wrapped = wrap_signing_key_for_epoch(signing_key, &epoch_keys.current_public_key)?;
    client.enroll(name, wrapped, epoch_keys.current_epoch).await
}

/// Model of the TEE's own decrypt-with-fallback: try `current` first, fall
/// back to `previous` if the wrapped blob was sealed under the prior
/// epoch. Returns a generic failure in all cases -- no oracle on which
/// epoch (or neither) matched.
pub fn unwrap_with_epoch_fallback(
    wrapped: &[u8],
    current_priv: &[u8],
    previous_priv: Option<&[u8]>,
) -> Result<SigningKey, TeeError> {
    let mut priv_bytes = unwrap_key(wrapped, current_priv)
        .or_else(|_| match previous_priv {
            Some(prev) => unwrap_key(wrapped, prev),
            None => Err(crate::crypto::ecies::EciesError::UnwrappingFailed),
        })
        .map_err(|_| TeeError::EnrollmentFailed)?;

    if priv_bytes.len() != 64 {
        priv_bytes.zeroize();
        return Err(TeeError::EnrollmentFailed);
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&priv_bytes[..32]);
    priv_bytes.zeroize();

    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(signing_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::generate_ed25519_keypair;

    fn test_signing_key() -> SigningKey {
        let (_pub, priv_bytes) = generate_ed25519_keypair();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&priv_bytes);
        SigningKey::from_bytes(&seed)
    }

    fn secp_keypair() -> (ecies::SecretKey, Vec<u8>) {
        let sk_bytes = crate::crypto::utils::generate_random_bytes(32);
        let sk = ecies::SecretKey::parse_slice(&sk_bytes).unwrap();
        let pk = ecies::PublicKey::from_secret_key(&sk);
        (sk, pk.serialize().to_vec())
    }

    #[test]
    fn wrap_and_fallback_unwrap_round_trips_under_current_epoch() {
        let (epoch_sk, epoch_pub) = secp_keypair();
        let key = test_signing_key();

        let wrapped = wrap_signing_key_for_epoch(&key, &epoch_pub).unwrap();
        let recovered =
            unwrap_with_epoch_fallback(&wrapped, &epoch_sk.serialize(), None).unwrap();
        assert_eq!(recovered.to_bytes(), key.to_bytes());
    }

    #[test]
    fn falls_back_to_previous_epoch() {
        let (old_sk, old_pub) = secp_keypair();
        let (new_sk, _new_pub) = secp_keypair();
        let key = test_signing_key();

        // Wrapped under the *old* epoch's key; the TEE's current epoch is
        // now `new_sk`, so it must fall back to `old_sk`.
        let wrapped = wrap_signing_key_for_epoch(&key, &old_pub).unwrap();
        let recovered = unwrap_with_epoch_fallback(
            &wrapped,
            &new_sk.serialize(),
            Some(&old_sk.serialize()),
        )
        .unwrap();
        assert_eq!(recovered.to_bytes(), key.to_bytes());
    }

    #[test]
    fn neither_epoch_matches_generic_error() {
        let (_old_sk, old_pub) = secp_keypair();
        let (unrelated_sk, _unrelated_pub) = secp_keypair();
        let (another_sk, _another_pub) = secp_keypair();
        let key = test_signing_key();

        let wrapped = wrap_signing_key_for_epoch(&key, &old_pub).unwrap();
        let result = unwrap_with_epoch_fallback(
            &wrapped,
            &unrelated_sk.serialize(),
            Some(&another_sk.serialize()),
        );
        assert!(result.is_err());
    }
}
