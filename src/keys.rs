//! Key derivation: environment-salted HKDF producing per-folder, per-file,
//! and registry Ed25519 keypairs from the root secret.
//!
//! Generalizes the teacher's `crypto::hkdf` module (which derived from a
//! secp256k1 *user* private key with a flat salt) to the spec's scheme:
//! fixed salt `"CipherBox-IPNS-v1"`, and a structured `info` field of the
//! form `"<env>:<domain>:<id>"` so two environments never share a Name
//! space even when given the same root secret (which in practice they
//! never are, but domain separation is cheap and spec-mandated).

use ed25519_dalek::SigningKey;
use thiserror::Error;
use zeroize::Zeroize;

use crate::config::Environment;
use crate::crypto::hkdf::hkdf_sha256;
use crate::ipns::name::{derive_name, Name, NameError};

/// Fixed HKDF salt for all CipherBox key derivations.
const HKDF_SALT: &[u8] = b"CipherBox-IPNS-v1";

/// Minimum folder/file id length accepted in an `info` string (mirrors the
/// teacher's per-file derivation guard).
const MIN_ID_LENGTH: usize = 10;

#[derive(Debug, Error)]
pub enum KeyDerivationError {
    #[error("HKDF derivation failed")]
    DerivationFailed,
    #[error("Name derivation failed")]
    NameDerivationFailed,
    #[error("invalid id: must be at least {MIN_ID_LENGTH} characters")]
    InvalidId,
}

impl From<NameError> for KeyDerivationError {
    fn from(_: NameError) -> Self {
        KeyDerivationError::NameDerivationFailed
    }
}

/// A derived Ed25519 signing keypair plus its CipherBox `Name`.
pub struct DerivedKeypair {
    pub signing_key: SigningKey,
    pub name: Name,
}

fn derive_ed25519_from_info(
    root_secret: &[u8; 32],
    info: &str,
) -> Result<DerivedKeypair, KeyDerivationError> {
    let mut seed_vec = hkdf_sha256(root_secret, HKDF_SALT, info.as_bytes(), 32)
        .map_err(|_| KeyDerivationError::DerivationFailed)?;
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&seed_vec);
    seed_vec.zeroize();

    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();

    let name = derive_name(&signing_key.verifying_key().to_bytes())?;
    Ok(DerivedKeypair { signing_key, name })
}

/// Derive the Ed25519 IPNS-signing keypair for a child folder.
///
/// `info = "<env>:folder:<folder_id>"`.
pub fn derive_folder_keypair(
    root_secret: &[u8; 32],
    env: Environment,
    folder_id: &str,
) -> Result<DerivedKeypair, KeyDerivationError> {
    if folder_id.len() < MIN_ID_LENGTH {
        return Err(KeyDerivationError::InvalidId);
    }
    let info = format!("{}:folder:{}", env.as_str(), folder_id);
    derive_ed25519_from_info(root_secret, &info)
}

/// Derive the Ed25519 IPNS-signing keypair for the device registry.
///
/// `info = "<env>:registry"`.
pub fn derive_registry_keypair(
    root_secret: &[u8; 32],
    env: Environment,
) -> Result<DerivedKeypair, KeyDerivationError> {
    let info = format!("{}:registry", env.as_str());
    derive_ed25519_from_info(root_secret, &info)
}

/// Derive the *legacy* Ed25519 IPNS-signing keypair for a file.
///
/// New files generate a random Ed25519 key and store its ECIES-wrapped form
/// in the `FilePointer`; this derivation path only exists to resolve files
/// created before that change, whose `FilePointer` has no wrapped key.
/// `info = "<env>:file:<file_id>"`.
pub fn derive_legacy_file_keypair(
    root_secret: &[u8; 32],
    env: Environment,
    file_id: &str,
) -> Result<DerivedKeypair, KeyDerivationError> {
    if file_id.len() < MIN_ID_LENGTH {
        return Err(KeyDerivationError::InvalidId);
    }
    let info = format!("{}:file:{}", env.as_str(), file_id);
    derive_ed25519_from_info(root_secret, &info)
}

/// Generate a fresh random 32-byte AES file symmetric key (fresh upload
/// path -- not HKDF-derived, per spec: only the legacy path derives file
/// keys deterministically).
pub fn generate_file_symmetric_key() -> [u8; 32] {
    crate::crypto::utils::generate_file_key()
}

/// Derive the Ed25519 IPNS-signing keypair for the root folder. Every
/// other folder's key lives in its parent's `FolderPointer`, wrapped; the
/// root folder has no parent, so its keys are derived directly from the
/// root secret under a reserved `info` suffix.
pub fn derive_root_folder_keypair(
    root_secret: &[u8; 32],
    env: Environment,
) -> Result<DerivedKeypair, KeyDerivationError> {
    let info = format!("{}:folder:root", env.as_str());
    derive_ed25519_from_info(root_secret, &info)
}

/// Derive the root folder's AES-256 symmetric key directly from the root
/// secret (every other folder's symmetric key arrives ECIES-wrapped from
/// its parent instead).
pub fn derive_root_folder_key(
    root_secret: &[u8; 32],
    env: Environment,
) -> Result<[u8; 32], KeyDerivationError> {
    let info = format!("{}:root-folder-key", env.as_str());
    let mut key_vec = hkdf_sha256(root_secret, HKDF_SALT, info.as_bytes(), 32)
        .map_err(|_| KeyDerivationError::DerivationFailed)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&key_vec);
    key_vec.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let root = [3u8; 32];
        let a = derive_folder_keypair(&root, Environment::Local, "folder-0001").unwrap();
        let b = derive_folder_keypair(&root, Environment::Local, "folder-0001").unwrap();
        assert_eq!(a.name.as_str(), b.name.as_str());
    }

    #[test]
    fn environments_are_disjoint_name_spaces() {
        let root = [3u8; 32];
        let local = derive_folder_keypair(&root, Environment::Local, "folder-0001").unwrap();
        let prod = derive_folder_keypair(&root, Environment::Production, "folder-0001").unwrap();
        assert_ne!(local.name.as_str(), prod.name.as_str());
    }

    #[test]
    fn different_domains_are_disjoint() {
        let root = [3u8; 32];
        let folder = derive_folder_keypair(&root, Environment::Local, "folder-0001").unwrap();
        let file = derive_legacy_file_keypair(&root, Environment::Local, "folder-0001").unwrap();
        assert_ne!(folder.name.as_str(), file.name.as_str());
    }

    #[test]
    fn short_ids_are_rejected() {
        let root = [3u8; 32];
        assert!(derive_folder_keypair(&root, Environment::Local, "short").is_err());
    }
}
