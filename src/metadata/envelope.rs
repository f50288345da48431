//! The on-wire encrypted form of a metadata record.
//!
//! Unlike the teacher's `seal_aes_gcm` (which concatenates IV, ciphertext,
//! and tag into one opaque blob), an `Envelope` keeps the IV and ciphertext
//! as separate hex/base64 fields so it round-trips through JSON the way the
//! rest of the wire protocol expects.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::aes::{decrypt_aes_gcm, encrypt_aes_gcm, AES_IV_SIZE};
use crate::crypto::utils::{bytes_to_hex, generate_iv, hex_to_bytes};

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("malformed envelope")]
    MalformedEnvelope,
}

/// `{iv: hex, data: base64(ciphertext)}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub iv: String,
    pub data: String,
}

/// Fresh-IV AES-256-GCM seal of `plaintext` under `key`. The caller's
/// plaintext buffer is the caller's to zero; this function zeroes its own
/// working copy before returning.
pub fn seal(plaintext: &[u8], key: &[u8; 32]) -> Result<Envelope, EnvelopeError> {
    let iv = generate_iv();
    let mut ciphertext =
        encrypt_aes_gcm(plaintext, key, &iv).map_err(|_| EnvelopeError::EncryptionFailed)?;
    let envelope = Envelope {
        iv: bytes_to_hex(&iv),
        data: BASE64.encode(&ciphertext),
    };
    ciphertext.zeroize();
    Ok(envelope)
}

/// Inverse of [`seal`]. Returns the decrypted plaintext; the caller is
/// responsible for zeroing it once consumed.
pub fn unseal(envelope: &Envelope, key: &[u8; 32]) -> Result<Vec<u8>, EnvelopeError> {
    let iv_bytes = hex_to_bytes(&envelope.iv).map_err(|_| EnvelopeError::MalformedEnvelope)?;
    if iv_bytes.len() != AES_IV_SIZE {
        return Err(EnvelopeError::MalformedEnvelope);
    }
    let mut iv = [0u8; AES_IV_SIZE];
    iv.copy_from_slice(&iv_bytes);

    let ciphertext = BASE64
        .decode(&envelope.data)
        .map_err(|_| EnvelopeError::MalformedEnvelope)?;

    decrypt_aes_gcm(&ciphertext, key, &iv).map_err(|_| EnvelopeError::DecryptionFailed)
}
