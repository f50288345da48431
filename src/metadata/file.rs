//! Per-file metadata (v1): the record a `FilePointer` names, encrypted
//! under the *parent folder's* symmetric key (never the file's own key).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::metadata::envelope::{seal, unseal, Envelope, EnvelopeError};

#[derive(Debug, Error)]
pub enum FileMetadataError {
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("serialization failed")]
    SerializationFailed,
}

impl From<EnvelopeError> for FileMetadataError {
    fn from(_: EnvelopeError) -> Self {
        FileMetadataError::DecryptionFailed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMode {
    #[serde(rename = "GCM")]
    Gcm,
    #[serde(rename = "CTR")]
    Ctr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub version: String,
    pub cid: String,
    pub file_key_encrypted: String,
    pub file_iv: String,
    pub size: u64,
    pub mime_type: String,
    pub encryption_mode: EncryptionMode,
    pub created_at: u64,
    pub modified_at: u64,
}

pub fn encrypt_file_metadata(
    metadata: &FileMetadata,
    folder_key: &[u8; 32],
) -> Result<Envelope, FileMetadataError> {
    let mut json =
        serde_json::to_vec(metadata).map_err(|_| FileMetadataError::SerializationFailed)?;
    let result = seal(&json, folder_key).map_err(FileMetadataError::from);
    json.zeroize();
    result
}

/// Inverse of [`encrypt_file_metadata`]. Validates `version == "v1"` and
/// that `encryptionMode` is a recognized discriminant (handled by serde's
/// own decode failure for unknown variants).
pub fn decrypt_file_metadata(
    envelope: &Envelope,
    folder_key: &[u8; 32],
) -> Result<FileMetadata, FileMetadataError> {
    let mut json = unseal(envelope, folder_key)?;

    let result = (|| -> Result<FileMetadata, FileMetadataError> {
        let metadata: FileMetadata =
            serde_json::from_slice(&json).map_err(|_| FileMetadataError::DecryptionFailed)?;
        if metadata.version != "v1" {
            return Err(FileMetadataError::DecryptionFailed);
        }
        Ok(metadata)
    })();

    json.zeroize();
    result
}
