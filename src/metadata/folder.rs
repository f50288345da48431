//! Folder metadata (v2 only): serialize, encrypt, decrypt, validate.
//!
//! Generalizes the teacher's `crypto::folder` (which carries a v1 inline
//! schema alongside v2 for FUSE backward compatibility) to the single v2,
//! per-file-IPNS-pointer schema; this crate has no FUSE layer to stay
//! compatible with. Field naming follows the teacher's
//! `FolderEntry`/`FilePointer` (serde camelCase) rather than inventing new
//! wire names.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use zeroize::Zeroize;

use crate::metadata::envelope::{seal, unseal, Envelope, EnvelopeError};

/// Lower bound on an ECIES-wrapped key's hex length (65-byte uncompressed
/// ephemeral pubkey + 16-byte GCM tag = 81 bytes minimum ciphertext).
const MIN_WRAPPED_HEX_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("serialization failed")]
    SerializationFailed,
}

impl From<EnvelopeError> for MetadataError {
    fn from(_: EnvelopeError) -> Self {
        MetadataError::DecryptionFailed
    }
}

/// `{ version: "v2", children: [FolderChild] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub version: String,
    pub children: Vec<FolderChild>,
}

impl FolderMetadata {
    pub fn new() -> Self {
        Self {
            version: "v2".to_string(),
            children: Vec::new(),
        }
    }
}

impl Default for FolderMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FolderChild {
    Folder(FolderPointer),
    File(FilePointer),
}

impl FolderChild {
    pub fn name(&self) -> &str {
        match self {
            FolderChild::Folder(p) => &p.name,
            FolderChild::File(p) => &p.name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            FolderChild::Folder(p) => &p.id,
            FolderChild::File(p) => &p.id,
        }
    }
}

/// ECIES-wrapped keys for a child folder, held by the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPointer {
    pub id: String,
    pub name: String,
    pub child_name: String,
    /// Hex ECIES wrapping (under the owner's public key) of the child
    /// folder's Ed25519 signing key.
    pub enc_wrapped_priv_key: String,
    /// Hex ECIES wrapping of the child folder's AES-256 symmetric key.
    pub enc_wrapped_folder_key: String,
    pub created_at: u64,
    pub modified_at: u64,
}

/// A slim reference to a file's own per-file metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePointer {
    pub id: String,
    pub name: String,
    pub file_meta_name: String,
    pub created_at: u64,
    pub modified_at: u64,
}

/// Canonical JSON serialize, fresh-IV AES-GCM seal. Caller's plaintext
/// buffer is zeroed before return.
pub fn encrypt_folder_metadata(
    metadata: &FolderMetadata,
    folder_key: &[u8; 32],
) -> Result<Envelope, MetadataError> {
    let mut json =
        serde_json::to_vec(metadata).map_err(|_| MetadataError::SerializationFailed)?;
    let result = seal(&json, folder_key).map_err(MetadataError::from);
    json.zeroize();
    result
}

/// Inverse of [`encrypt_folder_metadata`], with the validation pass spec'd
/// for folder metadata: version must be `"v2"`; `children` must parse as an
/// array; each child must carry a recognized `type`, a non-UUID-format-
/// agnostic but present `id`, and a nonempty `name`; a `FolderPointer`'s two
/// `enc*` fields must be hex strings of at least [`MIN_WRAPPED_HEX_LEN`]
/// characters. Any violation collapses to `DecryptionFailed` -- this
/// function never distinguishes "wrong key" from "malformed plaintext" to
/// a caller.
pub fn decrypt_folder_metadata(
    envelope: &Envelope,
    folder_key: &[u8; 32],
) -> Result<FolderMetadata, MetadataError> {
    let mut json = unseal(envelope, folder_key)?;

    let result = (|| -> Result<FolderMetadata, MetadataError> {
        let value: JsonValue =
            serde_json::from_slice(&json).map_err(|_| MetadataError::DecryptionFailed)?;

        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or(MetadataError::DecryptionFailed)?;
        if version != "v2" {
            return Err(MetadataError::DecryptionFailed);
        }

        let children = value
            .get("children")
            .and_then(|v| v.as_array())
            .ok_or(MetadataError::DecryptionFailed)?;

        for child in children {
            validate_child(child)?;
        }

        serde_json::from_value(value).map_err(|_| MetadataError::DecryptionFailed)
    })();

    json.zeroize();
    result
}

fn validate_child(child: &JsonValue) -> Result<(), MetadataError> {
    let type_str = child
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(MetadataError::DecryptionFailed)?;

    let id = child
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or(MetadataError::DecryptionFailed)?;
    if id.is_empty() {
        return Err(MetadataError::DecryptionFailed);
    }

    let name = child
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or(MetadataError::DecryptionFailed)?;
    if name.is_empty() {
        return Err(MetadataError::DecryptionFailed);
    }

    match type_str {
        "folder" => {
            for field in ["encWrappedPrivKey", "encWrappedFolderKey"] {
                let hex_str = child
                    .get(field)
                    .and_then(|v| v.as_str())
                    .ok_or(MetadataError::DecryptionFailed)?;
                if hex_str.len() < MIN_WRAPPED_HEX_LEN || hex::decode(hex_str).is_err() {
                    return Err(MetadataError::DecryptionFailed);
                }
            }
            Ok(())
        }
        "file" => {
            if child
                .get("fileMetaName")
                .and_then(|v| v.as_str())
                .map(|s| s.is_empty())
                .unwrap_or(true)
            {
                return Err(MetadataError::DecryptionFailed);
            }
            Ok(())
        }
        _ => Err(MetadataError::DecryptionFailed),
    }
}
