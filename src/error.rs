//! Crate-wide error taxonomy.
//!
//! Leaf crypto modules keep their own narrow `thiserror` enums (`AesError`,
//! `EciesError`, ...) and never wrap each other's variants. The higher-level
//! modules (`metadata`, `publish`, `share`, `tee`, `registry`) return
//! [`CoreError`], whose variant names are exactly the error taxonomy names
//! from the spec so they stay meaningful to a caller regardless of which
//! module produced them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Any authenticated decrypt, metadata validation, or envelope parse
    /// failure. Message is intentionally constant -- never distinguishes
    /// wrong key from corrupt ciphertext from malformed plaintext.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Pre-check failure on a key byte length or curve-point validation.
    #[error("invalid key size")]
    InvalidKeySize,

    /// Producer-side signing failure. Not safe to blindly retry (the key
    /// itself may be bad).
    #[error("signing failed")]
    SigningFailed,

    /// Key derivation failed. Unlike `SigningFailed`, safe to retry --
    /// derivation is a pure function of its inputs.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// Publish attempted before the per-Name sequence cache was initialized,
    /// and resolve also failed. Never silently treated as sequence 0.
    #[error("sequence unknown: cache uninitialized and resolve failed")]
    SequenceUnknown,

    /// Resolve returned nothing for a Name (distinct from a malformed
    /// record, which is `UnverifiedRecord` or `DecryptionFailed`).
    #[error("name not found")]
    NameNotFound,

    /// Resolve returned a record lacking signature fields. Lookup
    /// succeeded; the content is not trusted.
    #[error("unverified record")]
    UnverifiedRecord,

    /// Upstream object-store quota signal.
    #[error("quota exceeded")]
    QuotaExceeded,

    /// Share access denied: revoked, or caller is not a member.
    #[error("revoked or not a member")]
    RevokedOrNotAMember,

    /// Opaque failure from the name-routing relay, mapped away from
    /// whatever transport-specific error the caller's `NameRelay`
    /// implementation produced.
    #[error("bad gateway: {0}")]
    BadGateway(String),
}

impl From<crate::crypto::aes::AesError> for CoreError {
    fn from(_: crate::crypto::aes::AesError) -> Self {
        CoreError::DecryptionFailed
    }
}

impl From<crate::crypto::ecies::EciesError> for CoreError {
    fn from(e: crate::crypto::ecies::EciesError) -> Self {
        use crate::crypto::ecies::EciesError;
        match e {
            EciesError::InvalidPublicKeySize
            | EciesError::InvalidPublicKeyFormat
            | EciesError::InvalidPrivateKeySize => CoreError::InvalidKeySize,
            EciesError::WrappingFailed | EciesError::UnwrappingFailed => CoreError::DecryptionFailed,
        }
    }
}

impl From<crate::crypto::ed25519::Ed25519Error> for CoreError {
    fn from(_: crate::crypto::ed25519::Ed25519Error) -> Self {
        CoreError::SigningFailed
    }
}

impl From<crate::metadata::MetadataError> for CoreError {
    fn from(_: crate::metadata::MetadataError) -> Self {
        CoreError::DecryptionFailed
    }
}

impl From<crate::keys::KeyDerivationError> for CoreError {
    fn from(_: crate::keys::KeyDerivationError) -> Self {
        CoreError::KeyDerivationFailed
    }
}

impl From<crate::registry::RegistryError> for CoreError {
    fn from(_: crate::registry::RegistryError) -> Self {
        CoreError::DecryptionFailed
    }
}

impl From<crate::ipns::RecordError> for CoreError {
    fn from(_: crate::ipns::RecordError) -> Self {
        CoreError::SigningFailed
    }
}
