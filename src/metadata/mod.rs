//! Metadata codec: versioned folder/file records and their encrypted
//! envelope form.

pub mod envelope;
pub mod file;
pub mod folder;

pub use envelope::{seal, unseal, Envelope, EnvelopeError};
pub use file::{decrypt_file_metadata, encrypt_file_metadata, EncryptionMode, FileMetadata, FileMetadataError};
pub use folder::{
    decrypt_folder_metadata, encrypt_folder_metadata, FolderChild, FolderMetadata, FolderPointer,
    FilePointer, MetadataError,
};
