//! CipherBox primitive crypto layer.
//!
//! Implements the leaf-level operations the rest of the crate builds on:
//! AES-256-GCM/CTR, ECIES over secp256k1, Ed25519 sign/verify, HKDF-SHA256,
//! and small helpers (CSPRNG, constant-time compare, hex/base64 chunking).
//! Nothing above this layer touches a cipher or a curve directly.

pub mod aes;
pub mod aes_ctr;
pub mod ecies;
pub mod ed25519;
pub mod hkdf;
pub mod utils;


pub use aes::{decrypt_aes_gcm, encrypt_aes_gcm, seal_aes_gcm, unseal_aes_gcm};
pub use aes_ctr::{decrypt_aes_ctr, decrypt_aes_ctr_range, encrypt_aes_ctr};
pub use ecies::{unwrap_key, wrap_key};
pub use ed25519::{generate_ed25519_keypair, get_public_key, sign_ed25519, verify_ed25519};
pub use hkdf::hkdf_sha256;
pub use utils::{
    bytes_to_hex, clear_bytes, constant_time_eq, generate_file_key, generate_iv,
    generate_random_bytes, hex_to_bytes,
};
