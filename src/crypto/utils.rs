//! Utility functions for cryptographic operations.

use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroize;

use super::aes::{AES_IV_SIZE, AES_KEY_SIZE};

/// Base64/hex helpers below chunk at this size so encoding or decoding a
/// large file does not build one multi-megabyte string in a single call --
/// some FFI/runtime boundaries cap argument sizes well below that.
const CHUNK_SIZE: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum UtilError {
    #[error("Invalid hex string")]
    InvalidHex,
}

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Generate a random 32-byte AES key.
pub fn generate_file_key() -> [u8; AES_KEY_SIZE] {
    let mut key = [0u8; AES_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// Generate a random 12-byte IV.
pub fn generate_iv() -> [u8; AES_IV_SIZE] {
    let mut iv = [0u8; AES_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

/// Convert a hex string to bytes.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, UtilError> {
    hex::decode(hex).map_err(|_| UtilError::InvalidHex)
}

/// Convert bytes to a hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Convert bytes to a hex string, chunking the input so encoding a large
/// buffer never holds more than `CHUNK_SIZE` bytes of pending output in a
/// single `hex::encode` call.
pub fn bytes_to_hex_chunked(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for chunk in bytes.chunks(CHUNK_SIZE) {
        out.push_str(&hex::encode(chunk));
    }
    out
}

/// Base64-encode bytes, chunking the input at [`CHUNK_SIZE`] boundaries.
///
/// Each chunk is encoded independently, so chunk boundaries must align to a
/// multiple of 3 bytes to avoid inserting padding in the middle of the
/// output; `CHUNK_SIZE` is a multiple of 3.
pub fn base64_encode_chunked(bytes: &[u8]) -> String {
    use base64::Engine;
    debug_assert_eq!(CHUNK_SIZE % 3, 0);
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(CHUNK_SIZE) {
        out.push_str(&base64::engine::general_purpose::STANDARD.encode(chunk));
    }
    out
}

/// Compare two byte slices in constant time.
///
/// Returns `false` immediately on length mismatch (length is not secret in
/// any CipherBox comparison); the byte-by-byte comparison itself is
/// constant-time via `subtle`.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Zeroize sensitive data in a byte slice.
pub fn clear_bytes(buf: &mut [u8]) {
    buf.zeroize();
}
