//! `Name` derivation: a stable public identifier derived from an Ed25519
//! public key, encoded as a multihash-prefixed identity-hash CID.
//!
//! Generalizes the teacher's `crypto::ipns::derive_ipns_name` (base36 only)
//! to support both accepted display encodings the spec calls out: base36
//! (`k51qzi5uqu5...`) and base32 (`bafzaa...`). Both encode the exact same
//! CIDv1 bytes; only the multibase prefix and digit alphabet differ.
//! `Name` is a bijection with the 32-byte Ed25519 public key given a fixed
//! encoding, so `derive_name` is deliberately a pure function of its input.

use thiserror::Error;

/// libp2p-key codec, varint-encoded as a single byte (0x72 < 0x80).
const LIBP2P_KEY_CODEC: u64 = 0x72;

#[derive(Debug, Error)]
pub enum NameError {
    #[error("invalid public key length")]
    InvalidPublicKeyLength,
    #[error("malformed name encoding")]
    MalformedEncoding,
}

/// A stable public identifier for a mutable pointer (an "IPNS name").
///
/// Displayed in its canonical base36 form; [`Name::to_base32`] produces the
/// alternate `bafzaa...` display encoding of the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Raw CIDv1 bytes: varint(1) || varint(0x72) || identity-multihash.
    cid_bytes: Vec<u8>,
    /// Canonical base36 display form (`k51...`), cached since every caller
    /// ends up needing it as a map key or wire value.
    base36: String,
}

impl Name {
    pub fn as_str(&self) -> &str {
        &self.base36
    }

    pub fn to_base32(&self) -> String {
        format!("b{}", encode_base32(&self.cid_bytes))
    }

    /// Parse a Name from either accepted display encoding.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        if let Some(rest) = s.strip_prefix('k') {
            let cid_bytes = decode_base36(rest).ok_or(NameError::MalformedEncoding)?;
            Ok(Self {
                base36: s.to_string(),
                cid_bytes,
            })
        } else if let Some(rest) = s.strip_prefix('b') {
            let cid_bytes = decode_base32(rest).ok_or(NameError::MalformedEncoding)?;
            let base36 = format!("k{}", encode_base36(&cid_bytes));
            Ok(Self { base36, cid_bytes })
        } else {
            Err(NameError::MalformedEncoding)
        }
    }

    /// Extract the 32-byte Ed25519 public key this Name was derived from,
    /// by unwrapping the identity multihash and the libp2p PublicKey
    /// protobuf it contains.
    pub fn to_public_key(&self) -> Result<[u8; 32], NameError> {
        let mut pos = 0usize;
        let (version, n) = read_varint(&self.cid_bytes, pos).ok_or(NameError::MalformedEncoding)?;
        pos += n;
        if version != 1 {
            return Err(NameError::MalformedEncoding);
        }
        let (codec, n) = read_varint(&self.cid_bytes, pos).ok_or(NameError::MalformedEncoding)?;
        pos += n;
        if codec != LIBP2P_KEY_CODEC {
            return Err(NameError::MalformedEncoding);
        }
        // Identity multihash: code(varint) || length(varint) || data
        let (code, n) = read_varint(&self.cid_bytes, pos).ok_or(NameError::MalformedEncoding)?;
        pos += n;
        if code != 0 {
            return Err(NameError::MalformedEncoding);
        }
        let (len, n) = read_varint(&self.cid_bytes, pos).ok_or(NameError::MalformedEncoding)?;
        pos += n;
        let data = self
            .cid_bytes
            .get(pos..pos + len as usize)
            .ok_or(NameError::MalformedEncoding)?;
        // libp2p PublicKey protobuf: 0x08 0x01 0x12 0x20 || raw[32]
        if data.len() != 36 || data[..4] != [0x08, 0x01, 0x12, 0x20] {
            return Err(NameError::MalformedEncoding);
        }
        let mut pub_key = [0u8; 32];
        pub_key.copy_from_slice(&data[4..]);
        Ok(pub_key)
    }
}

/// Wrap a raw Ed25519 public key in the libp2p `PublicKey` protobuf
/// envelope: `message PublicKey { KeyType Type = 1; bytes Data = 2; }`
/// with `KeyType.Ed25519 = 1`.
pub fn encode_libp2p_public_key(ed25519_public_key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + ed25519_public_key.len());
    buf.push(0x08);
    buf.push(0x01);
    buf.push(0x12);
    buf.push(ed25519_public_key.len() as u8);
    buf.extend_from_slice(ed25519_public_key);
    buf
}

/// Derive the Name (CIDv1, identity-hash multihash over the libp2p-wrapped
/// Ed25519 public key) from a 32-byte Ed25519 public key.
pub fn derive_name(ed25519_public_key: &[u8; 32]) -> Result<Name, NameError> {
    let libp2p_pub_key = encode_libp2p_public_key(ed25519_public_key);

    let mut identity_multihash = Vec::new();
    identity_multihash.push(0x00);
    write_varint(&mut identity_multihash, libp2p_pub_key.len() as u64);
    identity_multihash.extend_from_slice(&libp2p_pub_key);

    let mut cid_bytes = Vec::new();
    write_varint(&mut cid_bytes, 1);
    write_varint(&mut cid_bytes, LIBP2P_KEY_CODEC);
    cid_bytes.extend_from_slice(&identity_multihash);

    let base36 = format!("k{}", encode_base36(&cid_bytes));
    Ok(Name { cid_bytes, base36 })
}

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn read_varint(buf: &[u8], start: usize) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut i = start;
    loop {
        let byte = *buf.get(i)?;
        if shift >= 64 {
            return None;
        }
        value |= ((byte & 0x7f) as u64) << shift;
        i += 1;
        if byte & 0x80 == 0 {
            return Some((value, i - start));
        }
        shift += 7;
        if shift > 63 {
            return None;
        }
    }
}

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn encode_base36(data: &[u8]) -> String {
    base_encode(data, BASE36_ALPHABET)
}

fn decode_base36(s: &str) -> Option<Vec<u8>> {
    base_decode(s, BASE36_ALPHABET)
}

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

fn encode_base32(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let mut bits = 0u32;
    let mut bit_count = 0u32;
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    for &byte in data {
        bits = (bits << 8) | byte as u32;
        bit_count += 8;
        while bit_count >= 5 {
            bit_count -= 5;
            let idx = (bits >> bit_count) & 0x1f;
            out.push(BASE32_ALPHABET[idx as usize] as char);
        }
    }
    if bit_count > 0 {
        let idx = (bits << (5 - bit_count)) & 0x1f;
        out.push(BASE32_ALPHABET[idx as usize] as char);
    }
    out
}

fn decode_base32(s: &str) -> Option<Vec<u8>> {
    let mut bits = 0u32;
    let mut bit_count = 0u32;
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    for c in s.chars() {
        let idx = BASE32_ALPHABET.iter().position(|&a| a as char == c)?;
        bits = (bits << 5) | idx as u32;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push(((bits >> bit_count) & 0xff) as u8);
        }
    }
    Some(out)
}

/// Big-integer-by-repeated-division encoder shared by base36 (leading
/// zero bytes become leading `'0'` digits in any base whose alphabet's
/// first symbol is the zero digit).
fn base_encode(data: &[u8], alphabet: &[u8; 36]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let base = alphabet.len() as u32;
    let leading_zeros = data.iter().take_while(|&&b| b == 0).count();

    let mut num = data.to_vec();
    let mut result = Vec::new();
    while !num.is_empty() {
        let mut remainder: u32 = 0;
        let mut quotient = Vec::new();
        for &byte in &num {
            let acc = (remainder << 8) | (byte as u32);
            let digit = acc / base;
            remainder = acc % base;
            if !quotient.is_empty() || digit > 0 {
                quotient.push(digit as u8);
            }
        }
        result.push(alphabet[remainder as usize]);
        num = quotient;
    }
    for _ in 0..leading_zeros {
        result.push(alphabet[0]);
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

fn base_decode(s: &str, alphabet: &[u8; 36]) -> Option<Vec<u8>> {
    if s.is_empty() {
        return Some(Vec::new());
    }
    let base = alphabet.len() as u32;
    let leading_zeros = s.chars().take_while(|&c| c == alphabet[0] as char).count();

    let mut num: Vec<u8> = s
        .chars()
        .map(|c| alphabet.iter().position(|&a| a as char == c).map(|p| p as u8))
        .collect::<Option<Vec<u8>>>()?;

    let mut result = Vec::new();
    while !num.is_empty() {
        let mut remainder: u32 = 0;
        let mut quotient = Vec::new();
        for &digit in &num {
            let acc = remainder * base + digit as u32;
            let byte = acc / 256;
            remainder = acc % 256;
            if !quotient.is_empty() || byte > 0 {
                quotient.push(byte as u8);
            }
        }
        result.push(remainder as u8);
        num = quotient;
    }
    for _ in 0..leading_zeros {
        result.push(0);
    }
    result.reverse();
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_name_is_total_and_deterministic() {
        let pub_key = [42u8; 32];
        let a = derive_name(&pub_key).unwrap();
        let b = derive_name(&pub_key).unwrap();
        assert_eq!(a.as_str(), b.as_str());
        assert!(a.as_str().starts_with('k'));
    }

    #[test]
    fn base32_form_round_trips_to_same_public_key() {
        let pub_key = [7u8; 32];
        let name = derive_name(&pub_key).unwrap();
        let base32 = name.to_base32();
        assert!(base32.starts_with('b'));

        let parsed = Name::parse(&base32).unwrap();
        assert_eq!(parsed.to_public_key().unwrap(), pub_key);
        assert_eq!(parsed.as_str(), name.as_str());
    }

    #[test]
    fn base36_form_round_trips_to_same_public_key() {
        let pub_key = [99u8; 32];
        let name = derive_name(&pub_key).unwrap();
        let parsed = Name::parse(name.as_str()).unwrap();
        assert_eq!(parsed.to_public_key().unwrap(), pub_key);
    }

    #[test]
    fn different_keys_yield_different_names() {
        let a = derive_name(&[1u8; 32]).unwrap();
        let b = derive_name(&[2u8; 32]).unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }
}
