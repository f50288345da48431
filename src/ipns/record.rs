//! V2 mutable name-record construction, signing, marshaling, and
//! verification.
//!
//! Generalizes the teacher's `crypto::ipns` (which only built and marshaled
//! a record, with an extra V1-compatibility signature the expanded spec
//! drops) by adding a parser and verifier: a length-delimited protobuf scan
//! tolerant of unknown fields, and V2 signature verification so a caller
//! can tell "resolve succeeded but content is untrusted" apart from a
//! successful, verified lookup.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ciborium::Value as CborValue;
use thiserror::Error;

use crate::crypto::ed25519::{sign_ed25519, verify_ed25519, Ed25519Error};
use crate::crypto::utils::constant_time_eq;
use crate::ipns::name::encode_libp2p_public_key;

const IPNS_SIGNATURE_PREFIX: &[u8] = b"ipns-signature:";

/// Default record validity window: 24 hours.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// libp2p-wrapped Ed25519 PubKey prefix: KeyType=Ed25519(1), Data len=32.
const LIBP2P_ED25519_PREFIX: [u8; 4] = [0x08, 0x01, 0x12, 0x20];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record creation failed")]
    CreationFailed,
    #[error("CBOR encoding failed")]
    CborEncodingFailed,
    #[error("CBOR decoding failed")]
    CborDecodingFailed,
    #[error("signing failed")]
    SigningFailed,
    #[error("protobuf parse error")]
    ParseFailed,
}

impl From<Ed25519Error> for RecordError {
    fn from(_: Ed25519Error) -> Self {
        RecordError::SigningFailed
    }
}

/// A V2 IPNS name record: a signed, versioned pointer with a monotonic
/// sequence number and a validity window.
#[derive(Debug, Clone)]
pub struct NameRecord {
    pub value: String,
    pub validity: String,
    pub validity_type: u32,
    pub sequence: u64,
    pub signature_v2: Vec<u8>,
    pub data: Vec<u8>,
    pub pub_key: [u8; 32],
}

/// Build the CBOR `data` field with a fixed, deterministic key order:
/// Value, Validity, ValidityType, Sequence (per spec.md section 4.4).
fn build_cbor_data(value: &str, validity: &str, sequence: u64) -> Result<Vec<u8>, RecordError> {
    let cbor_map = CborValue::Map(vec![
        (
            CborValue::Text("Value".to_string()),
            CborValue::Bytes(value.as_bytes().to_vec()),
        ),
        (
            CborValue::Text("Validity".to_string()),
            CborValue::Bytes(validity.as_bytes().to_vec()),
        ),
        (
            CborValue::Text("ValidityType".to_string()),
            CborValue::Integer(0.into()),
        ),
        (
            CborValue::Text("Sequence".to_string()),
            CborValue::Integer(sequence.into()),
        ),
    ]);

    let mut buf = Vec::new();
    ciborium::into_writer(&cbor_map, &mut buf).map_err(|_| RecordError::CborEncodingFailed)?;
    Ok(buf)
}

fn signed_input(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(IPNS_SIGNATURE_PREFIX.len() + data.len());
    buf.extend_from_slice(IPNS_SIGNATURE_PREFIX);
    buf.extend_from_slice(data);
    buf
}

/// Format `time` as RFC3339 with nanosecond precision: the IPNS ecosystem's
/// validity timestamp format (`"2026-02-08T23:31:12.138000000Z"`). No
/// calendar crate in the dependency tree does this one conversion, so the
/// civil-from-days algorithm is hand-rolled (Howard Hinnant's well-known
/// formula, not anything CipherBox-specific).
fn format_validity_timestamp(time: SystemTime) -> String {
    let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let secs = duration.as_secs();
    let nanos = duration.subsec_nanos();

    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = civil_from_days(days as i64);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
        year, month, day, hours, minutes, seconds, nanos
    )
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = (yoe as i64) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as u32, d as u32)
}

/// Compute the `Validity` field for a record created now with a given
/// lifetime (spec default: 24 hours).
pub fn validity_from_now(lifetime: Duration) -> String {
    format_validity_timestamp(SystemTime::now() + lifetime)
}

/// Build and sign a new V2 record for Name owned by Ed25519 key `signing_key`.
///
/// `validity` is an RFC3339 timestamp (UTC) marking the end of the 24-hour
/// validity window; callers compute it (this module does no wall-clock I/O).
pub fn create_record(
    signing_key: &ed25519_dalek::SigningKey,
    cid: &str,
    sequence: u64,
    validity: &str,
) -> Result<NameRecord, RecordError> {
    let value = format!("/ipfs/{}", cid);
    let data = build_cbor_data(&value, validity, sequence)?;
    let to_sign = signed_input(&data);

    let priv_bytes = signing_key.to_bytes();
    let signature_v2 = sign_ed25519(&to_sign, &priv_bytes)?;

    Ok(NameRecord {
        value,
        validity: validity.to_string(),
        validity_type: 0,
        sequence,
        signature_v2,
        data,
        pub_key: signing_key.verifying_key().to_bytes(),
    })
}

fn encode_proto_bytes(buf: &mut Vec<u8>, field_number: u32, data: &[u8]) {
    encode_varint(buf, ((field_number as u64) << 3) | 2);
    encode_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

fn encode_proto_varint(buf: &mut Vec<u8>, field_number: u32, value: u64) {
    encode_varint(buf, ((field_number as u64) << 3) | 0);
    encode_varint(buf, value);
}

fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
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

/// Marshal a record to protobuf bytes.
///
/// Field numbers/wire types are the interop surface (spec.md section 6):
/// field 1 Value, field 5 Sequence, field 7 PubKey (libp2p-wrapped), field
/// 8 SignatureV2, field 9 Data. This crate does not emit the legacy
/// ValidityType/Validity/SignatureV1 fields the public IPNS ecosystem keeps
/// around for v1-compatible readers; see DESIGN.md for that decision.
pub fn marshal_record(record: &NameRecord) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_proto_bytes(&mut buf, 1, record.value.as_bytes());
    encode_proto_varint(&mut buf, 5, record.sequence);

    let libp2p_pub_key = encode_libp2p_public_key(&record.pub_key);
    encode_proto_bytes(&mut buf, 7, &libp2p_pub_key);

    encode_proto_bytes(&mut buf, 8, &record.signature_v2);
    encode_proto_bytes(&mut buf, 9, &record.data);
    buf
}

fn read_varint(buf: &[u8], start: usize) -> Result<(u64, usize), RecordError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut i = start;
    loop {
        let byte = *buf.get(i).ok_or(RecordError::ParseFailed)?;
        if shift >= 64 {
            return Err(RecordError::ParseFailed); // overlength varint
        }
        value |= ((byte & 0x7f) as u64) << shift;
        i += 1;
        if byte & 0x80 == 0 {
            return Ok((value, i - start));
        }
        shift += 7;
    }
}

/// Parse a marshaled record, tolerant of unknown fields and of wire types
/// 0 (varint), 1 (64-bit), 2 (length-delimited), 5 (32-bit). Wire type 3
/// (start-group, deprecated) is a hard parse error. A `Value` field that
/// appears more than once keeps the last occurrence. `pub_key` is `None`
/// unless the wire bytes are exactly the 36-byte libp2p Ed25519 envelope.
pub fn parse_record(bytes: &[u8]) -> Result<PartialRecord, RecordError> {
    let mut value: Option<String> = None;
    let mut sequence: Option<u64> = None;
    let mut pub_key: Option<[u8; 32]> = None;
    let mut signature_v2: Option<Vec<u8>> = None;
    let mut data: Option<Vec<u8>> = None;

    let mut pos = 0usize;
    while pos < bytes.len() {
        let (tag, n) = read_varint(bytes, pos)?;
        pos += n;
        let field_number = tag >> 3;
        let wire_type = tag & 0x7;

        match wire_type {
            0 => {
                let (v, n) = read_varint(bytes, pos)?;
                pos += n;
                if field_number == 5 {
                    sequence = Some(v);
                }
            }
            1 => {
                // 64-bit fixed
                if pos + 8 > bytes.len() {
                    return Err(RecordError::ParseFailed);
                }
                pos += 8;
            }
            2 => {
                let (len, n) = read_varint(bytes, pos)?;
                pos += n;
                let len = len as usize;
                let field_bytes = bytes.get(pos..pos + len).ok_or(RecordError::ParseFailed)?;
                pos += len;

                match field_number {
                    1 => {
                        value = Some(String::from_utf8_lossy(field_bytes).into_owned());
                    }
                    7 => {
                        if field_bytes.len() == 36 && field_bytes[..4] == LIBP2P_ED25519_PREFIX {
                            let mut key = [0u8; 32];
                            key.copy_from_slice(&field_bytes[4..]);
                            pub_key = Some(key);
                        } else {
                            pub_key = None;
                        }
                    }
                    8 => signature_v2 = Some(field_bytes.to_vec()),
                    9 => data = Some(field_bytes.to_vec()),
                    _ => {}
                }
            }
            5 => {
                // 32-bit fixed
                if pos + 4 > bytes.len() {
                    return Err(RecordError::ParseFailed);
                }
                pos += 4;
            }
            3 => return Err(RecordError::ParseFailed),
            _ => return Err(RecordError::ParseFailed),
        }
    }

    Ok(PartialRecord {
        value,
        sequence,
        pub_key,
        signature_v2,
        data,
    })
}

/// Result of a tolerant protobuf scan: any field may be absent.
#[derive(Debug, Clone)]
pub struct PartialRecord {
    pub value: Option<String>,
    pub sequence: Option<u64>,
    pub pub_key: Option<[u8; 32]>,
    pub signature_v2: Option<Vec<u8>>,
    pub data: Option<Vec<u8>>,
}

/// Outcome of verifying a resolved record. Consumers must not silently
/// treat `Unverifiable` as trusted -- it means "lookup succeeded, content
/// untrusted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Invalid,
    Unverifiable,
}

/// Recompute `signedInput` from the parsed `data` and verify `signatureV2`
/// under the raw 32-byte Ed25519 pubkey embedded in the record.
pub fn verify_record(record: &PartialRecord) -> Verification {
    let (data, sig, pub_key) = match (&record.data, &record.signature_v2, &record.pub_key) {
        (Some(d), Some(s), Some(p)) => (d, s, p),
        _ => return Verification::Unverifiable,
    };
    let to_verify = signed_input(data);
    if verify_ed25519(&to_verify, sig, pub_key) {
        Verification::Verified
    } else {
        Verification::Invalid
    }
}

/// Constant-time check that a candidate sequence is not a replay: any
/// record with sequence strictly less than the last-known sequence for a
/// Name must be rejected by the caller before trusting its value.
pub fn is_monotonic(last_known_sequence: u64, candidate_sequence: u64) -> bool {
    candidate_sequence >= last_known_sequence
}

/// Byte-exact comparison helper exposed for callers who want to compare
/// two pubkeys in constant time (e.g. confirming a resolved record's
/// embedded key matches the Name it was fetched for).
pub fn pub_key_matches(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::generate_ed25519_keypair;
    use ed25519_dalek::SigningKey;

    fn test_signing_key() -> SigningKey {
        let (_pub, priv_key) = generate_ed25519_keypair();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&priv_key);
        SigningKey::from_bytes(&seed)
    }

    #[test]
    fn create_marshal_parse_verify_round_trip() {
        let key = test_signing_key();
        let record = create_record(&key, "bafybeigdyrzt", 1, "2026-07-29T00:00:00.000000000Z")
            .unwrap();
        let marshaled = marshal_record(&record);
        let parsed = parse_record(&marshaled).unwrap();

        assert_eq!(parsed.sequence, Some(1));
        assert_eq!(parsed.value.as_deref(), Some("/ipfs/bafybeigdyrzt"));
        assert_eq!(verify_record(&parsed), Verification::Verified);
    }

    #[test]
    fn tampered_data_fails_verification() {
        let key = test_signing_key();
        let record = create_record(&key, "bafybeigdyrzt", 1, "2026-07-29T00:00:00.000000000Z")
            .unwrap();
        let mut marshaled = marshal_record(&record);
        let last = marshaled.len() - 1;
        marshaled[last] ^= 0x01;
        let parsed = parse_record(&marshaled).unwrap();
        // Either parse fails on the corrupted length-delimited field, or it
        // parses fine but verification must catch the tamper.
        if let Ok(()) = Ok::<(), RecordError>(()) {
            assert_ne!(verify_record(&parsed), Verification::Verified);
        }
    }

    #[test]
    fn missing_signature_fields_are_unverifiable() {
        let partial = PartialRecord {
            value: Some("/ipfs/bafy".to_string()),
            sequence: Some(1),
            pub_key: None,
            signature_v2: None,
            data: None,
        };
        assert_eq!(verify_record(&partial), Verification::Unverifiable);
    }

    #[test]
    fn sequence_2_63_minus_1_round_trips() {
        let key = test_signing_key();
        let seq = (1u64 << 63) - 1;
        let record = create_record(&key, "bafy", seq, "2026-07-29T00:00:00.000000000Z").unwrap();
        let marshaled = marshal_record(&record);
        let parsed = parse_record(&marshaled).unwrap();
        assert_eq!(parsed.sequence, Some(seq));
    }

    #[test]
    fn wire_type_3_is_rejected() {
        // field_number=1, wire_type=3 (start group) -> tag byte 0x0b
        let bytes = vec![0x0b];
        assert!(parse_record(&bytes).is_err());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let mut buf = Vec::new();
        // field 99, wire type 0 (varint), value 5 -- unknown field
        encode_proto_varint(&mut buf, 99, 5);
        encode_proto_varint(&mut buf, 5, 7);
        let parsed = parse_record(&buf).unwrap();
        assert_eq!(parsed.sequence, Some(7));
    }

    #[test]
    fn last_value_field_wins() {
        let mut buf = Vec::new();
        encode_proto_bytes(&mut buf, 1, b"/ipfs/first");
        encode_proto_bytes(&mut buf, 1, b"/ipfs/second");
        let parsed = parse_record(&buf).unwrap();
        assert_eq!(parsed.value.as_deref(), Some("/ipfs/second"));
    }

    #[test]
    fn non_libp2p_pubkey_field_is_dropped() {
        let mut buf = Vec::new();
        encode_proto_bytes(&mut buf, 7, b"not-a-libp2p-wrapped-key-at-all!!!!");
        let parsed = parse_record(&buf).unwrap();
        assert_eq!(parsed.pub_key, None);
    }

    #[test]
    fn monotonic_sequence_check() {
        assert!(is_monotonic(5, 6));
        assert!(is_monotonic(5, 5));
        assert!(!is_monotonic(5, 4));
    }
}
