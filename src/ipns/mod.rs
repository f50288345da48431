//! IPNS name-record engine: stable `Name` derivation plus V2 record
//! build/sign/marshal/parse/verify.

pub mod name;
pub mod record;

pub use name::{derive_name, Name, NameError};
pub use record::{
    create_record, is_monotonic, marshal_record, parse_record, pub_key_matches, validity_from_now,
    verify_record, NameRecord, PartialRecord, RecordError, Verification, DEFAULT_VALIDITY,
};
