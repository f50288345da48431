//! CipherBox client-side cryptographic core.
//!
//! Layered leaf-first: primitive crypto underlies key derivation, which
//! underlies the metadata codec, which underlies the name-record engine,
//! which underlies publish coordination; sharing, TEE enrollment, and
//! registry sync sit on top of all of it. See each module for its own
//! grounding notes.

pub mod config;
pub mod crypto;
pub mod error;
pub mod ipns;
pub mod keys;
pub mod metadata;
pub mod publish;
pub mod registry;
pub mod share;
pub mod tee;
pub mod transport;

pub use config::{CoreConfig, Environment};
pub use error::{CoreError, Result};
