//! Device registry sync: a multi-device registry ECIES-sealed under the
//! owner's own public key, published to a dedicated HKDF-derived Name,
//! with heartbeat debounce.
//!
//! Generalizes the teacher's `registry::{mod,types}` (device registration
//! against a fixed macOS platform and Tauri `ApiClient`) into a transport-
//! and-platform-agnostic sync type, adding the 5-minute heartbeat debounce
//! the teacher's version didn't need (desktop only ever registered once at
//! login).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::ecies::{unwrap_key, wrap_key};

const HEARTBEAT_DEBOUNCE_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry encryption failed")]
    EncryptionFailed,
    #[error("registry decryption failed")]
    DecryptionFailed,
    #[error("registry serialization failed")]
    SerializationFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAuthStatus {
    Pending,
    Authorized,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Web,
    Macos,
    Linux,
    Windows,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    pub device_id: String,
    pub public_key: String,
    pub name: String,
    pub platform: DevicePlatform,
    pub app_version: String,
    pub device_model: String,
    pub ip_hash: String,
    pub status: DeviceAuthStatus,
    pub created_at: u64,
    pub last_seen_at: u64,
    pub revoked_at: Option<u64>,
    pub revoked_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistry {
    pub version: String,
    pub sequence_number: u64,
    pub devices: Vec<DeviceEntry>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            version: "v1".to_string(),
            sequence_number: 0,
            devices: Vec::new(),
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Seal a registry under the owner's own ECIES public key (the owner plays
/// both author and reader).
pub fn seal_registry(registry: &DeviceRegistry, owner_pub: &[u8]) -> Result<Vec<u8>, RegistryError> {
    let json = serde_json::to_vec(registry).map_err(|_| RegistryError::SerializationFailed)?;
    wrap_key(&json, owner_pub).map_err(|_| RegistryError::EncryptionFailed)
}

pub fn unseal_registry(
    sealed: &[u8],
    owner_priv: &[u8],
) -> Result<DeviceRegistry, RegistryError> {
    let json = unwrap_key(sealed, owner_priv).map_err(|_| RegistryError::DecryptionFailed)?;
    serde_json::from_slice(&json).map_err(|_| RegistryError::DecryptionFailed)
}

/// True if applying `entry` to `registry` only bumps an existing device's
/// `lastSeenAt`/`appVersion` (a heartbeat) rather than adding or changing
/// anything else about it. Mutates `registry` in place either way.
pub fn upsert_device(registry: &mut DeviceRegistry, entry: DeviceEntry) -> bool {
    if let Some(existing) = registry
        .devices
        .iter_mut()
        .find(|d| d.device_id == entry.device_id)
    {
        let heartbeat_only = existing.name == entry.name
            && existing.platform == entry.platform
            && existing.status == entry.status
            && existing.public_key == entry.public_key;
        existing.last_seen_at = entry.last_seen_at;
        existing.app_version = entry.app_version;
        heartbeat_only
    } else {
        registry.devices.push(entry);
        false
    }
}

/// Tracks the debounce window for registry publishes: a heartbeat-only
/// mutation within 5 minutes of the last publish is coalesced.
pub struct PublishDebounce {
    last_published_at_ms: Option<u64>,
}

impl PublishDebounce {
    pub fn new() -> Self {
        Self {
            last_published_at_ms: None,
        }
    }

    /// Whether a mutation at `now_ms` should actually be published.
    /// Non-heartbeat mutations always publish; heartbeat-only mutations
    /// are coalesced unless the debounce window has elapsed.
    pub fn should_publish(&self, heartbeat_only: bool, now_ms: u64) -> bool {
        if !heartbeat_only {
            return true;
        }
        match self.last_published_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= HEARTBEAT_DEBOUNCE_MS,
        }
    }

    /// Record that a publish actually happened at `now_ms`.
    pub fn record_publish(&mut self, now_ms: u64) {
        self.last_published_at_ms = Some(now_ms);
    }
}

impl Default for PublishDebounce {
    fn default() -> Self {
        Self::new()
    }
}
