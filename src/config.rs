//! Environment selector binding into key derivation and TEE routing.
//!
//! A single `environment` selector, as spec'd, threads into the HKDF `info`
//! string built by [`crate::keys`] and (for a caller that wires in a real
//! [`crate::tee::TeeClient`]) into which TEE endpoint gets used. Deliberately
//! mixing environments yields disjoint `Name` spaces so test traffic can
//! never collide with production sequence counters.

use std::fmt;

/// Deployment environment, folded into every derived key's `info` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Local,
    Ci,
    Staging,
    Production,
}

impl Environment {
    /// The lowercase tag used inside HKDF `info` strings (`"env:<tag>:..."`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Ci => "ci",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level runtime configuration a caller constructs once at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub environment: Environment,
    /// Maximum folder tree depth (spec invariant: <= 20).
    pub max_folder_depth: u32,
    /// Batch publish size cap (spec: <= 200 entries per call).
    pub max_batch_publish: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            max_folder_depth: 20,
            max_batch_publish: 200,
        }
    }
}
