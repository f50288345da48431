//! External collaborator interfaces: the object store, the name-routing
//! relay, and the share upload surface. All three are out of scope (spec
//! section 1 calls them external collaborators); this module only defines
//! the trait seam and a trio of in-memory fakes used by this crate's own
//! tests, in the style of the teacher's `sync::queue::UploadHandler` mock
//! pattern.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::ipns::Name;

#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("not found")]
    NotFound,
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("bad gateway: {0}")]
    BadGateway(String),
}

/// Content-addressed object store: opaque blob put/get. Mirrors the
/// teacher's `api::ipfs` REST surface, abstracted behind a trait so this
/// crate never depends on a transport library directly.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, TransportError>;
    async fn get(&self, cid: &str) -> Result<Vec<u8>, TransportError>;
}

/// Result of resolving a Name: its current published record plus whatever
/// the relay knows about monotonicity.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub record_bytes: Vec<u8>,
    pub sequence: u64,
}

/// Outcome of a single publish within a batch call.
#[derive(Debug, Clone)]
pub struct PublishAck {
    pub name: String,
    pub sequence: u64,
}

/// The on-network name-routing layer: resolve and publish V2 name records.
/// Mirrors the teacher's `api::ipns` REST surface.
#[async_trait]
pub trait NameRelay: Send + Sync {
    async fn resolve(&self, name: &Name) -> Result<ResolveResult, TransportError>;
    async fn publish(
        &self,
        name: &Name,
        record_bytes: Vec<u8>,
        sequence: u64,
    ) -> Result<PublishAck, TransportError>;
}

/// Upload surface for share records and rewrapped share keys.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn put_share(&self, share_id: &str, sealed_bytes: Vec<u8>) -> Result<(), TransportError>;
    async fn get_share(&self, share_id: &str) -> Result<Vec<u8>, TransportError>;
}

/// In-memory `ObjectStore` fake: content-addresses by a simple counter
/// rather than a real hash, since CID correctness is the object store's
/// concern, not this crate's.
#[derive(Default)]
pub struct FakeObjectStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next_id: Mutex<u64>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, TransportError> {
        let mut next_id = self.next_id.lock().unwrap();
        let cid = format!("bafyfake{}", *next_id);
        *next_id += 1;
        self.blobs.lock().unwrap().insert(cid.clone(), bytes);
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, TransportError> {
        self.blobs
            .lock()
            .unwrap()
            .get(cid)
            .cloned()
            .ok_or(TransportError::NotFound)
    }
}

/// In-memory `NameRelay` fake: last-write-wins per Name, tracking sequence.
#[derive(Default)]
pub struct FakeNameRelay {
    records: Mutex<HashMap<String, (Vec<u8>, u64)>>,
}

impl FakeNameRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NameRelay for FakeNameRelay {
    async fn resolve(&self, name: &Name) -> Result<ResolveResult, TransportError> {
        self.records
            .lock()
            .unwrap()
            .get(name.as_str())
            .map(|(bytes, seq)| ResolveResult {
                record_bytes: bytes.clone(),
                sequence: *seq,
            })
            .ok_or(TransportError::NotFound)
    }

    async fn publish(
        &self,
        name: &Name,
        record_bytes: Vec<u8>,
        sequence: u64,
    ) -> Result<PublishAck, TransportError> {
        self.records
            .lock()
            .unwrap()
            .insert(name.as_str().to_string(), (record_bytes, sequence));
        Ok(PublishAck {
            name: name.as_str().to_string(),
            sequence,
        })
    }
}

/// In-memory `ShareStore` fake.
#[derive(Default)]
pub struct FakeShareStore {
    shares: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareStore for FakeShareStore {
    async fn put_share(&self, share_id: &str, sealed_bytes: Vec<u8>) -> Result<(), TransportError> {
        self.shares
            .lock()
            .unwrap()
            .insert(share_id.to_string(), sealed_bytes);
        Ok(())
    }

    async fn get_share(&self, share_id: &str) -> Result<Vec<u8>, TransportError> {
        self.shares
            .lock()
            .unwrap()
            .get(share_id)
            .cloned()
            .ok_or(TransportError::NotFound)
    }
}
