//! Publish coordinator: per-Name single-writer, monotonic-sequence
//! publishing, with batch support and per-entry failure isolation.
//!
//! Grounded on the teacher's `sync::SyncDaemon` (sequence-number comparison
//! instead of CID comparison to detect remote change) and `sync::queue`
//! (FIFO processing with per-item failure handling, generalized here to
//! per-entry isolation within one batch rather than retry-on-next-tick).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use ed25519_dalek::SigningKey;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::CoreError;
use crate::ipns::{create_record, marshal_record, validity_from_now, Name, DEFAULT_VALIDITY};
use crate::transport::{NameRelay, TransportError};

/// What kind of object a publish entry points at. Carried through so a
/// caller's batch results can be attributed back to folder vs. file work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Folder,
    File,
}

/// One unit of work submitted to [`PublishCoordinator::publish_batch`].
pub struct PublishEntry<'a> {
    pub name: Name,
    pub signing_key: &'a SigningKey,
    pub cid: String,
    pub kind: PublishKind,
}

/// Outcome of publishing a single entry, successful or not.
pub struct PublishOutcome {
    pub name: String,
    pub kind: PublishKind,
    pub result: Result<u64, CoreError>,
}

impl From<TransportError> for CoreError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotFound => CoreError::NameNotFound,
            TransportError::QuotaExceeded => CoreError::QuotaExceeded,
            TransportError::BadGateway(msg) => CoreError::BadGateway(msg),
        }
    }
}

/// Per-Name sequence cache plus serialization lock. Lives for the life of
/// the coordinator; the sequence cache only ever grows (spec section 5:
/// "sequence cache ... must only grow").
type NameLock = Arc<AsyncMutex<Option<u64>>>;

pub struct PublishCoordinator<R: NameRelay> {
    relay: Arc<R>,
    locks: StdMutex<HashMap<String, NameLock>>,
}

impl<R: NameRelay> PublishCoordinator<R> {
    pub fn new(relay: Arc<R>) -> Self {
        Self {
            relay,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, name: &Name) -> NameLock {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(name.as_str().to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    /// Publish one record for `name`, computing the next sequence under
    /// that Name's lock. On relay failure the cache is left untouched so a
    /// retry reuses the same intended sequence.
    pub async fn publish_one(
        &self,
        name: &Name,
        signing_key: &SigningKey,
        cid: &str,
    ) -> Result<u64, CoreError> {
        let lock = self.lock_for(name);
        let mut cached = lock.lock().await;

        let remote_seq = match self.relay.resolve(name).await {
            Ok(resolved) => Some(resolved.sequence),
            Err(_) => None,
        };

        let seq = match (remote_seq, *cached) {
            (Some(remote), Some(local)) => remote.max(local) + 1,
            (Some(remote), None) => remote + 1,
            (None, Some(local)) => local + 1,
            (None, None) => return Err(CoreError::SequenceUnknown),
        };

        let validity = validity_from_now(DEFAULT_VALIDITY);
        let record = create_record(signing_key, cid, seq, &validity)?;
        let bytes = marshal_record(&record);

        self.relay.publish(name, bytes, seq).await?;
        *cached = Some(seq);
        Ok(seq)
    }

    /// Publish up to `max_batch` heterogeneous entries. The relay may
    /// partially succeed; each entry's lock is released independently of
    /// the others, and a failing entry's cache is left unchanged.
    pub async fn publish_batch(
        &self,
        entries: Vec<PublishEntry<'_>>,
        max_batch: usize,
    ) -> Result<Vec<PublishOutcome>, CoreError> {
        if entries.len() > max_batch {
            return Err(CoreError::QuotaExceeded);
        }

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = self
                .publish_one(&entry.name, entry.signing_key, &entry.cid)
                .await;
            outcomes.push(PublishOutcome {
                name: entry.name.as_str().to_string(),
                kind: entry.kind,
                result,
            });
        }
        Ok(outcomes)
    }

    /// Cached sequence for `name`, if this process has published to it
    /// before (or resolved it at least once via [`publish_one`]).
    pub async fn cached_sequence(&self, name: &Name) -> Option<u64> {
        let lock = self.lock_for(name);
        *lock.lock().await
    }
}
