//! Record store contract and an in-memory reference implementation.
//!
//! The engine observes the store; it never creates, mutates, or deletes
//! records. A freshly opened subscription delivers the current collection
//! as one initial `Added` batch, so subscribers need no separate
//! load-then-listen step.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::RawRecord;

/// A single record change notification
#[derive(Debug, Clone)]
pub enum RecordChange {
    Added(RawRecord),
    Modified(RawRecord),
    /// Carries the id of the deleted record
    Removed(String),
}

/// A batch of changes delivered together; the store may coalesce several
/// writes into one batch.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub changes: Vec<RecordChange>,
}

/// Abstract subscribable record collection
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether the underlying client is ready to serve. Polled on an
    /// interval during engine startup.
    async fn ready(&self) -> bool;

    /// Open a live subscription to the full collection.
    ///
    /// The current collection arrives as an initial `Added` batch on the
    /// returned channel. Dropping the receiver releases the subscription.
    async fn subscribe(&self) -> Result<broadcast::Receiver<ChangeBatch>, StoreError>;

    /// One-shot full fetch of the collection
    async fn fetch_all(&self) -> Result<Vec<RawRecord>, StoreError>;
}

/// In-memory record store for testing and local development.
///
/// Supports failure injection so lifecycle degradation paths can be
/// exercised without a real backend.
pub struct InMemoryRecordStore {
    records: DashMap<String, RawRecord>,
    changes_tx: broadcast::Sender<ChangeBatch>,
    ready: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_fetch: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(64);
        Self {
            records: DashMap::new(),
            changes_tx,
            ready: AtomicBool::new(true),
            fail_subscribe: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
        }
    }

    /// Insert a record with a store-assigned id, returning the id
    pub fn put_new(&self, mut record: RawRecord) -> String {
        let id = Uuid::new_v4().to_string();
        record.id = id.clone();
        self.put(record);
        id
    }

    /// Insert or replace a record, broadcasting the change
    pub fn put(&self, record: RawRecord) {
        let change = if self.records.contains_key(&record.id) {
            RecordChange::Modified(record.clone())
        } else {
            RecordChange::Added(record.clone())
        };
        self.records.insert(record.id.clone(), record);
        let _ = self.changes_tx.send(ChangeBatch {
            changes: vec![change],
        });
    }

    /// Delete a record, broadcasting the removal
    pub fn remove(&self, id: &str) {
        if self.records.remove(id).is_some() {
            let _ = self.changes_tx.send(ChangeBatch {
                changes: vec![RecordChange::Removed(id.to_string())],
            });
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::Relaxed);
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    async fn subscribe(&self) -> Result<broadcast::Receiver<ChangeBatch>, StoreError> {
        if self.fail_subscribe.load(Ordering::Relaxed) {
            return Err(StoreError::Subscription("injected failure".to_string()));
        }

        let rx = self.changes_tx.subscribe();
        // Deliver the current collection as the initial snapshot. Existing
        // subscribers see it as a redundant upsert batch.
        let initial: Vec<RecordChange> = self
            .records
            .iter()
            .map(|e| RecordChange::Added(e.value().clone()))
            .collect();
        let _ = self.changes_tx.send(ChangeBatch { changes: initial });

        Ok(rx)
    }

    async fn fetch_all(&self) -> Result<Vec<RawRecord>, StoreError> {
        if self.fail_fetch.load(Ordering::Relaxed) {
            return Err(StoreError::Fetch("injected failure".to_string()));
        }
        Ok(self.records.iter().map(|e| e.value().clone()).collect())
    }
}
