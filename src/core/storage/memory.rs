// src/core/storage/memory.rs

//! An in-memory key/value store with per-request staged writes.
//!
//! Writes made during a request are buffered under that request's id and only
//! become visible to other requests when the unit of work commits. Every key a
//! request reads is recorded with the version it saw; commit fails with
//! [`StoreError::Conflict`] if any of those keys changed in the meantime.

use crate::core::errors::StoreError;
use crate::core::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// A committed value and the version assigned when it was written.
#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    version: u64,
}

/// The transaction state of one request.
#[derive(Debug, Default)]
struct StagedWrites {
    /// Pending writes. A `None` value is a pending delete.
    writes: IndexMap<String, Option<Value>>,
    /// Committed version of every key read, `None` if it did not exist.
    read_versions: HashMap<String, Option<u64>>,
    /// False once the transaction has been committed or rolled back.
    open: bool,
}

#[derive(Debug, Default)]
struct StoreInner {
    committed: DashMap<String, StoredValue>,
    tx_states: DashMap<u64, StagedWrites>,
    next_version: AtomicU64,
    /// Serializes conflict checks with applying writes.
    commit_lock: Mutex<()>,
}

/// A cheaply cloneable handle to the shared store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a key as seen by `request_id`: its own staged writes first, then committed data.
    ///
    /// Inside an open transaction the committed version is recorded, so a
    /// concurrent commit to the same key makes this request's commit fail.
    pub fn get(&self, request_id: u64, key: &str) -> Option<Value> {
        let Some(mut tx_state) = self
            .inner
            .tx_states
            .get_mut(&request_id)
            .filter(|s| s.open)
        else {
            return self.get_committed(key);
        };
        if let Some(staged) = tx_state.writes.get(key) {
            return staged.clone();
        }
        let stored = self.inner.committed.get(key).map(|e| e.value().clone());
        tx_state
            .read_versions
            .entry(key.to_string())
            .or_insert(stored.as_ref().map(|s| s.version));
        stored.map(|s| s.value)
    }

    pub fn get_committed(&self, key: &str) -> Option<Value> {
        self.inner.committed.get(key).map(|e| e.value().value.clone())
    }

    /// Stages a write for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request has no open transaction.
    pub fn put(&self, request_id: u64, key: impl Into<String>, value: Value) -> Result<(), StoreError> {
        self.stage(request_id, key.into(), Some(value))
    }

    /// Stages a delete for `request_id`.
    pub fn delete(&self, request_id: u64, key: impl Into<String>) -> Result<(), StoreError> {
        self.stage(request_id, key.into(), None)
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.inner.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.committed.is_empty()
    }

    /// Number of requests currently holding staging state.
    pub fn active_transactions(&self) -> usize {
        self.inner.tx_states.len()
    }

    fn stage(&self, request_id: u64, key: String, value: Option<Value>) -> Result<(), StoreError> {
        let mut tx_state = self
            .inner
            .tx_states
            .get_mut(&request_id)
            .filter(|s| s.open)
            .ok_or(StoreError::NoActiveTransaction(request_id))?;
        tx_state.writes.insert(key, value);
        Ok(())
    }

    fn begin(&self, request_id: u64) -> Result<(), StoreError> {
        match self.inner.tx_states.entry(request_id) {
            Entry::Occupied(_) => Err(StoreError::TransactionAlreadyActive(request_id)),
            Entry::Vacant(slot) => {
                slot.insert(StagedWrites {
                    open: true,
                    ..StagedWrites::default()
                });
                debug!("Request {}: Started transaction.", request_id);
                Ok(())
            }
        }
    }

    async fn commit(&self, request_id: u64) -> Result<(), StoreError> {
        let _commit_guard = self.inner.commit_lock.lock().await;
        let mut tx_state = self
            .inner
            .tx_states
            .get_mut(&request_id)
            .filter(|s| s.open)
            .ok_or(StoreError::NoActiveTransaction(request_id))?;

        for (key, seen) in &tx_state.read_versions {
            let current = self.inner.committed.get(key).map(|e| e.value().version);
            if current != *seen {
                debug!(
                    "Request {}: Key '{}' changed from version {:?} to {:?}; aborting commit.",
                    request_id, key, seen, current
                );
                return Err(StoreError::Conflict {
                    request_id,
                    key: key.clone(),
                });
            }
        }

        let applied = tx_state.writes.len();
        for (key, value) in tx_state.writes.drain(..) {
            match value {
                Some(value) => {
                    let version = self.inner.next_version.fetch_add(1, Ordering::SeqCst) + 1;
                    self.inner
                        .committed
                        .insert(key, StoredValue { value, version });
                }
                None => {
                    self.inner.committed.remove(&key);
                }
            }
        }
        tx_state.read_versions.clear();
        tx_state.open = false;
        debug!("Request {}: Committed {} staged writes.", request_id, applied);
        Ok(())
    }

    fn rollback(&self, request_id: u64) -> Result<(), StoreError> {
        let mut tx_state = self
            .inner
            .tx_states
            .get_mut(&request_id)
            .filter(|s| s.open)
            .ok_or(StoreError::NoActiveTransaction(request_id))?;
        let discarded = tx_state.writes.len();
        tx_state.writes.clear();
        tx_state.read_versions.clear();
        tx_state.open = false;
        debug!(
            "Request {}: Rolled back {} staged writes.",
            request_id, discarded
        );
        Ok(())
    }

    fn dispose(&self, request_id: u64) {
        if self.inner.tx_states.remove(&request_id).is_some() {
            debug!("Request {}: Disposed transaction state.", request_id);
        } else {
            debug!(
                "Request {}: Dispose called without transaction state.",
                request_id
            );
        }
    }
}

/// The unit of work for one request against a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    store: MemoryStore,
    request_id: u64,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn begin_transaction(&mut self) -> Result<(), StoreError> {
        self.store.begin(self.request_id)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.store.commit(self.request_id).await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.store.rollback(self.request_id)
    }

    async fn dispose(&mut self) -> Result<(), StoreError> {
        self.store.dispose(self.request_id);
        Ok(())
    }
}

impl UnitOfWorkFactory for MemoryStore {
    fn create(&self, request_id: u64) -> Box<dyn UnitOfWork> {
        Box::new(MemoryUnitOfWork {
            store: self.clone(),
            request_id,
        })
    }
}
