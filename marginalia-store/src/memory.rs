// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for grants and domain objects.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use marginalia_core::{
    Analysis, Annotation, CapabilitySet, Corpus, Document, Extract, ObjectId, ObjectRef,
    PrincipalId, Relationship,
};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{trace, warn};

use crate::traits::{MAX_ID, Store, Transaction};

/// State held by a `MemoryStore`.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    pub(crate) documents: BTreeMap<ObjectId, Document>,
    pub(crate) corpora: BTreeMap<ObjectId, Corpus>,
    pub(crate) analyses: BTreeMap<ObjectId, Analysis>,
    pub(crate) extracts: BTreeMap<ObjectId, Extract>,
    pub(crate) annotations: BTreeMap<ObjectId, Annotation>,
    pub(crate) relationships: BTreeMap<ObjectId, Relationship>,
    pub(crate) grants: HashMap<(PrincipalId, ObjectRef), CapabilitySet>,
    pub(crate) grant_version: u64,
}

/// In-memory store.
///
/// This does not persist data permamently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// `MemoryStore` supports usage in asynchronous and multi-threaded contexts by wrapping the
/// committed state with an `RwLock` and `Arc`. Writes are never applied to the committed state
/// directly: beginning a transaction stages a private copy which all writes go to, committing
/// swaps it in at once and rolling back discards it. Readers therefore only ever observe fully
/// committed state.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    committed: Arc<RwLock<InnerMemoryStore>>,
    staged: Arc<Mutex<Option<InnerMemoryStore>>>,
    semaphore: Arc<Semaphore>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Arc::default(),
            staged: Arc::default(),
            // Only one transaction can be staged at a time, concurrent writers wait for the
            // permit.
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Obtain a read-lock on the committed state.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.committed
            .read()
            .expect("acquire shared read access on store")
    }

    /// Apply a write to the staged state of the current transaction.
    ///
    /// Returns an error when no transaction was started.
    pub(crate) fn stage<F, R>(&self, f: F) -> Result<R, MemoryStoreError>
    where
        F: FnOnce(&mut InnerMemoryStore) -> R,
    {
        let mut staged = self
            .staged
            .lock()
            .expect("acquire exclusive access on staged state");
        let inner = staged
            .as_mut()
            .ok_or(MemoryStoreError::TransactionMissing)?;
        Ok(f(inner))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    type Error = MemoryStoreError;
}

impl Transaction for MemoryStore {
    type Permit = MemoryPermit;

    async fn begin(&self) -> Result<MemoryPermit, MemoryStoreError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        let snapshot = self.read_store().clone();
        let mut staged = self
            .staged
            .lock()
            .expect("acquire exclusive access on staged state");

        // Holding the permit means whatever is still staged belongs to an abandoned transaction.
        if staged.replace(snapshot).is_some() {
            warn!("discarded writes of an abandoned memory transaction");
        }

        trace!("memory transaction started");
        Ok(MemoryPermit {
            staged: self.staged.clone(),
            _permit: permit,
        })
    }

    async fn rollback(&self, permit: MemoryPermit) -> Result<(), MemoryStoreError> {
        let staged = self
            .staged
            .lock()
            .expect("acquire exclusive access on staged state")
            .take();
        drop(permit);

        match staged {
            Some(_) => {
                trace!("memory transaction rolled back");
                Ok(())
            }
            None => Err(MemoryStoreError::TransactionMissing),
        }
    }

    async fn commit(&self, permit: MemoryPermit) -> Result<(), MemoryStoreError> {
        let staged = self
            .staged
            .lock()
            .expect("acquire exclusive access on staged state")
            .take();

        let result = match staged {
            Some(inner) => {
                *self
                    .committed
                    .write()
                    .expect("acquire exclusive write access on store") = inner;
                trace!("memory transaction committed");
                Ok(())
            }
            None => Err(MemoryStoreError::TransactionMissing),
        };

        // Always drop the permit, both on successful commit and error. This will allow other
        // processes now to begin a new transaction.
        drop(permit);

        result
    }
}

/// Permit held while a memory transaction is staged.
///
/// Dropping the permit without passing it to `commit` or `rollback` discards the staged writes,
/// for example when the future driving the transaction is cancelled.
pub struct MemoryPermit {
    staged: Arc<Mutex<Option<InnerMemoryStore>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for MemoryPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit is released, the next writer starts from a clean slate.
        let Ok(mut staged) = self.staged.lock() else {
            return;
        };
        if staged.take().is_some() {
            warn!("memory transaction dropped before commit or rollback, discarding writes");
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// Writes can only ever occur if a transaction was started _before_.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    #[error("can't store identifier {0}, it exceeds {max}", max = MAX_ID)]
    IdOutOfRange(u64),
}

/// Reject writes referencing identifiers the SQLite backend couldn't persist either.
pub(crate) fn check_ids(ids: impl IntoIterator<Item = u64>) -> Result<(), MemoryStoreError> {
    match ids.into_iter().find(|id| *id > MAX_ID) {
        Some(id) => Err(MemoryStoreError::IdOutOfRange(id)),
        None => Ok(()),
    }
}
