// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backend built on a `sqlx` connection pool.
use std::sync::Arc;

use marginalia_core::cbor::EmbeddingError;
use marginalia_core::{CapabilityError, MisconfigurationError, ReferenceError};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, migrate};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::traits::{MAX_ID, Store, Transaction};

/// Schema of the grant and object tables, embedded from `migrations/`.
pub static MIGRATOR: Migrator = migrate!();

/// Open SQLite write transaction.
pub type WriteTx<'a> = sqlx::Transaction<'a, Sqlite>;

/// Builder for `SqliteStore`, usually created from a `StoreConfig`.
pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    run_migrations: bool,
    create_database: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            url: config.database_url.clone(),
            max_connections: config.max_connections,
            create_database: config.create_database,
            run_migrations: config.run_migrations,
        }
    }

    /// Use a private in-memory database with a random name.
    ///
    /// Shared-cache in-memory databases leak between tests running in the same process, see
    /// https://github.com/launchbadge/sqlx/issues/2510.
    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        self.url = format!(
            "sqlite://marginalia-{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    /// Connect the pool, creating the database file and applying migrations when enabled.
    pub async fn build<'a>(self) -> Result<SqliteStore<'a>, SqliteError> {
        if self.create_database && !Sqlite::database_exists(&self.url).await? {
            Sqlite::create_database(&self.url).await?;
            debug!(url = %self.url, "created sqlite database");
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        if self.run_migrations {
            MIGRATOR.run(&pool).await?;
        }

        debug!(url = %self.url, max_connections = self.max_connections, "sqlite store ready");
        Ok(SqliteStore::new(pool))
    }
}

/// Grant and object store persisted in SQLite.
///
/// Clones share the pool and the currently open write transaction. Only one write transaction
/// exists at a time: `begin` hands out a `TransactionPermit` and every write goes through `tx`
/// until the permit is returned with `commit` or `rollback`.
///
/// Reads go through `execute` on the pool and only observe committed rows. With a pool of a
/// single connection a read issued while a write transaction is open waits for it to finish, so
/// callers read what they need before calling `begin`.
#[derive(Clone, Debug)]
pub struct SqliteStore<'a> {
    open_tx: Arc<Mutex<Option<WriteTx<'a>>>>,
    pool: SqlitePool,
    writers: Arc<Semaphore>,
}

impl<'a> SqliteStore<'a> {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            open_tx: Arc::default(),
            pool,
            writers: Arc::new(Semaphore::new(1)),
        }
    }

    /// In-memory database with a random name and a single connection.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("in-memory database with migrations")
    }

    /// Run queries inside the open write transaction.
    ///
    /// Fails with `TransactionMissing` when `begin` wasn't called. A failing query leaves the
    /// transaction open, rolling it back is up to the caller.
    pub async fn tx<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut WriteTx) -> Result<R, SqliteError>,
    {
        let mut open_tx = self.open_tx.lock().await;
        let tx = open_tx.as_mut().ok_or(SqliteError::TransactionMissing)?;
        f(tx).await
    }

    /// Run queries against committed state.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&SqlitePool) -> Result<R, SqliteError>,
    {
        f(&self.pool).await
    }

    async fn take_tx(&self) -> Result<WriteTx<'a>, SqliteError> {
        self.open_tx
            .lock()
            .await
            .take()
            .ok_or(SqliteError::TransactionMissing)
    }
}

impl<'a> Store for SqliteStore<'a> {
    type Error = SqliteError;
}

impl<'a> Transaction for SqliteStore<'a> {
    type Permit = TransactionPermit<'a>;

    /// Opens the write transaction, waiting while another one is open.
    async fn begin(&self) -> Result<TransactionPermit<'a>, SqliteError> {
        let permit = self
            .writers
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore lives as long as the store");

        let mut open_tx = self.open_tx.lock().await;
        // Holding the only permit means a transaction still open here was abandoned.
        if let Some(abandoned) = open_tx.take() {
            warn!("rolling back an abandoned sqlite transaction");
            abandoned.rollback().await?;
        }
        open_tx.replace(self.pool.begin().await?);

        trace!("sqlite transaction started");
        Ok(TransactionPermit {
            open_tx: self.open_tx.clone(),
            _permit: permit,
        })
    }

    async fn rollback(&self, permit: TransactionPermit<'a>) -> Result<(), SqliteError> {
        let result = match self.take_tx().await {
            Ok(tx) => tx.rollback().await.map_err(SqliteError::from),
            Err(err) => Err(err),
        };
        drop(permit);

        trace!(ok = result.is_ok(), "sqlite transaction rolled back");
        result
    }

    async fn commit(&self, permit: TransactionPermit<'a>) -> Result<(), SqliteError> {
        let result = match self.take_tx().await {
            Ok(tx) => tx.commit().await.map_err(SqliteError::from),
            Err(err) => Err(err),
        };
        drop(permit);

        trace!(ok = result.is_ok(), "sqlite transaction committed");
        result
    }
}

/// Proof of holding the single write transaction of a `SqliteStore`.
///
/// Dropping the permit without passing it to `commit` or `rollback` closes the open transaction,
/// sqlx rolls it back once the connection returns to the pool.
pub struct TransactionPermit<'a> {
    open_tx: Arc<Mutex<Option<WriteTx<'a>>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for TransactionPermit<'_> {
    fn drop(&mut self) {
        // A held lock means a write is still in flight, `begin` rolls the transaction back then.
        let Ok(mut open_tx) = self.open_tx.try_lock() else {
            return;
        };
        if open_tx.take().is_some() {
            warn!("sqlite transaction dropped before commit or rollback, rolling back");
        }
    }
}

#[derive(Debug, Error)]
pub enum SqliteError {
    /// Writes were issued without calling `begin` first.
    #[error("no write transaction is open")]
    TransactionMissing,

    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("can't encode '{0}' for storage: {1}")]
    Encode(String, EmbeddingError),

    /// Identifier beyond the signed 64-bit range SQLite stores integers in.
    #[error("can't store '{0}' identifier {1}, it exceeds {max}", max = MAX_ID)]
    IdOutOfRange(String, u64),

    /// A stored row violates the domain model, for example both origin columns are set.
    #[error("corrupted '{0}' value in database: {1}")]
    Decode(String, DecodeError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Misconfiguration(#[from] MisconfigurationError),

    #[error("negative identifier {0}")]
    NegativeId(i64),

    #[error("unknown relationship role '{0}'")]
    Role(String),
}

/// Convert an identifier to the signed integer SQLite stores it as, for writes.
pub(crate) fn to_sql_id(field: &str, id: u64) -> Result<i64, SqliteError> {
    i64::try_from(id).map_err(|_| SqliteError::IdOutOfRange(field.to_string(), id))
}

/// Convert an identifier for a lookup.
///
/// Identifiers which can't be stored are bound as `NULL`, which never compares equal and so
/// matches nothing.
pub(crate) fn lookup_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// Convert stored signed integers back to identifiers.
pub(crate) fn from_sql_id(field: &str, id: i64) -> Result<u64, SqliteError> {
    u64::try_from(id)
        .map_err(|_| SqliteError::Decode(field.to_string(), DecodeError::NegativeId(id)))
}
