// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the marginalia permission engine.
//!
//! The store keeps explicit grants (principal, object kind, object id, capability) next to the
//! permission-relevant fields of documents, corpora, analyses, extracts, annotations and
//! relationships. It does not evaluate permissions itself, see `marginalia-auth` for that.
//!
//! Every interface is expressed as an async trait over a shared `Store` base, two backends
//! implement all of them:
//!
//! - `MemoryStore`: in-memory store for development and testing, enabled with the `memory`
//!   feature flag
//! - `SqliteStore`: SQLite database via `sqlx`, enabled with the `sqlite` feature flag
//!
//! Writes only ever happen inside a transaction (see `Transaction`), readers always see the
//! last committed state.
pub mod config;
pub mod grants;
#[cfg(feature = "memory")]
pub mod memory;
pub mod objects;
pub mod rows;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;
pub mod tree;

pub use config::StoreConfig;
pub use grants::GrantStore;
#[cfg(feature = "memory")]
pub use memory::{MemoryStore, MemoryStoreError};
pub use objects::ObjectStore;
pub use rows::{CorpusScope, OwnerFilter, RowQuery, ScopedRows};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
pub use traits::{MAX_ID, Store, Transaction};
pub use tree::TreeStore;
