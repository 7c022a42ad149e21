// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for store backends.
//!
//! `StoreConfig` offers an alternative configuration API which can be passed into
//! `SqliteStoreBuilder::from_config` instead of calling the builder methods one by one. It can be
//! deserialized from any serde-supported format, missing fields fall back to their defaults.
use serde::{Deserialize, Serialize};

/// Default database url, a file in the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://marginalia.db";

/// Default maximum number of pooled database connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Configuration parameters for the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database url, for example `sqlite://marginalia.db`.
    pub database_url: String,

    /// Maximum number of connections kept in the pool.
    pub max_connections: u32,

    /// Create the database if it doesn't exist yet.
    pub create_database: bool,

    /// Run pending schema migrations when the store is built.
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            create_database: true,
            run_migrations: true,
        }
    }
}
