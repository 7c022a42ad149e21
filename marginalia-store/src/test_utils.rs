// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities shared by store and engine tests.

/// Install a `tracing` subscriber printing logs, only when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Runs a test body once against a fresh `MemoryStore` and once against a fresh in-memory
/// `SqliteStore`.
///
/// Unlike reads, writes are not wrapped automatically: grant changes are all-or-nothing and the
/// body is expected to `begin` and `commit` itself, the same way the permission engine does.
///
/// ## Example
///
/// ```rust
/// # use marginalia_core::{Capability, CapabilitySet, ObjectRef, PrincipalId};
/// # use marginalia_store::assert_all_stores;
/// # use marginalia_store::{GrantStore, Transaction};
/// # async fn run() {
/// assert_all_stores!(|store| async {
///     let permit = store.begin().await.unwrap();
///     store
///         .write_grants(
///             &PrincipalId::new(1),
///             &ObjectRef::document(1),
///             CapabilitySet::only(Capability::Read),
///         )
///         .await
///         .unwrap();
///     store.commit(permit).await.unwrap();
/// });
/// # }
/// ```
#[macro_export]
macro_rules! assert_all_stores {
    (|$store:ident| $test_body:expr) => {
        // Test with MemoryStore.
        {
            let $store = $crate::memory::MemoryStore::new();
            $test_body.await;
        }

        // Test with SqliteStore.
        {
            let $store = $crate::sqlite::SqliteStoreBuilder::new()
                .random_memory_url()
                // Single-threaded test runtime, one connection is enough.
                .max_connections(1)
                .build()
                .await
                .unwrap();
            $test_body.await;
        }
    };
}
