// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

/// Largest object or principal identifier a store persists.
///
/// SQLite stores integers as signed 64-bit values, every backend rejects writes referencing
/// larger identifiers so that all of them accept the same data. Lookups of larger identifiers
/// find nothing.
pub const MAX_ID: u64 = i64::MAX as u64;

/// Common base of all store interfaces.
///
/// Every concrete store reports one error type for all of its read and write interfaces. This
/// allows callers to combine `GrantStore`, `ObjectStore` and friends on the same store without
/// juggling separate error types.
pub trait Store {
    type Error: Error + Send + Sync + 'static;
}

/// Write transactions over a store.
///
/// Grant and object writes only ever happen between `begin` and `commit`, readers see the state
/// of the last commit. `begin` returns a permit which has to be handed back to finish the
/// transaction, making it visible in the code which task currently holds it. Dropping the permit
/// instead, for example when the surrounding future is cancelled, discards the writes like
/// `rollback` does.
pub trait Transaction: Store {
    type Permit;

    /// Begins a transaction, waiting for any other open one to finish.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Discards all writes since `begin`.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction, making all changes visible to readers at once.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;
}
