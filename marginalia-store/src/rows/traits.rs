// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::rows::RowQuery;
use crate::traits::Store;

/// Interface for selecting scoped rows (annotations or relationships) of a document.
///
/// Implementations may return the same row more than once when filters join across
/// many-to-many links, callers de-duplicate.
pub trait ScopedRows<T>: Store {
    fn select(&self, query: &RowQuery) -> impl Future<Output = Result<Vec<T>, Self::Error>>;
}
