// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ScopedRows` trait selecting annotations and relationships of one document, and its concrete
//! implementations.
#[cfg(feature = "memory")]
mod memory;
mod query;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use query::{CorpusScope, OwnerFilter, RowQuery};
pub use traits::ScopedRows;
