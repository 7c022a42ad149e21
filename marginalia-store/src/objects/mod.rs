// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ObjectStore` trait for the permission-relevant fields of domain objects and its concrete
//! implementations.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::ObjectStore;
