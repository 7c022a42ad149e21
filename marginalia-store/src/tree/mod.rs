// SPDX-License-Identifier: MIT OR Apache-2.0

//! `TreeStore` trait walking the annotation parent tree and its concrete implementations.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::TreeStore;
