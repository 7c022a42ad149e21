// SPDX-License-Identifier: MIT OR Apache-2.0

//! `GrantStore` trait for explicitly delegated capabilities and its concrete implementations.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::GrantStore;
