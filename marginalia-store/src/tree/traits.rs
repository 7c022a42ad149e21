// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::ObjectId;

use crate::traits::Store;

/// Maximum depth followed when walking the annotation tree.
///
/// Parent links are not guaranteed to be acyclic, the walk stops at this depth.
pub const MAX_TREE_DEPTH: u32 = 1024;

/// Interface for walking the parent links between annotations.
///
/// Both lookups exclude the starting annotation and return ids nearest first, ids at the same
/// depth are ordered ascending. No permissions are evaluated here.
pub trait TreeStore: Store {
    /// Parent, grand-parent and so on of the given annotation.
    fn ancestors(&self, id: &ObjectId) -> impl Future<Output = Result<Vec<ObjectId>, Self::Error>>;

    /// All annotations below the given one.
    fn descendants(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Vec<ObjectId>, Self::Error>>;
}
