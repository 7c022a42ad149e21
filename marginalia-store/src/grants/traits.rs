// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{CapabilitySet, ObjectRef, PrincipalId};

use crate::traits::Store;

/// Interface for reading and writing explicit `(principal, object, capability)` grants.
///
/// Grants are facts independent of the objects they reference: they can exist for objects which
/// were never stored and they are not removed when an object is. Writes must happen inside a
/// transaction (see `Transaction`), reads only ever see committed grants.
pub trait GrantStore: Store {
    /// Capabilities explicitly granted to the principal on the given object.
    fn grants_for(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
    ) -> impl Future<Output = Result<CapabilitySet, Self::Error>>;

    /// Grant the given capabilities in addition to already existing ones.
    ///
    /// Returns `true` when at least one capability was newly granted.
    fn write_grants(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Revoke the given capabilities, leaving all others in place.
    ///
    /// Returns `true` when at least one capability was removed.
    fn revoke(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Token which changes whenever grants were mutated.
    ///
    /// Callers caching evaluation results within one request use it to detect grant changes.
    fn grant_version(&self) -> impl Future<Output = Result<u64, Self::Error>>;
}
