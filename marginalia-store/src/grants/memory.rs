// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{CapabilitySet, ObjectRef, PrincipalId};

use crate::grants::GrantStore;
use crate::memory::{MemoryStore, MemoryStoreError, check_ids};

impl GrantStore for MemoryStore {
    async fn grants_for(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
    ) -> Result<CapabilitySet, MemoryStoreError> {
        let store = self.read_store();
        Ok(store
            .grants
            .get(&(*principal, *object))
            .copied()
            .unwrap_or_default())
    }

    async fn write_grants(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, MemoryStoreError> {
        check_ids([principal.as_u64(), object.id.as_u64()])?;
        self.stage(|inner| {
            if capabilities.is_empty() {
                return false;
            }

            let granted = inner.grants.entry((*principal, *object)).or_default();
            let updated = granted.union(&capabilities);
            let changed = updated != *granted;
            *granted = updated;
            if changed {
                inner.grant_version += 1;
            }
            changed
        })
    }

    async fn revoke(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, MemoryStoreError> {
        check_ids([principal.as_u64(), object.id.as_u64()])?;
        self.stage(|inner| {
            let key = (*principal, *object);
            let Some(granted) = inner.grants.get(&key).copied() else {
                return false;
            };

            let remaining = granted.difference(&capabilities);
            if remaining.is_empty() {
                inner.grants.remove(&key);
            } else {
                inner.grants.insert(key, remaining);
            }

            let changed = remaining != granted;
            if changed {
                inner.grant_version += 1;
            }
            changed
        })
    }

    async fn grant_version(&self) -> Result<u64, MemoryStoreError> {
        Ok(self.read_store().grant_version)
    }
}
