// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visibility and write-suppression overlays on scoped objects.
use std::collections::HashMap;

use marginalia_core::{Capability, CapabilitySet, ObjectRef, Origin, Principal, ScopedObject};
use marginalia_store::{GrantStore, ObjectStore};
use tracing::trace;

use crate::resolver::base_capabilities;

/// Capabilities structural objects never hand out to non-superusers.
pub fn structural_writes() -> CapabilitySet {
    Capability::ALL
        .into_iter()
        .filter(Capability::is_write)
        .collect()
}

/// Outcome of applying the privacy overlays on a single scoped object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivacyScope {
    /// Object is not part of any result set for this principal.
    Excluded,

    /// Object is visible with these capabilities, before the comment overlay.
    Visible(CapabilitySet),
}

/// Capabilities on owning analyses and extracts, evaluated once per distinct owner.
///
/// A cache lives for a single evaluation only and is never shared across requests.
#[derive(Debug, Default)]
pub struct OwnerCache {
    owners: HashMap<ObjectRef, CapabilitySet>,
}

impl OwnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities of the principal on the owner of an object, `None` for plain objects.
    ///
    /// Owners which don't exist resolve to no capabilities.
    pub async fn owner_capabilities<S>(
        &mut self,
        store: &S,
        principal: &Principal,
        origin: &Origin,
    ) -> Result<Option<CapabilitySet>, S::Error>
    where
        S: GrantStore + ObjectStore,
    {
        let Some(owner) = origin.owner() else {
            return Ok(None);
        };

        if let Some(capabilities) = self.owners.get(&owner) {
            return Ok(Some(*capabilities));
        }

        let capabilities = match origin {
            Origin::Plain => return Ok(None),
            Origin::Analysis(id) => match store.analysis(id).await? {
                Some(analysis) => base_capabilities(store, principal, &analysis).await?,
                None => CapabilitySet::empty(),
            },
            Origin::Extract(id) => match store.extract(id).await? {
                Some(extract) => base_capabilities(store, principal, &extract).await?,
                None => CapabilitySet::empty(),
            },
        };
        trace!(%owner, %capabilities, "owner capabilities");

        self.owners.insert(owner, capabilities);
        Ok(Some(capabilities))
    }
}

/// Apply structural and exclusive-ownership rules on top of the composed capabilities.
///
/// - Without read access on document and corpus nothing is visible.
/// - Objects without a corpus are only visible when structural.
/// - Structural objects inherit read access but are never writable by non-superusers.
/// - Objects owned by an analysis or extract are only visible with read access on their owner,
///   all other capabilities need to be held on the owner as well.
/// - Plain objects keep the composed capabilities.
pub async fn privacy_scope<S, T>(
    store: &S,
    principal: &Principal,
    composed: CapabilitySet,
    object: &T,
    owners: &mut OwnerCache,
) -> Result<PrivacyScope, S::Error>
where
    S: GrantStore + ObjectStore,
    T: ScopedObject,
{
    if principal.is_superuser {
        return Ok(PrivacyScope::Visible(CapabilitySet::all()));
    }

    if !composed.contains(Capability::Read) {
        return Ok(PrivacyScope::Excluded);
    }

    if object.structural() {
        return Ok(PrivacyScope::Visible(
            composed.difference(&structural_writes()),
        ));
    }

    if object.corpus_id().is_none() {
        return Ok(PrivacyScope::Excluded);
    }

    match owners
        .owner_capabilities(store, principal, &object.origin())
        .await?
    {
        None => Ok(PrivacyScope::Visible(composed)),
        Some(owner) if owner.contains(Capability::Read) => {
            Ok(PrivacyScope::Visible(composed.intersection(&owner)))
        }
        Some(_) => Ok(PrivacyScope::Excluded),
    }
}
