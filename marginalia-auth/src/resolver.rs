// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capabilities of a principal on a single base object.
//!
//! Base objects (documents, corpora, analyses and extracts) are resolved from ownership, their
//! public flag and explicit grants only. Hierarchy and privacy scoping are applied on top of this
//! by the composer and the privacy resolver.
use marginalia_core::{BaseObject, Capability, CapabilitySet, Principal};
use marginalia_store::GrantStore;
use tracing::trace;

/// Compute all capabilities a principal holds on a base object.
///
/// Rules are evaluated in order, the first matching one wins:
///
/// 1. Superusers hold every capability.
/// 2. Anonymous principals can only read, and only public objects.
/// 3. The creator of an object holds every capability.
/// 4. Everyone else holds what was explicitly granted to them, plus read access on public
///    objects. Signing in never yields less than browsing anonymously.
///
/// Grants are looked up once for the whole set instead of once per capability.
pub async fn base_capabilities<S, O>(
    store: &S,
    principal: &Principal,
    object: &O,
) -> Result<CapabilitySet, S::Error>
where
    S: GrantStore,
    O: BaseObject + ?Sized,
{
    if principal.is_superuser {
        return Ok(CapabilitySet::all());
    }

    if principal.is_anonymous {
        return Ok(if object.is_public() {
            CapabilitySet::only(Capability::Read)
        } else {
            CapabilitySet::empty()
        });
    }

    if principal.is(&object.creator()) {
        return Ok(CapabilitySet::all());
    }

    let mut granted = store.grants_for(&principal.id, &object.object_ref()).await?;
    trace!(%principal, object = %object.object_ref(), capabilities = %granted, "explicit grants");
    if object.is_public() {
        granted.insert(Capability::Read);
    }
    Ok(granted)
}

/// Returns `true` if the principal holds the capability on the base object.
pub async fn can<S, O>(
    store: &S,
    principal: &Principal,
    object: &O,
    capability: Capability,
) -> Result<bool, S::Error>
where
    S: GrantStore,
    O: BaseObject + ?Sized,
{
    Ok(base_capabilities(store, principal, object)
        .await?
        .contains(capability))
}
