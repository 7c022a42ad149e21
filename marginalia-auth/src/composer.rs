// SPDX-License-Identifier: MIT OR Apache-2.0

//! Combine document and corpus capabilities into the effective capabilities of the objects
//! scoped to them.
use marginalia_core::{Capability, CapabilitySet, ObjectId, Principal};
use marginalia_store::{GrantStore, ObjectStore};
use tracing::debug;

use crate::resolver::base_capabilities;

/// Effective capabilities on a document and optional corpus, together with the comment mode of
/// that corpus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    pub capabilities: CapabilitySet,

    /// Comment relaxation of the corpus in scope, `false` without a corpus.
    pub allow_comments: bool,
}

impl Composition {
    pub fn can_read(&self) -> bool {
        self.capabilities.contains(Capability::Read)
    }
}

/// Compose the capabilities of a principal on a document and an optional corpus.
///
/// Reading the document is the gate, without it nothing else is evaluated and the result is
/// empty. With a corpus the capabilities of both sides are intersected, every capability needs
/// to be held on the document _and_ on the corpus. Unknown documents or corpora compose to
/// nothing.
pub async fn compose<S>(
    store: &S,
    principal: &Principal,
    document_id: &ObjectId,
    corpus_id: Option<&ObjectId>,
) -> Result<Composition, S::Error>
where
    S: GrantStore + ObjectStore,
{
    if principal.is_superuser {
        return Ok(Composition {
            capabilities: CapabilitySet::all(),
            allow_comments: false,
        });
    }

    let Some(document) = store.document(document_id).await? else {
        debug!(%document_id, "document not found");
        return Ok(Composition::default());
    };

    let document_capabilities = base_capabilities(store, principal, &document).await?;
    if !document_capabilities.contains(Capability::Read) {
        return Ok(Composition::default());
    }

    let Some(corpus_id) = corpus_id else {
        return Ok(Composition {
            capabilities: document_capabilities,
            allow_comments: false,
        });
    };

    let Some(corpus) = store.corpus(corpus_id).await? else {
        debug!(%corpus_id, "corpus not found");
        return Ok(Composition::default());
    };

    let corpus_capabilities = base_capabilities(store, principal, &corpus).await?;
    Ok(Composition {
        capabilities: document_capabilities.intersection(&corpus_capabilities),
        allow_comments: corpus.allow_comments,
    })
}

/// Effective capabilities of a principal on all objects scoped to a document and optional
/// corpus, before privacy and comment overlays.
pub async fn effective_permissions<S>(
    store: &S,
    principal: &Principal,
    document_id: &ObjectId,
    corpus_id: Option<&ObjectId>,
) -> Result<CapabilitySet, S::Error>
where
    S: GrantStore + ObjectStore,
{
    Ok(compose(store, principal, document_id, corpus_id)
        .await?
        .capabilities)
}
