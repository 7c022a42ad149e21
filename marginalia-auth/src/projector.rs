// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project permissions onto bulk queries over annotations and relationships.
//!
//! Capabilities are composed once per request for the document and corpus in scope instead of
//! once per row. The store narrows rows down with a single predicate, afterwards only the
//! privacy overlays are evaluated per row, with every owning analysis or extract looked up once.
use marginalia_core::{CapabilitySet, ObjectId, Principal, ScopedObject};
use marginalia_store::{CorpusScope, GrantStore, ObjectStore, ScopedRows};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::comment::CommentPolicy;
use crate::context::RequestContext;
use crate::error::AuthError;
use crate::filters::ResolveFilters;
use crate::privacy::{OwnerCache, PrivacyScope, privacy_scope};

/// Capabilities shared by all rows of a resolved collection.
///
/// This reflects the common document and corpus floor only. Check the single object again
/// before mutating it.
pub type CapabilityDescriptor = CapabilitySet;

/// Rows visible to a principal together with one shared capability descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    /// De-duplicated rows, ordered by id.
    pub rows: Vec<T>,
    pub capabilities: CapabilityDescriptor,
}

impl<T> Resolved<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            capabilities: CapabilityDescriptor::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Resolve all rows of a document and optional corpus the principal may see.
///
/// Without a corpus only structural rows are considered. Read paths never fail because of
/// missing or unreadable objects, they resolve to an empty collection. Only store errors are
/// returned.
pub async fn resolve<S, T>(
    store: &S,
    ctx: &mut RequestContext,
    principal: &Principal,
    document_id: &ObjectId,
    corpus_id: Option<&ObjectId>,
    filters: &ResolveFilters,
) -> Result<Resolved<T>, AuthError<S::Error>>
where
    S: GrantStore + ObjectStore + ScopedRows<T>,
    T: ScopedObject,
{
    let composition = ctx
        .composition(store, principal, document_id, corpus_id)
        .await
        .map_err(AuthError::Store)?;
    if !composition.can_read() {
        trace!(%principal, %document_id, ?corpus_id, "no read access on document or corpus");
        return Ok(Resolved::empty());
    }

    let scope = match corpus_id {
        Some(corpus_id) => CorpusScope::Corpus(*corpus_id),
        None => CorpusScope::StructuralOnly,
    };

    let query = match filters
        .row_query(store, principal, *document_id, scope)
        .await
    {
        Ok(query) => query,
        Err(err) if err.is_fail_closed() => {
            debug!(%principal, %err, "filter rejected, resolving to nothing");
            return Ok(Resolved::empty());
        }
        Err(err) => return Err(err),
    };

    let mut candidates = store.select(&query).await.map_err(AuthError::Store)?;
    candidates.sort_by_key(|row| row.id());
    candidates.dedup_by_key(|row| row.id());

    let mut owners = OwnerCache::new();
    let mut rows = Vec::with_capacity(candidates.len());
    for row in candidates {
        let scope = privacy_scope(
            store,
            principal,
            composition.capabilities,
            &row,
            &mut owners,
        )
        .await
        .map_err(AuthError::Store)?;

        match scope {
            PrivacyScope::Visible(_) => rows.push(row),
            PrivacyScope::Excluded => {
                trace!(%principal, object = %row.object_ref(), "excluded by privacy scope")
            }
        }
    }

    Ok(Resolved {
        rows,
        capabilities: CommentPolicy::new(composition.allow_comments)
            .apply(principal, composition.capabilities),
    })
}
