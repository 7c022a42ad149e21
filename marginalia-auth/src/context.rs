// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use marginalia_core::{ObjectId, Principal};
use marginalia_store::{GrantStore, ObjectStore};
use tracing::trace;

use crate::composer::{Composition, compose};

/// Request-scoped evaluation context.
///
/// Create one per request and drop it when the response was sent. It memoizes composed
/// document and corpus capabilities keyed on principal, document and corpus so that a request
/// touching many rows evaluates them only once. Memoized values are tied to the grant version of
/// the store: as soon as any grant changes, the next lookup discards all of them.
#[derive(Debug, Default)]
pub struct RequestContext {
    grant_version: Option<u64>,
    compositions: HashMap<(Principal, ObjectId, Option<ObjectId>), Composition>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composed capabilities, from the memo if grants did not change since they were computed.
    pub async fn composition<S>(
        &mut self,
        store: &S,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
    ) -> Result<Composition, S::Error>
    where
        S: GrantStore + ObjectStore,
    {
        let version = store.grant_version().await?;
        if self.grant_version != Some(version) {
            if !self.compositions.is_empty() {
                trace!(version, "grants changed, dropping memoized compositions");
            }
            self.compositions.clear();
            self.grant_version = Some(version);
        }

        let key = (*principal, *document_id, corpus_id.copied());
        if let Some(composition) = self.compositions.get(&key) {
            return Ok(*composition);
        }

        let composition = compose(store, principal, document_id, corpus_id).await?;
        self.compositions.insert(key, composition);
        Ok(composition)
    }

    /// Number of memoized compositions.
    pub fn memoized(&self) -> usize {
        self.compositions.len()
    }
}
