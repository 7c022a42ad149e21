// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Capability, ObjectId, ObjectKind, ObjectRef, Principal};
use marginalia_store::{CorpusScope, GrantStore, ObjectStore, OwnerFilter, RowQuery};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::resolver::base_capabilities;

/// Filter value selecting rows without any analysis (or extract) origin.
pub const NO_OWNER: &str = "__none__";

/// Filters callers can apply on top of the document and corpus scope of a bulk query.
///
/// `analysis` and `extract` are raw references as received from the caller, either a plain id
/// (`"12"`), a kind-qualified one (`"analysis:12"`) or `NO_OWNER`. A reference which is
/// malformed, points nowhere or to an object the principal can't read empties the whole result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveFilters {
    pub pages: Option<Vec<u32>>,
    pub analysis: Option<String>,
    pub extract: Option<String>,
    pub structural: Option<bool>,
}

impl ResolveFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.pages = Some(pages.into_iter().collect());
        self
    }

    pub fn analysis(mut self, reference: impl Into<String>) -> Self {
        self.analysis = Some(reference.into());
        self
    }

    pub fn extract(mut self, reference: impl Into<String>) -> Self {
        self.extract = Some(reference.into());
        self
    }

    pub fn structural(mut self, structural: bool) -> Self {
        self.structural = Some(structural);
        self
    }

    /// Turn filters into a store query after checking every referenced owner.
    pub(crate) async fn row_query<S>(
        &self,
        store: &S,
        principal: &Principal,
        document_id: ObjectId,
        scope: CorpusScope,
    ) -> Result<RowQuery, AuthError<S::Error>>
    where
        S: GrantStore + ObjectStore,
    {
        let mut query = RowQuery::new(document_id, scope);

        if let Some(pages) = &self.pages {
            query = query.pages(pages.clone());
        }

        if let Some(structural) = self.structural {
            query = query.structural(structural);
        }

        if let Some(value) = &self.analysis {
            let owner = owner_filter(store, principal, ObjectKind::Analysis, value).await?;
            query = query.analysis(owner);
        }

        if let Some(value) = &self.extract {
            let owner = owner_filter(store, principal, ObjectKind::Extract, value).await?;
            query = query.extract(owner);
        }

        Ok(query)
    }
}

/// Resolve a single analysis or extract reference into a filter the principal may apply.
async fn owner_filter<S>(
    store: &S,
    principal: &Principal,
    kind: ObjectKind,
    value: &str,
) -> Result<OwnerFilter, AuthError<S::Error>>
where
    S: GrantStore + ObjectStore,
{
    if value.trim() == NO_OWNER {
        return Ok(OwnerFilter::Absent);
    }

    let reference = ObjectRef::parse(kind, value)?;
    let capabilities = if kind == ObjectKind::Analysis {
        match store.analysis(&reference.id).await.map_err(AuthError::Store)? {
            Some(analysis) => base_capabilities(store, principal, &analysis)
                .await
                .map_err(AuthError::Store)?,
            None => return Err(AuthError::NotFound(reference)),
        }
    } else {
        match store.extract(&reference.id).await.map_err(AuthError::Store)? {
            Some(extract) => base_capabilities(store, principal, &extract)
                .await
                .map_err(AuthError::Store)?,
            None => return Err(AuthError::NotFound(reference)),
        }
    };

    if !capabilities.contains(Capability::Read) {
        return Err(AuthError::PermissionDenied {
            principal: principal.id,
            object: reference,
            capability: Capability::Read,
        });
    }

    Ok(OwnerFilter::Is(reference.id))
}
