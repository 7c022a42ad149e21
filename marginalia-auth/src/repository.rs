// SPDX-License-Identifier: MIT OR Apache-2.0

//! Annotation repository composed from tree lookup, permission filtering and similarity search.
//!
//! Every strategy handles exactly one concern, the repository combines them explicitly: tree
//! and similarity lookups only ever see rows which passed the permission filter.
use std::cmp::Ordering;

use marginalia_core::{Annotation, Capability, ObjectId, Principal};
use marginalia_store::TreeStore;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::engine::{PermissionEngine, PermissionStore};
use crate::error::AuthError;
use crate::filters::ResolveFilters;
use crate::privacy::OwnerCache;
use crate::projector::Resolved;

/// Default number of results returned by similarity search.
pub const DEFAULT_SIMILARITY_LIMIT: usize = 10;

/// Configuration of an `AnnotationRepository`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Results returned by `similar` when the caller doesn't ask for a specific number.
    pub similarity_limit: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            similarity_limit: DEFAULT_SIMILARITY_LIMIT,
        }
    }
}

/// Walks the annotation parent tree without looking at permissions.
#[derive(Clone, Debug)]
pub struct TreeLookup<S> {
    store: S,
}

impl<S> TreeLookup<S>
where
    S: TreeStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn ancestors(&self, id: &ObjectId) -> Result<Vec<ObjectId>, S::Error> {
        self.store.ancestors(id).await
    }

    pub async fn descendants(&self, id: &ObjectId) -> Result<Vec<ObjectId>, S::Error> {
        self.store.descendants(id).await
    }
}

/// Keeps only annotations a principal may read.
#[derive(Clone, Debug)]
pub struct PermissionFilter<S> {
    engine: PermissionEngine<S>,
}

impl<S> PermissionFilter<S>
where
    S: PermissionStore,
{
    pub fn new(engine: PermissionEngine<S>) -> Self {
        Self { engine }
    }

    /// Annotations of a document and optional corpus visible to the principal.
    pub async fn visible(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
        filters: &ResolveFilters,
    ) -> Result<Resolved<Annotation>, AuthError<S::Error>> {
        self.engine
            .resolve_annotations(ctx, principal, document_id, corpus_id, filters)
            .await
    }

    /// Load the given annotations and keep those the principal may read, in the given order.
    ///
    /// Each annotation is checked within its own document and corpus. Unknown ids are skipped.
    pub async fn retain(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        ids: &[ObjectId],
    ) -> Result<Vec<Annotation>, AuthError<S::Error>> {
        let mut owners = OwnerCache::new();
        let mut visible = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(annotation) = self
                .engine
                .store()
                .annotation(id)
                .await
                .map_err(AuthError::Store)?
            else {
                continue;
            };

            let capabilities = self
                .engine
                .scoped_capabilities(ctx, principal, &annotation, &mut owners)
                .await
                .map_err(AuthError::Store)?;
            if capabilities.contains(Capability::Read) {
                visible.push(annotation);
            }
        }

        Ok(visible)
    }
}

/// Annotation with its similarity to a query vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Scored {
    pub annotation: Annotation,
    pub score: f32,
}

/// Ranks annotations by cosine similarity of their embeddings.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimilaritySearch;

impl SimilaritySearch {
    pub fn new() -> Self {
        Self
    }

    /// Cosine similarity of two vectors.
    ///
    /// Returns `None` if the dimensions differ or one of the vectors has no magnitude.
    pub fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
        if a.len() != b.len() || a.is_empty() {
            return None;
        }

        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return None;
        }

        Some(dot / (norm_a * norm_b))
    }

    /// Most similar annotations first, ties broken by id. Annotations without a comparable
    /// embedding are left out.
    pub fn rank(&self, annotations: Vec<Annotation>, query: &[f32], limit: usize) -> Vec<Scored> {
        let mut scored: Vec<Scored> = annotations
            .into_iter()
            .filter_map(|annotation| {
                let score = Self::cosine(annotation.embedding.as_deref()?, query)?;
                Some(Scored { annotation, score })
            })
            .collect();

        scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.annotation.id.cmp(&b.annotation.id),
            ordering => ordering,
        });
        scored.truncate(limit);
        scored
    }
}

/// Annotation queries delegating to one strategy per concern.
#[derive(Clone, Debug)]
pub struct AnnotationRepository<S> {
    tree: TreeLookup<S>,
    permissions: PermissionFilter<S>,
    similarity: SimilaritySearch,
    config: RepositoryConfig,
}

impl<S> AnnotationRepository<S>
where
    S: PermissionStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        Self {
            tree: TreeLookup::new(store.clone()),
            permissions: PermissionFilter::new(PermissionEngine::new(store)),
            similarity: SimilaritySearch::new(),
            config,
        }
    }

    /// Annotations of a document and optional corpus visible to the principal.
    pub async fn visible(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
        filters: &ResolveFilters,
    ) -> Result<Resolved<Annotation>, AuthError<S::Error>> {
        self.permissions
            .visible(ctx, principal, document_id, corpus_id, filters)
            .await
    }

    /// Visible annotations below the given one, nearest first.
    ///
    /// Nothing is returned when the principal can't read the annotation itself.
    pub async fn visible_tree(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        annotation_id: &ObjectId,
    ) -> Result<Vec<Annotation>, AuthError<S::Error>> {
        if !self.is_visible(ctx, principal, annotation_id).await? {
            return Ok(Vec::new());
        }

        let descendants = self
            .tree
            .descendants(annotation_id)
            .await
            .map_err(AuthError::Store)?;
        self.permissions.retain(ctx, principal, &descendants).await
    }

    /// Visible annotations above the given one, nearest first.
    ///
    /// Nothing is returned when the principal can't read the annotation itself.
    pub async fn visible_ancestors(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        annotation_id: &ObjectId,
    ) -> Result<Vec<Annotation>, AuthError<S::Error>> {
        if !self.is_visible(ctx, principal, annotation_id).await? {
            return Ok(Vec::new());
        }

        let ancestors = self
            .tree
            .ancestors(annotation_id)
            .await
            .map_err(AuthError::Store)?;
        self.permissions.retain(ctx, principal, &ancestors).await
    }

    /// Visible annotations of a document and optional corpus ranked by similarity to the query
    /// vector.
    ///
    /// Falls back to the configured limit when `limit` is `None`.
    pub async fn similar(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
        query: &[f32],
        limit: Option<usize>,
    ) -> Result<Vec<Scored>, AuthError<S::Error>> {
        let visible = self
            .permissions
            .visible(ctx, principal, document_id, corpus_id, &ResolveFilters::default())
            .await?;
        Ok(self.similarity.rank(
            visible.rows,
            query,
            limit.unwrap_or(self.config.similarity_limit),
        ))
    }

    async fn is_visible(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        annotation_id: &ObjectId,
    ) -> Result<bool, AuthError<S::Error>> {
        let retained = self
            .permissions
            .retain(ctx, principal, std::slice::from_ref(annotation_id))
            .await?;
        Ok(!retained.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use marginalia_core::Annotation;

    use super::SimilaritySearch;

    #[test]
    fn cosine_similarity() {
        assert_eq!(SimilaritySearch::cosine(&[1.0, 0.0], &[2.0, 0.0]), Some(1.0));
        assert_eq!(SimilaritySearch::cosine(&[1.0, 0.0], &[0.0, 3.0]), Some(0.0));
        assert_eq!(SimilaritySearch::cosine(&[1.0, 0.0], &[-1.0, 0.0]), Some(-1.0));
        assert_eq!(SimilaritySearch::cosine(&[1.0, 0.0], &[1.0]), None);
        assert_eq!(SimilaritySearch::cosine(&[0.0, 0.0], &[1.0, 1.0]), None);
    }

    #[test]
    fn rank_by_similarity() {
        let annotations = vec![
            Annotation::new(1, 1, 1).with_embedding(vec![0.0, 1.0]),
            Annotation::new(2, 1, 1).with_embedding(vec![1.0, 0.0]),
            Annotation::new(3, 1, 1),
            Annotation::new(4, 1, 1).with_embedding(vec![1.0, 1.0]),
            Annotation::new(5, 1, 1).with_embedding(vec![3.0, 0.0]),
        ];

        let ranked = SimilaritySearch::new().rank(annotations, &[1.0, 0.0], 3);
        let ids: Vec<u64> = ranked
            .iter()
            .map(|scored| scored.annotation.id.as_u64())
            .collect();

        // Equal scores are ordered by id, annotations without embedding are skipped.
        assert_eq!(ids, vec![2, 5, 4]);
    }
}
