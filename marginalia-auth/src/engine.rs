// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for permission evaluation and grant delegation.
use marginalia_core::{
    Analysis, Annotation, BaseObject, Capability, CapabilitySet, Corpus, Document, Extract,
    MisconfigurationError, ObjectId, ObjectKind, ObjectRef, Principal, PrincipalId, Relationship,
    ScopedObject,
};
use marginalia_store::{GrantStore, ObjectStore, ScopedRows, Transaction, TreeStore};
use tracing::{debug, info};

use crate::comment::CommentPolicy;
use crate::context::RequestContext;
use crate::error::{AuthError, MutationOutcome};
use crate::filters::ResolveFilters;
use crate::privacy::{OwnerCache, PrivacyScope, privacy_scope};
use crate::projector::{Resolved, resolve};
use crate::resolver::base_capabilities;

/// Every store interface the engine reads from or writes to.
pub trait PermissionStore:
    GrantStore
    + ObjectStore
    + ScopedRows<Annotation>
    + ScopedRows<Relationship>
    + TreeStore
    + Transaction
{
}

impl<S> PermissionStore for S where
    S: GrantStore
        + ObjectStore
        + ScopedRows<Annotation>
        + ScopedRows<Relationship>
        + TreeStore
        + Transaction
{
}

/// Base object loaded by kind, held across store calls while evaluating or delegating.
#[derive(Clone, Debug)]
enum BaseRecord {
    Document(Document),
    Corpus(Corpus),
    Analysis(Analysis),
    Extract(Extract),
}

impl BaseRecord {
    fn as_base(&self) -> &dyn BaseObject {
        match self {
            BaseRecord::Document(document) => document,
            BaseRecord::Corpus(corpus) => corpus,
            BaseRecord::Analysis(analysis) => analysis,
            BaseRecord::Extract(extract) => extract,
        }
    }
}

impl BaseObject for BaseRecord {
    fn kind(&self) -> ObjectKind {
        self.as_base().kind()
    }

    fn id(&self) -> ObjectId {
        self.as_base().id()
    }

    fn creator(&self) -> PrincipalId {
        self.as_base().creator()
    }

    fn is_public(&self) -> bool {
        self.as_base().is_public()
    }
}

#[derive(Clone, Copy, Debug)]
enum GrantChange {
    Grant,
    Revoke,
}

/// Permission resolution engine.
///
/// The engine holds no state besides the store handle, grants are evaluated fresh on every call.
/// Memoization only ever happens inside the `RequestContext` callers pass in for the duration of
/// one request.
#[derive(Clone, Debug)]
pub struct PermissionEngine<S> {
    store: S,
}

impl<S> PermissionEngine<S>
where
    S: PermissionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Capabilities of the principal on everything scoped to the document and optional corpus.
    pub async fn effective_permissions(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
    ) -> Result<CapabilitySet, AuthError<S::Error>> {
        let composition = ctx
            .composition(&self.store, principal, document_id, corpus_id)
            .await
            .map_err(AuthError::Store)?;
        Ok(composition.capabilities)
    }

    /// Annotations of a document and optional corpus visible to the principal.
    pub async fn resolve_annotations(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
        filters: &ResolveFilters,
    ) -> Result<Resolved<Annotation>, AuthError<S::Error>> {
        resolve(&self.store, ctx, principal, document_id, corpus_id, filters).await
    }

    /// Relationships of a document and optional corpus visible to the principal.
    ///
    /// A page filter matches relationships linking at least one annotation on these pages.
    pub async fn resolve_relationships(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        document_id: &ObjectId,
        corpus_id: Option<&ObjectId>,
        filters: &ResolveFilters,
    ) -> Result<Resolved<Relationship>, AuthError<S::Error>> {
        resolve(&self.store, ctx, principal, document_id, corpus_id, filters).await
    }

    /// Capabilities of the principal on a single object of any kind.
    ///
    /// Unlike bulk descriptors this accounts for the structural and privacy overlays of the
    /// object itself. Fails with `NotFound` if the object does not exist.
    pub async fn capabilities_for(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        object: &ObjectRef,
    ) -> Result<CapabilitySet, AuthError<S::Error>> {
        match object.kind {
            ObjectKind::Annotation => {
                let annotation = self
                    .store
                    .annotation(&object.id)
                    .await
                    .map_err(AuthError::Store)?
                    .ok_or(AuthError::NotFound(*object))?;
                self.scoped_capabilities(ctx, principal, &annotation, &mut OwnerCache::new())
                    .await
                    .map_err(AuthError::Store)
            }
            ObjectKind::Relationship => {
                let relationship = self
                    .store
                    .relationship(&object.id)
                    .await
                    .map_err(AuthError::Store)?
                    .ok_or(AuthError::NotFound(*object))?;
                self.scoped_capabilities(ctx, principal, &relationship, &mut OwnerCache::new())
                    .await
                    .map_err(AuthError::Store)
            }
            _ => {
                let base = self
                    .base_object(object)
                    .await
                    .map_err(AuthError::Store)?
                    .ok_or(AuthError::NotFound(*object))?;
                base_capabilities(&self.store, principal, &base)
                    .await
                    .map_err(AuthError::Store)
            }
        }
    }

    /// Returns `true` if the principal may perform the mutation on the object.
    ///
    /// Objects which don't exist can't be mutated.
    pub async fn can_mutate(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        object: &ObjectRef,
        capability: Capability,
    ) -> Result<bool, AuthError<S::Error>> {
        match self.capabilities_for(ctx, principal, object).await {
            Ok(capabilities) => Ok(capabilities.contains(capability)),
            Err(err) if err.is_fail_closed() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Check a mutation and report the result in a structured form.
    ///
    /// Missing objects and missing capabilities are reported with `ok = false`, only store
    /// failures are returned as errors.
    pub async fn authorize(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        object: &ObjectRef,
        capability: Capability,
    ) -> Result<MutationOutcome, AuthError<S::Error>> {
        let result = match self.capabilities_for(ctx, principal, object).await {
            Ok(capabilities) if capabilities.contains(capability) => Ok(()),
            Ok(_) => Err(AuthError::PermissionDenied {
                principal: principal.id,
                object: *object,
                capability,
            }),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => Ok(MutationOutcome::success()),
            Err(err) if err.is_fail_closed() => {
                debug!(%principal, %object, %capability, %err, "mutation denied");
                Ok(MutationOutcome::failure(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Grant capabilities on a base object to a principal.
    ///
    /// Only superusers and the creator of the object may delegate. Returns `true` if any
    /// capability was newly granted.
    pub async fn grant(
        &self,
        actor: &Principal,
        grantee: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, AuthError<S::Error>> {
        self.change_grants(GrantChange::Grant, actor, grantee, object, capabilities)
            .await
    }

    /// Revoke capabilities on a base object from a principal.
    ///
    /// The same delegation rules as for `grant` apply. Returns `true` if any capability was
    /// removed. Revocations take effect on the very next evaluation.
    pub async fn revoke(
        &self,
        actor: &Principal,
        grantee: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, AuthError<S::Error>> {
        self.change_grants(GrantChange::Revoke, actor, grantee, object, capabilities)
            .await
    }

    /// Grant capabilities given as lowercase tokens, unknown tokens are a misconfiguration.
    pub async fn grant_tokens<I, T>(
        &self,
        actor: &Principal,
        grantee: &PrincipalId,
        object: &ObjectRef,
        tokens: I,
    ) -> Result<bool, AuthError<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let capabilities = CapabilitySet::from_tokens(tokens).map_err(MisconfigurationError::from)?;
        self.grant(actor, grantee, object, capabilities).await
    }

    /// Revoke capabilities given as lowercase tokens, unknown tokens are a misconfiguration.
    pub async fn revoke_tokens<I, T>(
        &self,
        actor: &Principal,
        grantee: &PrincipalId,
        object: &ObjectRef,
        tokens: I,
    ) -> Result<bool, AuthError<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let capabilities = CapabilitySet::from_tokens(tokens).map_err(MisconfigurationError::from)?;
        self.revoke(actor, grantee, object, capabilities).await
    }

    /// Capabilities on a scoped object, including privacy and comment overlays.
    pub(crate) async fn scoped_capabilities<T>(
        &self,
        ctx: &mut RequestContext,
        principal: &Principal,
        object: &T,
        owners: &mut OwnerCache,
    ) -> Result<CapabilitySet, S::Error>
    where
        T: ScopedObject,
    {
        let document_id = object.document_id();
        let corpus_id = object.corpus_id();
        let composition = ctx
            .composition(&self.store, principal, &document_id, corpus_id.as_ref())
            .await?;

        let scope = privacy_scope(
            &self.store,
            principal,
            composition.capabilities,
            object,
            owners,
        )
        .await?;

        Ok(match scope {
            PrivacyScope::Excluded => CapabilitySet::empty(),
            PrivacyScope::Visible(capabilities) => {
                CommentPolicy::new(composition.allow_comments).apply(principal, capabilities)
            }
        })
    }

    async fn base_object(&self, object: &ObjectRef) -> Result<Option<BaseRecord>, S::Error> {
        let base = match object.kind {
            ObjectKind::Document => self
                .store
                .document(&object.id)
                .await?
                .map(BaseRecord::Document),
            ObjectKind::Corpus => self.store.corpus(&object.id).await?.map(BaseRecord::Corpus),
            ObjectKind::Analysis => self
                .store
                .analysis(&object.id)
                .await?
                .map(BaseRecord::Analysis),
            ObjectKind::Extract => self
                .store
                .extract(&object.id)
                .await?
                .map(BaseRecord::Extract),
            ObjectKind::Annotation | ObjectKind::Relationship => None,
        };
        Ok(base)
    }

    async fn change_grants(
        &self,
        change: GrantChange,
        actor: &Principal,
        grantee: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, AuthError<S::Error>> {
        if !object.kind.is_base() {
            return Err(MisconfigurationError::GrantOnScopedObject(*object).into());
        }

        // All reads happen before the transaction begins, some backends can't read committed
        // state while a write transaction is held.
        let base = self
            .base_object(object)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::NotFound(*object))?;

        let delegating = actor.is_superuser || actor.is(&base.creator());
        if !delegating {
            return Err(AuthError::DelegationDenied {
                principal: actor.id,
                object: *object,
            });
        }

        let permit = self.store.begin().await.map_err(AuthError::Store)?;
        let result = match change {
            GrantChange::Grant => self.store.write_grants(grantee, object, capabilities).await,
            GrantChange::Revoke => self.store.revoke(grantee, object, capabilities).await,
        };

        match result {
            Ok(changed) => {
                self.store.commit(permit).await.map_err(AuthError::Store)?;
                info!(
                    ?change,
                    %actor,
                    %grantee,
                    %object,
                    %capabilities,
                    changed,
                    "grants changed"
                );
                Ok(changed)
            }
            Err(err) => {
                self.store.rollback(permit).await.map_err(AuthError::Store)?;
                Err(AuthError::Store(err))
            }
        }
    }
}
