// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission resolution for documents, corpora and everything annotated on them.
//!
//! Decides which capabilities (read, create, update, delete, comment, publish) a principal holds
//! on any object and projects these decisions onto bulk queries over annotations and
//! relationships. Several policies are composed into one decision:
//!
//! 1. Ownership, the public flag and explicit grants on base objects (`resolver`)
//! 2. Document and corpus capabilities intersected for everything scoped to them (`composer`)
//! 3. Structural objects which are never writable and objects exclusively owned by an analysis
//!    or extract (`privacy`)
//! 4. Corpus-level relaxation of the comment capability (`comment`)
//!
//! The `PermissionEngine` is the entry point. It holds no cache, every evaluation reads the
//! current grants from the store. Callers pass a `RequestContext` which memoizes composed
//! capabilities for the duration of a single request.
//!
//! ## Example
//!
//! ```rust
//! # use marginalia_auth::{PermissionEngine, RequestContext, ResolveFilters};
//! # use marginalia_core::{Annotation, Corpus, Document, ObjectId, ObjectRef, Principal};
//! # use marginalia_store::{MemoryStore, ObjectStore, Transaction};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//!
//! let permit = store.begin().await.unwrap();
//! store.insert_document(&Document::new(1, 10)).await.unwrap();
//! store.insert_corpus(&Corpus::new(2, 10)).await.unwrap();
//! store
//!     .insert_annotation(&Annotation::new(3, 1, 10).in_corpus(2))
//!     .await
//!     .unwrap();
//! store.commit(permit).await.unwrap();
//!
//! let engine = PermissionEngine::new(store);
//! let owner = Principal::user(10);
//! let reader = Principal::user(20);
//!
//! for object in [ObjectRef::document(1), ObjectRef::corpus(2)] {
//!     engine
//!         .grant_tokens(&owner, &reader.id, &object, ["read"])
//!         .await
//!         .unwrap();
//! }
//!
//! let mut ctx = RequestContext::new();
//! let resolved = engine
//!     .resolve_annotations(
//!         &mut ctx,
//!         &reader,
//!         &ObjectId::new(1),
//!         Some(&ObjectId::new(2)),
//!         &ResolveFilters::default(),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(resolved.rows.len(), 1);
//! assert_eq!(resolved.capabilities.tokens(), vec!["read"]);
//! # }
//! ```
pub mod comment;
pub mod composer;
pub mod context;
pub mod engine;
pub mod error;
pub mod filters;
pub mod privacy;
pub mod projector;
pub mod repository;
pub mod resolver;

pub use comment::CommentPolicy;
pub use composer::{Composition, effective_permissions};
pub use context::RequestContext;
pub use engine::{PermissionEngine, PermissionStore};
pub use error::{AuthError, MutationOutcome};
pub use filters::{NO_OWNER, ResolveFilters};
pub use privacy::{OwnerCache, PrivacyScope};
pub use projector::{CapabilityDescriptor, Resolved};
pub use repository::{
    AnnotationRepository, PermissionFilter, RepositoryConfig, Scored, SimilaritySearch,
    TreeLookup,
};
pub use resolver::{base_capabilities, can};
