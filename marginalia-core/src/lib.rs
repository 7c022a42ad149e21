// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types shared by all marginalia crates: identifiers, principals, the closed capability
//! model and the documents, corpora, analyses, extracts, annotations and relationships the
//! permission engine reasons about.
pub mod capability;
pub mod cbor;
pub mod identity;
pub mod object;

pub use capability::{Capability, CapabilityError, CapabilitySet};
pub use identity::{ObjectId, Principal, PrincipalId};
pub use object::{
    Analysis, Annotation, BaseObject, Corpus, Document, Extract, MisconfigurationError,
    ObjectKind, ObjectRef, Origin, ReferenceError, Relationship, ScopedObject,
};
