// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain objects the permission engine reasons about.
//!
//! Objects fall into two categories. _Base objects_ (documents, corpora, analyses and extracts)
//! carry their own creator and public flag, their capabilities are computed directly from
//! ownership, visibility and explicit grants. _Scoped objects_ (annotations and relationships)
//! live inside a document and optionally a corpus and inherit their capabilities from both.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::CapabilityError;
use crate::identity::{ObjectId, PrincipalId};

/// Taxonomy of all objects known to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Document,
    Corpus,
    Analysis,
    Extract,
    Annotation,
    Relationship,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Document,
        ObjectKind::Corpus,
        ObjectKind::Analysis,
        ObjectKind::Extract,
        ObjectKind::Annotation,
        ObjectKind::Relationship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Document => "document",
            ObjectKind::Corpus => "corpus",
            ObjectKind::Analysis => "analysis",
            ObjectKind::Extract => "extract",
            ObjectKind::Annotation => "annotation",
            ObjectKind::Relationship => "relationship",
        }
    }

    /// Returns `true` for kinds whose capabilities are computed directly from ownership,
    /// visibility and grants.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            ObjectKind::Document | ObjectKind::Corpus | ObjectKind::Analysis | ObjectKind::Extract
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = ReferenceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ReferenceError::UnknownKind(value.to_string()))
    }
}

/// Typed reference to a single object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<ObjectId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn document(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Document, id)
    }

    pub fn corpus(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Corpus, id)
    }

    pub fn analysis(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Analysis, id)
    }

    pub fn extract(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Extract, id)
    }

    pub fn annotation(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Annotation, id)
    }

    pub fn relationship(id: impl Into<ObjectId>) -> Self {
        Self::new(ObjectKind::Relationship, id)
    }

    /// Parse a caller-supplied reference to an object of the expected kind.
    ///
    /// Accepts a bare decimal identifier (`"12"`) or a kind-qualified one (`"analysis:12"`).
    /// Qualified references naming another kind are rejected.
    pub fn parse(expected: ObjectKind, value: &str) -> Result<Self, ReferenceError> {
        let value = value.trim();

        let id = match value.split_once(':') {
            Some((kind, id)) => {
                let kind: ObjectKind = kind.parse()?;
                if kind != expected {
                    return Err(ReferenceError::KindMismatch {
                        expected,
                        found: kind,
                    });
                }
                id
            }
            None => value,
        };

        let id = id
            .parse::<ObjectId>()
            .map_err(|_| ReferenceError::Malformed(value.to_string()))?;

        Ok(Self::new(expected, id))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("'{0}' is not a valid object reference")]
    Malformed(String),

    #[error("unknown object kind '{0}'")]
    UnknownKind(String),

    #[error("expected reference to {expected}, found {found}")]
    KindMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },
}

/// Interface of top-level objects whose capabilities are computed directly.
pub trait BaseObject {
    fn kind(&self) -> ObjectKind;

    fn id(&self) -> ObjectId;

    fn creator(&self) -> PrincipalId;

    fn is_public(&self) -> bool;

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), self.id())
    }
}

macro_rules! base_object {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub id: ObjectId,
            pub creator: PrincipalId,
            pub is_public: bool,
        }

        impl $name {
            /// Private object owned by the given creator.
            pub fn new(id: impl Into<ObjectId>, creator: impl Into<PrincipalId>) -> Self {
                Self {
                    id: id.into(),
                    creator: creator.into(),
                    is_public: false,
                }
            }

            /// Mark object as publicly readable.
            pub fn public(mut self) -> Self {
                self.is_public = true;
                self
            }
        }

        impl BaseObject for $name {
            fn kind(&self) -> ObjectKind {
                $kind
            }

            fn id(&self) -> ObjectId {
                self.id
            }

            fn creator(&self) -> PrincipalId {
                self.creator
            }

            fn is_public(&self) -> bool {
                self.is_public
            }
        }
    };
}

base_object!(
    /// Uploaded document, the root every annotation and relationship hangs off.
    Document,
    ObjectKind::Document
);

base_object!(
    /// Result of an automated analyzer run over a corpus.
    Analysis,
    ObjectKind::Analysis
);

base_object!(
    /// Structured data extraction over a set of documents.
    Extract,
    ObjectKind::Extract
);

/// Collection of documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub id: ObjectId,
    pub creator: PrincipalId,
    pub is_public: bool,

    /// Anyone who can read an object in this corpus may also comment on it.
    pub allow_comments: bool,
}

impl Corpus {
    pub fn new(id: impl Into<ObjectId>, creator: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            creator: creator.into(),
            is_public: false,
            allow_comments: false,
        }
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn allow_comments(mut self) -> Self {
        self.allow_comments = true;
        self
    }
}

impl BaseObject for Corpus {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Corpus
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn creator(&self) -> PrincipalId {
        self.creator
    }

    fn is_public(&self) -> bool {
        self.is_public
    }
}

/// Object which exclusively owns a scoped object, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "id")]
pub enum Origin {
    /// Created by a user, no privacy scoping applies.
    #[default]
    Plain,

    /// Exclusively owned by an analysis.
    Analysis(ObjectId),

    /// Exclusively owned by an extract.
    Extract(ObjectId),
}

impl Origin {
    /// Build the origin from the two nullable "created by" fields.
    ///
    /// At most one of them can be set. Both being present is a misconfiguration which is rejected
    /// and never resolved by picking one side.
    pub fn from_fields(
        created_by_analysis_id: Option<ObjectId>,
        created_by_extract_id: Option<ObjectId>,
    ) -> Result<Self, MisconfigurationError> {
        match (created_by_analysis_id, created_by_extract_id) {
            (None, None) => Ok(Origin::Plain),
            (Some(analysis_id), None) => Ok(Origin::Analysis(analysis_id)),
            (None, Some(extract_id)) => Ok(Origin::Extract(extract_id)),
            (Some(analysis_id), Some(extract_id)) => Err(MisconfigurationError::ConflictingOrigin {
                analysis_id,
                extract_id,
            }),
        }
    }

    pub fn analysis_id(&self) -> Option<ObjectId> {
        match self {
            Origin::Analysis(id) => Some(*id),
            _ => None,
        }
    }

    pub fn extract_id(&self) -> Option<ObjectId> {
        match self {
            Origin::Extract(id) => Some(*id),
            _ => None,
        }
    }

    /// Reference to the owning object, `None` for plain objects.
    pub fn owner(&self) -> Option<ObjectRef> {
        match self {
            Origin::Plain => None,
            Origin::Analysis(id) => Some(ObjectRef::analysis(*id)),
            Origin::Extract(id) => Some(ObjectRef::extract(*id)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MisconfigurationError {
    #[error("object can't be owned by analysis {analysis_id} and extract {extract_id} at once")]
    ConflictingOrigin {
        analysis_id: ObjectId,
        extract_id: ObjectId,
    },

    #[error("can't grant unknown capability: {0}")]
    UnknownCapability(#[from] CapabilityError),

    #[error("grants can only be assigned on documents, corpora, analyses or extracts, not {0}")]
    GrantOnScopedObject(ObjectRef),
}

/// Interface of objects living inside a document and an optional corpus.
pub trait ScopedObject {
    fn kind(&self) -> ObjectKind;

    fn id(&self) -> ObjectId;

    fn document_id(&self) -> ObjectId;

    /// Corpus the object belongs to. Objects without a corpus are only visible when structural.
    fn corpus_id(&self) -> Option<ObjectId>;

    /// System-generated objects which are never writable through ordinary grants.
    fn structural(&self) -> bool;

    fn creator(&self) -> PrincipalId;

    fn origin(&self) -> Origin;

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), self.id())
    }
}

/// Labelled span on a document page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: ObjectId,
    pub document_id: ObjectId,
    pub corpus_id: Option<ObjectId>,
    pub page: u32,

    /// Parent annotation in the annotation tree.
    pub parent_id: Option<ObjectId>,
    pub structural: bool,
    pub creator: PrincipalId,
    pub origin: Origin,

    /// Vector embedding used for similarity search.
    pub embedding: Option<Vec<f32>>,
}

impl Annotation {
    pub fn new(
        id: impl Into<ObjectId>,
        document_id: impl Into<ObjectId>,
        creator: impl Into<PrincipalId>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            corpus_id: None,
            page: 1,
            parent_id: None,
            structural: false,
            creator: creator.into(),
            origin: Origin::Plain,
            embedding: None,
        }
    }

    pub fn in_corpus(mut self, corpus_id: impl Into<ObjectId>) -> Self {
        self.corpus_id = Some(corpus_id.into());
        self
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<ObjectId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn structural(mut self) -> Self {
        self.structural = true;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

impl ScopedObject for Annotation {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Annotation
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn document_id(&self) -> ObjectId {
        self.document_id
    }

    fn corpus_id(&self) -> Option<ObjectId> {
        self.corpus_id
    }

    fn structural(&self) -> bool {
        self.structural
    }

    fn creator(&self) -> PrincipalId {
        self.creator
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}

/// Directed link between two groups of annotations within one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: ObjectId,
    pub document_id: ObjectId,
    pub corpus_id: Option<ObjectId>,
    pub structural: bool,
    pub creator: PrincipalId,
    pub origin: Origin,
    pub source_ids: Vec<ObjectId>,
    pub target_ids: Vec<ObjectId>,
}

impl Relationship {
    pub fn new(
        id: impl Into<ObjectId>,
        document_id: impl Into<ObjectId>,
        creator: impl Into<PrincipalId>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            corpus_id: None,
            structural: false,
            creator: creator.into(),
            origin: Origin::Plain,
            source_ids: Vec::new(),
            target_ids: Vec::new(),
        }
    }

    pub fn in_corpus(mut self, corpus_id: impl Into<ObjectId>) -> Self {
        self.corpus_id = Some(corpus_id.into());
        self
    }

    pub fn structural(mut self) -> Self {
        self.structural = true;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn link(mut self, source_ids: Vec<ObjectId>, target_ids: Vec<ObjectId>) -> Self {
        self.source_ids = source_ids;
        self.target_ids = target_ids;
        self
    }

    /// All annotations taking part in this relationship, sources first.
    pub fn annotation_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.source_ids.iter().chain(self.target_ids.iter())
    }
}

impl ScopedObject for Relationship {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Relationship
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn document_id(&self) -> ObjectId {
        self.document_id
    }

    fn corpus_id(&self) -> Option<ObjectId> {
        self.corpus_id
    }

    fn structural(&self) -> bool {
        self.structural
    }

    fn creator(&self) -> PrincipalId {
        self.creator
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use crate::identity::ObjectId;

    use super::{MisconfigurationError, ObjectKind, ObjectRef, Origin, ReferenceError};

    #[test]
    fn parse_references() {
        assert_eq!(
            ObjectRef::parse(ObjectKind::Analysis, "12"),
            Ok(ObjectRef::analysis(12))
        );
        assert_eq!(
            ObjectRef::parse(ObjectKind::Analysis, " analysis:7 "),
            Ok(ObjectRef::analysis(7))
        );

        assert!(matches!(
            ObjectRef::parse(ObjectKind::Analysis, "extract:7"),
            Err(ReferenceError::KindMismatch {
                expected: ObjectKind::Analysis,
                found: ObjectKind::Extract
            })
        ));
        assert!(matches!(
            ObjectRef::parse(ObjectKind::Extract, "QW5hbHlzaXNUeXBlOjE="),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            ObjectRef::parse(ObjectKind::Extract, "-1"),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            ObjectRef::parse(ObjectKind::Extract, "spreadsheet:1"),
            Err(ReferenceError::UnknownKind(_))
        ));
        assert!(ObjectRef::parse(ObjectKind::Document, "").is_err());
    }

    #[test]
    fn origin_is_exclusive() {
        let analysis = ObjectId::new(3);
        let extract = ObjectId::new(4);

        assert_eq!(Origin::from_fields(None, None), Ok(Origin::Plain));
        assert_eq!(
            Origin::from_fields(Some(analysis), None),
            Ok(Origin::Analysis(analysis))
        );
        assert_eq!(
            Origin::from_fields(None, Some(extract)),
            Ok(Origin::Extract(extract))
        );
        assert_eq!(
            Origin::from_fields(Some(analysis), Some(extract)),
            Err(MisconfigurationError::ConflictingOrigin {
                analysis_id: analysis,
                extract_id: extract,
            })
        );

        assert_eq!(Origin::Analysis(analysis).owner(), Some(ObjectRef::analysis(3)));
        assert_eq!(Origin::Plain.owner(), None);
    }
}
