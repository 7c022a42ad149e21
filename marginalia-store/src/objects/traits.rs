// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Analysis, Annotation, Corpus, Document, Extract, ObjectId, Relationship};

use crate::traits::Store;

/// Interface for storing and querying domain objects.
///
/// Only fields relevant to permission evaluation are persisted here, the document contents,
/// labels and text extraction results live elsewhere. All insert methods return `true` when the
/// insert occurred, or `false` when an object with the same id already existed. Inserts must
/// happen inside a transaction.
pub trait ObjectStore: Store {
    fn document(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Option<Document>, Self::Error>>;

    fn corpus(&self, id: &ObjectId) -> impl Future<Output = Result<Option<Corpus>, Self::Error>>;

    fn analysis(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Option<Analysis>, Self::Error>>;

    fn extract(&self, id: &ObjectId) -> impl Future<Output = Result<Option<Extract>, Self::Error>>;

    fn annotation(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Option<Annotation>, Self::Error>>;

    fn relationship(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>>;

    fn insert_document(
        &self,
        document: &Document,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    fn insert_corpus(&self, corpus: &Corpus) -> impl Future<Output = Result<bool, Self::Error>>;

    fn insert_analysis(
        &self,
        analysis: &Analysis,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    fn insert_extract(&self, extract: &Extract) -> impl Future<Output = Result<bool, Self::Error>>;

    fn insert_annotation(
        &self,
        annotation: &Annotation,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    fn insert_relationship(
        &self,
        relationship: &Relationship,
    ) -> impl Future<Output = Result<bool, Self::Error>>;
}
