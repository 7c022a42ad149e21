// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use marginalia_core::{
    Analysis, Annotation, Corpus, Document, Extract, ObjectId, Relationship, ScopedObject,
};

use crate::memory::{MemoryStore, MemoryStoreError, check_ids};
use crate::objects::ObjectStore;

fn insert_new<T: Clone>(map: &mut BTreeMap<ObjectId, T>, id: ObjectId, value: &T) -> bool {
    match map.entry(id) {
        Entry::Vacant(entry) => {
            entry.insert(value.clone());
            true
        }
        Entry::Occupied(_) => false,
    }
}

/// Identifiers a scoped object references, all of them need to be storable.
fn scoped_ids<T: ScopedObject>(object: &T) -> Vec<u64> {
    let origin = object.origin();
    [
        Some(object.id()),
        Some(object.document_id()),
        object.corpus_id(),
    ]
    .into_iter()
    .chain([origin.analysis_id(), origin.extract_id()])
    .flatten()
    .map(|id| id.as_u64())
    .chain([object.creator().as_u64()])
    .collect()
}

impl ObjectStore for MemoryStore {
    async fn document(&self, id: &ObjectId) -> Result<Option<Document>, MemoryStoreError> {
        Ok(self.read_store().documents.get(id).cloned())
    }

    async fn corpus(&self, id: &ObjectId) -> Result<Option<Corpus>, MemoryStoreError> {
        Ok(self.read_store().corpora.get(id).cloned())
    }

    async fn analysis(&self, id: &ObjectId) -> Result<Option<Analysis>, MemoryStoreError> {
        Ok(self.read_store().analyses.get(id).cloned())
    }

    async fn extract(&self, id: &ObjectId) -> Result<Option<Extract>, MemoryStoreError> {
        Ok(self.read_store().extracts.get(id).cloned())
    }

    async fn annotation(&self, id: &ObjectId) -> Result<Option<Annotation>, MemoryStoreError> {
        Ok(self.read_store().annotations.get(id).cloned())
    }

    async fn relationship(&self, id: &ObjectId) -> Result<Option<Relationship>, MemoryStoreError> {
        Ok(self.read_store().relationships.get(id).cloned())
    }

    async fn insert_document(&self, document: &Document) -> Result<bool, MemoryStoreError> {
        check_ids([document.id.as_u64(), document.creator.as_u64()])?;
        self.stage(|inner| insert_new(&mut inner.documents, document.id, document))
    }

    async fn insert_corpus(&self, corpus: &Corpus) -> Result<bool, MemoryStoreError> {
        check_ids([corpus.id.as_u64(), corpus.creator.as_u64()])?;
        self.stage(|inner| insert_new(&mut inner.corpora, corpus.id, corpus))
    }

    async fn insert_analysis(&self, analysis: &Analysis) -> Result<bool, MemoryStoreError> {
        check_ids([analysis.id.as_u64(), analysis.creator.as_u64()])?;
        self.stage(|inner| insert_new(&mut inner.analyses, analysis.id, analysis))
    }

    async fn insert_extract(&self, extract: &Extract) -> Result<bool, MemoryStoreError> {
        check_ids([extract.id.as_u64(), extract.creator.as_u64()])?;
        self.stage(|inner| insert_new(&mut inner.extracts, extract.id, extract))
    }

    async fn insert_annotation(&self, annotation: &Annotation) -> Result<bool, MemoryStoreError> {
        check_ids(
            scoped_ids(annotation)
                .into_iter()
                .chain(annotation.parent_id.map(|id| id.as_u64())),
        )?;
        self.stage(|inner| insert_new(&mut inner.annotations, annotation.id, annotation))
    }

    async fn insert_relationship(
        &self,
        relationship: &Relationship,
    ) -> Result<bool, MemoryStoreError> {
        check_ids(
            scoped_ids(relationship)
                .into_iter()
                .chain(relationship.annotation_ids().map(|id| id.as_u64())),
        )?;
        self.stage(|inner| insert_new(&mut inner.relationships, relationship.id, relationship))
    }
}
