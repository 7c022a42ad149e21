// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Annotation, Relationship};

use crate::memory::{MemoryStore, MemoryStoreError};
use crate::rows::{RowQuery, ScopedRows};

impl ScopedRows<Annotation> for MemoryStore {
    async fn select(&self, query: &RowQuery) -> Result<Vec<Annotation>, MemoryStoreError> {
        let store = self.read_store();
        Ok(store
            .annotations
            .values()
            .filter(|annotation| query.matches(*annotation))
            .filter(|annotation| match &query.pages {
                Some(pages) => pages.contains(&annotation.page),
                None => true,
            })
            .cloned()
            .collect())
    }
}

impl ScopedRows<Relationship> for MemoryStore {
    async fn select(&self, query: &RowQuery) -> Result<Vec<Relationship>, MemoryStoreError> {
        let store = self.read_store();
        let mut result = Vec::new();

        for relationship in store.relationships.values() {
            if !query.matches(relationship) {
                continue;
            }

            let Some(pages) = &query.pages else {
                result.push(relationship.clone());
                continue;
            };

            // Emit the relationship once per linked annotation on a matching page, like a join
            // over the link table would.
            for annotation_id in relationship.annotation_ids() {
                let on_page = store
                    .annotations
                    .get(annotation_id)
                    .is_some_and(|annotation| pages.contains(&annotation.page));
                if on_page {
                    result.push(relationship.clone());
                }
            }
        }

        Ok(result)
    }
}
