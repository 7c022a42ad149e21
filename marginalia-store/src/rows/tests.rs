// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Annotation, ObjectId, Origin, Relationship};

use crate::assert_all_stores;
use crate::objects::ObjectStore;
use crate::rows::{CorpusScope, OwnerFilter, RowQuery, ScopedRows};
use crate::traits::Transaction;

fn ids<T>(rows: &[T], id: impl Fn(&T) -> ObjectId) -> Vec<u64> {
    rows.iter().map(|row| id(row).as_u64()).collect()
}

/// Fixture shared by all row tests.
///
/// Document 1 with corpus 10 and corpus 20:
/// - 1: corpus 10, page 1
/// - 2: corpus 10, page 2, created by analysis 5
/// - 3: corpus 10, page 2, created by extract 6
/// - 4: structural without corpus, page 1
/// - 5: corpus 20, page 1
/// - 6: structural in corpus 20, page 3
/// - 7: other document, corpus 10
const ANNOTATIONS: [(u64, u64, Option<u64>, u32, bool, Origin); 7] = [
    (1, 1, Some(10), 1, false, Origin::Plain),
    (2, 1, Some(10), 2, false, Origin::Analysis(ObjectId::new(5))),
    (3, 1, Some(10), 2, false, Origin::Extract(ObjectId::new(6))),
    (4, 1, None, 1, true, Origin::Plain),
    (5, 1, Some(20), 1, false, Origin::Plain),
    (6, 1, Some(20), 3, true, Origin::Plain),
    (7, 2, Some(10), 1, false, Origin::Plain),
];

async fn populate<S>(store: &S)
where
    S: ObjectStore + Transaction,
{
    let permit = store.begin().await.unwrap();
    for (id, document_id, corpus_id, page, structural, origin) in ANNOTATIONS {
        let mut annotation = Annotation::new(id, document_id, 99)
            .on_page(page)
            .with_origin(origin);
        if let Some(corpus_id) = corpus_id {
            annotation = annotation.in_corpus(corpus_id);
        }
        if structural {
            annotation = annotation.structural();
        }
        store.insert_annotation(&annotation).await.unwrap();
    }

    // Relationship 100 connects annotations on page 1 and page 2 twice.
    store
        .insert_relationship(&Relationship::new(100, 1, 99).in_corpus(10).link(
            vec![ObjectId::new(1), ObjectId::new(2)],
            vec![ObjectId::new(3)],
        ))
        .await
        .unwrap();
    store
        .insert_relationship(
            &Relationship::new(101, 1, 99)
                .structural()
                .link(vec![ObjectId::new(4)], vec![ObjectId::new(6)]),
        )
        .await
        .unwrap();
    store
        .insert_relationship(
            &Relationship::new(102, 1, 99)
                .in_corpus(20)
                .link(vec![ObjectId::new(5)], vec![]),
        )
        .await
        .unwrap();
    store.commit(permit).await.unwrap();
}

#[tokio::test]
async fn corpus_scope() {
    assert_all_stores!(|store| async {
        populate(&store).await;

        let query = RowQuery::new(ObjectId::new(1), CorpusScope::Corpus(ObjectId::new(10)));
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();

        // Structural rows without corpus are shared with every corpus of the document.
        assert_eq!(ids(&annotations, |a| a.id), vec![1, 2, 3, 4]);

        let query = RowQuery::new(ObjectId::new(1), CorpusScope::StructuralOnly);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![4, 6]);

        let query = RowQuery::new(ObjectId::new(1), CorpusScope::Corpus(ObjectId::new(10)))
            .structural(false);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![1, 2, 3]);

        let query = RowQuery::new(ObjectId::new(3), CorpusScope::StructuralOnly);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert!(annotations.is_empty());
    });
}

#[tokio::test]
async fn owner_and_page_filters() {
    assert_all_stores!(|store| async {
        populate(&store).await;
        let scope = CorpusScope::Corpus(ObjectId::new(10));

        let query = RowQuery::new(ObjectId::new(1), scope).analysis(OwnerFilter::Absent);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![1, 3, 4]);

        let query = RowQuery::new(ObjectId::new(1), scope)
            .analysis(OwnerFilter::Absent)
            .extract(OwnerFilter::Absent);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![1, 4]);

        let query =
            RowQuery::new(ObjectId::new(1), scope).extract(OwnerFilter::Is(ObjectId::new(6)));
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![3]);

        let query = RowQuery::new(ObjectId::new(1), scope).pages(vec![2, 7]);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&annotations, |a| a.id), vec![2, 3]);

        // An empty page list matches nothing.
        let query = RowQuery::new(ObjectId::new(1), scope).pages(vec![]);
        let annotations: Vec<Annotation> = ScopedRows::<Annotation>::select(&store, &query)
            .await
            .unwrap();
        assert!(annotations.is_empty());
    });
}

#[tokio::test]
async fn relationship_rows() {
    assert_all_stores!(|store| async {
        populate(&store).await;
        let scope = CorpusScope::Corpus(ObjectId::new(10));

        let query = RowQuery::new(ObjectId::new(1), scope);
        let relationships: Vec<Relationship> = ScopedRows::<Relationship>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&relationships, |r| r.id), vec![100, 101]);
        assert_eq!(
            relationships[0].source_ids,
            vec![ObjectId::new(1), ObjectId::new(2)]
        );
        assert_eq!(relationships[0].target_ids, vec![ObjectId::new(3)]);

        // Relationship 100 links two annotations on page 2 and shows up once for each of them.
        let query = RowQuery::new(ObjectId::new(1), scope).pages(vec![2]);
        let relationships: Vec<Relationship> = ScopedRows::<Relationship>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&relationships, |r| r.id), vec![100, 100]);
        assert!(
            relationships
                .iter()
                .all(|relationship| relationship.target_ids == vec![ObjectId::new(3)])
        );

        let query =
            RowQuery::new(ObjectId::new(1), CorpusScope::Corpus(ObjectId::new(20))).pages(vec![1]);
        let relationships: Vec<Relationship> = ScopedRows::<Relationship>::select(&store, &query)
            .await
            .unwrap();
        assert_eq!(ids(&relationships, |r| r.id), vec![101, 102]);
    });
}
