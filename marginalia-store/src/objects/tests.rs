// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{
    Analysis, Annotation, Corpus, Document, Extract, ObjectId, Origin, Relationship,
};

use crate::assert_all_stores;
use crate::objects::ObjectStore;
use crate::sqlite::SqliteStore;
use crate::traits::{MAX_ID, Transaction};

#[tokio::test]
async fn insert_and_get_objects() {
    assert_all_stores!(|store| async {
        let document = Document::new(1, 10).public();
        let corpus = Corpus::new(2, 10).allow_comments();
        let analysis = Analysis::new(3, 11);
        let extract = Extract::new(4, 12).public();
        let annotation = Annotation::new(5, 1, 10)
            .in_corpus(2)
            .on_page(3)
            .with_origin(Origin::Analysis(ObjectId::new(3)))
            .with_embedding(vec![0.5, -1.0, 2.25]);
        let child = Annotation::new(6, 1, 10).in_corpus(2).with_parent(5);
        let relationship = Relationship::new(7, 1, 10)
            .in_corpus(2)
            .with_origin(Origin::Extract(ObjectId::new(4)))
            .link(
                vec![ObjectId::new(6), ObjectId::new(5)],
                vec![ObjectId::new(5)],
            );

        let permit = store.begin().await.unwrap();
        assert!(store.insert_document(&document).await.unwrap());
        assert!(store.insert_corpus(&corpus).await.unwrap());
        assert!(store.insert_analysis(&analysis).await.unwrap());
        assert!(store.insert_extract(&extract).await.unwrap());
        assert!(store.insert_annotation(&annotation).await.unwrap());
        assert!(store.insert_annotation(&child).await.unwrap());
        assert!(store.insert_relationship(&relationship).await.unwrap());
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.document(&ObjectId::new(1)).await.unwrap(),
            Some(document)
        );
        assert_eq!(store.corpus(&ObjectId::new(2)).await.unwrap(), Some(corpus));
        assert_eq!(
            store.analysis(&ObjectId::new(3)).await.unwrap(),
            Some(analysis)
        );
        assert_eq!(
            store.extract(&ObjectId::new(4)).await.unwrap(),
            Some(extract)
        );
        assert_eq!(
            store.annotation(&ObjectId::new(5)).await.unwrap(),
            Some(annotation)
        );
        assert_eq!(
            store.annotation(&ObjectId::new(6)).await.unwrap(),
            Some(child)
        );

        // Link order within each role is kept.
        assert_eq!(
            store.relationship(&ObjectId::new(7)).await.unwrap(),
            Some(relationship)
        );

        // Ids are scoped per kind.
        assert_eq!(store.corpus(&ObjectId::new(1)).await.unwrap(), None);
        assert_eq!(store.annotation(&ObjectId::new(1)).await.unwrap(), None);
    });
}

#[tokio::test]
async fn duplicate_inserts_are_ignored() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        assert!(store.insert_document(&Document::new(1, 10)).await.unwrap());
        assert!(
            !store
                .insert_document(&Document::new(1, 20).public())
                .await
                .unwrap()
        );
        assert!(
            store
                .insert_annotation(&Annotation::new(2, 1, 10))
                .await
                .unwrap()
        );
        assert!(
            !store
                .insert_annotation(&Annotation::new(2, 1, 20).structural())
                .await
                .unwrap()
        );
        store.commit(permit).await.unwrap();

        // The first write wins.
        assert_eq!(
            store.document(&ObjectId::new(1)).await.unwrap(),
            Some(Document::new(1, 10))
        );
        assert_eq!(
            store.annotation(&ObjectId::new(2)).await.unwrap(),
            Some(Annotation::new(2, 1, 10))
        );
    });
}

#[tokio::test]
async fn identifiers_beyond_storable_range() {
    assert_all_stores!(|store| async {
        let huge = ObjectId::new(MAX_ID + 1);

        assert_eq!(
            store.document(&ObjectId::new(u64::MAX)).await.unwrap(),
            None
        );
        assert_eq!(store.annotation(&huge).await.unwrap(), None);
        assert_eq!(store.relationship(&huge).await.unwrap(), None);

        let permit = store.begin().await.unwrap();
        let err = store
            .insert_document(&Document::new(u64::MAX, 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
        assert!(
            store
                .insert_corpus(&Corpus::new(1, u64::MAX))
                .await
                .is_err()
        );
        assert!(
            store
                .insert_annotation(&Annotation::new(2, 1, 10).in_corpus(huge))
                .await
                .is_err()
        );
        assert!(
            store
                .insert_relationship(
                    &Relationship::new(3, 1, 10).link(vec![huge], vec![ObjectId::new(2)])
                )
                .await
                .is_err()
        );

        // The largest storable identifier is accepted.
        assert!(
            store
                .insert_document(&Document::new(MAX_ID, 1))
                .await
                .unwrap()
        );
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.document(&ObjectId::new(MAX_ID)).await.unwrap(),
            Some(Document::new(MAX_ID, 1))
        );
        assert_eq!(store.corpus(&ObjectId::new(1)).await.unwrap(), None);
    });
}

#[tokio::test]
async fn conflicting_origin_is_rejected_by_schema() {
    let store = SqliteStore::temporary().await;

    let permit = store.begin().await.unwrap();
    let result = store
        .tx(async |tx| {
            sqlx::query(
                "
                INSERT INTO
                    annotations_v1 (
                        id,
                        document_id,
                        page,
                        structural,
                        creator,
                        created_by_analysis_id,
                        created_by_extract_id
                    )
                VALUES
                    (1, 1, 1, 0, 1, 2, 3)
                ",
            )
            .execute(&mut **tx)
            .await
            .map_err(crate::sqlite::SqliteError::Sqlite)
        })
        .await;
    assert!(result.is_err());
    store.rollback(permit).await.unwrap();
}
