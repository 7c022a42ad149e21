// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Annotation, ObjectId};

use crate::assert_all_stores;
use crate::objects::ObjectStore;
use crate::traits::Transaction;
use crate::tree::TreeStore;

fn ids(values: &[u64]) -> Vec<ObjectId> {
    values.iter().copied().map(ObjectId::new).collect()
}

#[tokio::test]
async fn walk_annotation_tree() {
    assert_all_stores!(|store| async {
        // 1
        // ├── 3
        // │   └── 4
        // └── 2
        //     ├── 6
        //     └── 5
        let permit = store.begin().await.unwrap();
        for annotation in [
            Annotation::new(1, 1, 1),
            Annotation::new(2, 1, 1).with_parent(1),
            Annotation::new(3, 1, 1).with_parent(1),
            Annotation::new(4, 1, 1).with_parent(3),
            Annotation::new(5, 1, 1).with_parent(2),
            Annotation::new(6, 1, 1).with_parent(2),
            Annotation::new(7, 1, 1),
        ] {
            store.insert_annotation(&annotation).await.unwrap();
        }
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.descendants(&ObjectId::new(1)).await.unwrap(),
            ids(&[2, 3, 4, 5, 6])
        );
        assert_eq!(
            store.descendants(&ObjectId::new(2)).await.unwrap(),
            ids(&[5, 6])
        );
        assert_eq!(
            store.ancestors(&ObjectId::new(4)).await.unwrap(),
            ids(&[3, 1])
        );
        assert!(store.ancestors(&ObjectId::new(1)).await.unwrap().is_empty());
        assert!(
            store
                .descendants(&ObjectId::new(7))
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .descendants(&ObjectId::new(42))
                .await
                .unwrap()
                .is_empty()
        );
    });
}

#[tokio::test]
async fn cyclic_parents_terminate() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        store
            .insert_annotation(&Annotation::new(1, 1, 1).with_parent(2))
            .await
            .unwrap();
        store
            .insert_annotation(&Annotation::new(2, 1, 1).with_parent(1))
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        assert_eq!(store.ancestors(&ObjectId::new(1)).await.unwrap(), ids(&[2]));
        assert_eq!(
            store.descendants(&ObjectId::new(1)).await.unwrap(),
            ids(&[2])
        );
    });
}
