// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Capability, CapabilitySet, ObjectRef, PrincipalId};

use crate::assert_all_stores;
use crate::grants::GrantStore;
use crate::traits::{MAX_ID, Transaction};

#[tokio::test]
async fn write_and_query_grants() {
    assert_all_stores!(|store| async {
        let alice = PrincipalId::new(1);
        let bob = PrincipalId::new(2);
        let document = ObjectRef::document(10);
        let corpus = ObjectRef::corpus(10);

        assert_eq!(store.grant_version().await.unwrap(), 0);

        let permit = store.begin().await.unwrap();
        assert!(
            store
                .write_grants(
                    &alice,
                    &document,
                    CapabilitySet::from([Capability::Read, Capability::Update]),
                )
                .await
                .unwrap()
        );

        // Granting an already held capability is not an insertion.
        assert!(
            !store
                .write_grants(&alice, &document, CapabilitySet::only(Capability::Read))
                .await
                .unwrap()
        );
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.grants_for(&alice, &document).await.unwrap(),
            CapabilitySet::from([Capability::Read, Capability::Update])
        );

        // Grants are scoped to principal, object kind and object id.
        assert!(store.grants_for(&bob, &document).await.unwrap().is_empty());
        assert!(store.grants_for(&alice, &corpus).await.unwrap().is_empty());

        assert_eq!(store.grant_version().await.unwrap(), 1);
    });
}

#[tokio::test]
async fn revoke_grants() {
    assert_all_stores!(|store| async {
        let alice = PrincipalId::new(1);
        let analysis = ObjectRef::analysis(3);

        let permit = store.begin().await.unwrap();
        store
            .write_grants(&alice, &analysis, CapabilitySet::all())
            .await
            .unwrap();
        store.commit(permit).await.unwrap();
        let version = store.grant_version().await.unwrap();

        let permit = store.begin().await.unwrap();
        assert!(
            store
                .revoke(
                    &alice,
                    &analysis,
                    CapabilitySet::from([Capability::Delete, Capability::Publish]),
                )
                .await
                .unwrap()
        );

        // Nothing left to remove.
        assert!(
            !store
                .revoke(&alice, &analysis, CapabilitySet::only(Capability::Delete))
                .await
                .unwrap()
        );
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.grants_for(&alice, &analysis).await.unwrap(),
            CapabilitySet::from([
                Capability::Read,
                Capability::Create,
                Capability::Update,
                Capability::Comment,
            ])
        );
        assert!(store.grant_version().await.unwrap() > version);
    });
}

#[tokio::test]
async fn uncommitted_grants_are_invisible() {
    assert_all_stores!(|store| async {
        let alice = PrincipalId::new(1);
        let extract = ObjectRef::extract(5);

        let permit = store.begin().await.unwrap();
        store
            .write_grants(&alice, &extract, CapabilitySet::only(Capability::Read))
            .await
            .unwrap();
        store.rollback(permit).await.unwrap();

        // The whole grant-set mutation is gone.
        assert!(store.grants_for(&alice, &extract).await.unwrap().is_empty());
        assert_eq!(store.grant_version().await.unwrap(), 0);
    });
}

#[tokio::test]
async fn dropped_permit_discards_writes() {
    assert_all_stores!(|store| async {
        let alice = PrincipalId::new(1);
        let document = ObjectRef::document(8);

        let permit = store.begin().await.unwrap();
        store
            .write_grants(&alice, &document, CapabilitySet::all())
            .await
            .unwrap();
        drop(permit);

        assert!(
            store
                .grants_for(&alice, &document)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.grant_version().await.unwrap(), 0);

        // Writes without a transaction keep failing, the abandoned one is gone.
        assert!(
            store
                .write_grants(&alice, &document, CapabilitySet::only(Capability::Read))
                .await
                .is_err()
        );

        // The next writer isn't blocked.
        let permit = store.begin().await.unwrap();
        store
            .write_grants(&alice, &document, CapabilitySet::only(Capability::Read))
            .await
            .unwrap();
        store.commit(permit).await.unwrap();
        assert_eq!(
            store.grants_for(&alice, &document).await.unwrap(),
            CapabilitySet::only(Capability::Read)
        );
    });
}

#[tokio::test]
async fn identifiers_beyond_storable_range() {
    assert_all_stores!(|store| async {
        let alice = PrincipalId::new(1);
        let nobody = PrincipalId::new(u64::MAX);
        let document = ObjectRef::document(MAX_ID);
        let huge = ObjectRef::document(MAX_ID + 1);

        // Out of range lookups find nothing.
        assert!(store.grants_for(&alice, &huge).await.unwrap().is_empty());
        assert!(
            store
                .grants_for(&nobody, &document)
                .await
                .unwrap()
                .is_empty()
        );

        let permit = store.begin().await.unwrap();
        let err = store
            .write_grants(&alice, &huge, CapabilitySet::only(Capability::Read))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
        assert!(
            store
                .revoke(&nobody, &document, CapabilitySet::all())
                .await
                .is_err()
        );
        assert!(
            store
                .write_grants(&alice, &document, CapabilitySet::only(Capability::Read))
                .await
                .unwrap()
        );
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.grants_for(&alice, &document).await.unwrap(),
            CapabilitySet::only(Capability::Read)
        );
    });
}
