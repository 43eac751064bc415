use lockbox_storage::{
    ActorId, Envelope, InsertSecretParams, ListQuery, OrganizationId, SecretKind, SecretPatch,
    SecretStore, StoreError,
};
use lockbox_store_sqlite::SqliteStore;
use uuid::Uuid;

fn envelope(fill: u8) -> Envelope {
    Envelope {
        ciphertext: vec![fill; 48],
        nonce: vec![fill; 24],
        tag: vec![fill; 16],
    }
}

fn params(org: OrganizationId, name: &str, kind: SecretKind) -> InsertSecretParams {
    InsertSecretParams {
        organization_id: org,
        created_by: ActorId(Uuid::new_v4()),
        name: name.to_string(),
        kind,
        envelope: envelope(1),
    }
}

#[tokio::test]
async fn end_to_end_happy_path_and_updates() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let org = OrganizationId(Uuid::new_v4());

    // insert + get round-trip
    let record = s
        .insert(&params(org, "Email", SecretKind::WebLogin))
        .await
        .unwrap();
    let fetched = s.get_by_id(&org, &record.id).await.unwrap();
    assert_eq!(fetched.name, "Email");
    assert_eq!(fetched.kind, SecretKind::WebLogin);
    assert_eq!(fetched.envelope, record.envelope);
    assert_eq!(fetched.created_at, record.created_at);

    // name-only update leaves the envelope untouched
    let renamed = s
        .update(
            &org,
            &record.id,
            &SecretPatch {
                name: Some("Work email".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Work email");
    assert_eq!(renamed.envelope, record.envelope);
    assert_eq!(renamed.created_at, record.created_at);

    // envelope update replaces all three columns
    let reencrypted = s
        .update(
            &org,
            &record.id,
            &SecretPatch {
                envelope: Some(envelope(9)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reencrypted.envelope, envelope(9));
    assert_eq!(reencrypted.created_at, record.created_at);
    assert!(reencrypted.updated_at >= renamed.updated_at);

    // delete, then the id is gone for good
    s.delete(&org, &record.id).await.unwrap();
    assert!(matches!(
        s.get_by_id(&org, &record.id).await.unwrap_err(),
        StoreError::NotFound
    ));
    assert!(matches!(
        s.delete(&org, &record.id).await.unwrap_err(),
        StoreError::NotFound
    ));
}

#[tokio::test]
async fn org_scoping_hides_foreign_rows() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let org_a = OrganizationId(Uuid::new_v4());
    let org_b = OrganizationId(Uuid::new_v4());

    let record = s
        .insert(&params(org_a, "mine", SecretKind::SecureNote))
        .await
        .unwrap();

    assert!(matches!(
        s.get_by_id(&org_b, &record.id).await.unwrap_err(),
        StoreError::NotFound
    ));
    assert!(matches!(
        s.update(
            &org_b,
            &record.id,
            &SecretPatch {
                name: Some("stolen".to_string()),
                ..Default::default()
            }
        )
        .await
        .unwrap_err(),
        StoreError::NotFound
    ));
    assert!(matches!(
        s.delete(&org_b, &record.id).await.unwrap_err(),
        StoreError::NotFound
    ));

    let page = s.list_by_org(&org_b, &ListQuery::default()).await.unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn pagination_is_deterministic_and_complete() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let org = OrganizationId(Uuid::new_v4());

    let mut inserted = Vec::new();
    for name in ["a", "b", "c", "d"] {
        inserted.push(
            s.insert(&params(org, name, SecretKind::CreditCard))
                .await
                .unwrap()
                .id,
        );
        // Timestamps are stored at millisecond precision; keep them distinct
        // so the expected order doesn't depend on the id tie-break.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let page1 = s
        .list_by_org(
            &org,
            &ListQuery {
                offset: Some(0),
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    let page2 = s
        .list_by_org(
            &org,
            &ListQuery {
                offset: Some(2),
                limit: Some(2),
            },
        )
        .await
        .unwrap();

    assert_eq!(page1.total_count, 4);
    assert_eq!(page2.total_count, 4);
    assert_eq!(page1.records.len(), 2);
    assert_eq!(page2.records.len(), 2);

    // Each record exactly once, newest first.
    let mut expected = inserted.clone();
    expected.reverse();
    let seen: Vec<_> = page1
        .records
        .iter()
        .chain(page2.records.iter())
        .map(|r| r.id)
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn update_rejects_immutable_fields() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let org = OrganizationId(Uuid::new_v4());

    let record = s
        .insert(&params(org, "note", SecretKind::SecureNote))
        .await
        .unwrap();

    assert!(matches!(
        s.update(
            &org,
            &record.id,
            &SecretPatch {
                kind: Some(SecretKind::WebLogin),
                ..Default::default()
            }
        )
        .await
        .unwrap_err(),
        StoreError::ImmutableField
    ));

    assert!(matches!(
        s.update(
            &org,
            &record.id,
            &SecretPatch {
                organization_id: Some(OrganizationId(Uuid::new_v4())),
                ..Default::default()
            }
        )
        .await
        .unwrap_err(),
        StoreError::ImmutableField
    ));

    // Echoing current values passes through.
    let same = s
        .update(
            &org,
            &record.id,
            &SecretPatch {
                kind: Some(SecretKind::SecureNote),
                organization_id: Some(org),
                name: Some("note 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.name, "note 2");
}

#[tokio::test]
async fn kind_tags_survive_storage() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let org = OrganizationId(Uuid::new_v4());

    for kind in [
        SecretKind::WebLogin,
        SecretKind::CreditCard,
        SecretKind::SecureNote,
    ] {
        let record = s.insert(&params(org, "x", kind)).await.unwrap();
        let fetched = s.get_by_id(&org, &record.id).await.unwrap();
        assert_eq!(fetched.kind, kind);
    }
}
