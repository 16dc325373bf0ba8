use std::collections::HashSet;
use std::sync::Arc;

use tempfile::TempDir;
use userdeck::{FileUserStore, SchemaProfile, StoreError, UserCandidate, UserRecord, UserStore};

fn ann() -> UserCandidate {
    UserCandidate::new("Ann", "Lee", "ann@x.com").with_gender("Female")
}

async fn open(dir: &TempDir) -> FileUserStore {
    FileUserStore::open(dir.path().join("users.json"), SchemaProfile::Strict)
        .await
        .expect("store should open")
}

#[tokio::test]
async fn first_user_gets_id_one() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let created = store.create_user(ann()).await.unwrap();
    assert_eq!(
        created,
        UserRecord {
            id: 1,
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            email: "ann@x.com".to_string(),
            gender: Some("Female".to_string()),
        }
    );
    assert_eq!(store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn ids_follow_collection_size() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    for n in 0..5u64 {
        let before = store.list_users().await.unwrap().len() as u64;
        let created = store
            .create_user(
                UserCandidate::new("User", format!("N{n}"), format!("user{n}@x.com"))
                    .with_gender("Male"),
            )
            .await
            .unwrap();
        assert_eq!(created.id, before + 1);
        assert_eq!(store.list_users().await.unwrap().len() as u64, before + 1);
    }
}

#[tokio::test]
async fn reads_are_repeatable_and_ordered() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    store.create_user(ann()).await.unwrap();
    store
        .create_user(UserCandidate::new("Bo", "Ray", "bo@x.com").with_gender("Male"))
        .await
        .unwrap();

    let first = store.list_users().await.unwrap();
    let second = store.list_users().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn created_user_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let candidate = ann();
    let created = store.create_user(candidate.clone()).await.unwrap();
    let fetched = store.get_user(created.id).await.unwrap().unwrap();

    assert_eq!(Some(fetched.first_name), candidate.first_name);
    assert_eq!(Some(fetched.last_name), candidate.last_name);
    assert_eq!(Some(fetched.email), candidate.email);
    assert_eq!(fetched.gender, candidate.gender);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .create_user(UserCandidate::new("A", "B", "a@x.com").with_gender("Male"))
        .await
        .unwrap();

    let err = store
        .create_user(UserCandidate::new("C", "D", "a@x.com").with_gender("Female"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn invalid_candidate_is_not_stored() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let err = store
        .create_user(UserCandidate::new("Ann", "", "ann@x.com").with_gender("Female"))
        .await
        .unwrap_err();
    match err {
        StoreError::Validation(invalid) => assert_eq!(invalid.reason, "last_name is required"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn delete_removes_exactly_that_user() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let ann = store.create_user(ann()).await.unwrap();
    let bo = store
        .create_user(UserCandidate::new("Bo", "Ray", "bo@x.com").with_gender("Male"))
        .await
        .unwrap();

    let removed = store.delete_user(ann.id).await.unwrap();
    assert_eq!(removed, ann);
    assert!(store.get_user(ann.id).await.unwrap().is_none());
    assert_eq!(store.list_users().await.unwrap(), vec![bo]);

    let err = store.delete_user(ann.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(1)));
}

#[tokio::test]
async fn delete_last_user_leaves_empty_collection() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let created = store.create_user(ann()).await.unwrap();

    let removed = store.delete_user(1).await.unwrap();
    assert_eq!(removed, created);
    assert!(store.list_users().await.unwrap().is_empty());
    assert!(store.get_user(1).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_delete_keeps_user_in_place() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let path = data_dir.join("users.json");
    let store = FileUserStore::open(&path, SchemaProfile::Strict).await.unwrap();
    store.create_user(ann()).await.unwrap();
    store
        .create_user(UserCandidate::new("Bo", "Ray", "bo@x.com").with_gender("Male"))
        .await
        .unwrap();
    let before = store.list_users().await.unwrap();

    std::fs::remove_dir_all(&data_dir).unwrap();
    std::fs::write(&data_dir, "").unwrap();

    let err = store.delete_user(1).await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(store.list_users().await.unwrap(), before);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir).await;
        store.create_user(ann()).await.unwrap();
        store
            .create_user(UserCandidate::new("Bo", "Ray", "bo@x.com").with_gender("Male"))
            .await
            .unwrap();
        store.delete_user(1).await.unwrap();
        store.flush().await.unwrap();
    }

    let reopened = open(&dir).await;
    let users = reopened.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 2);
    assert_eq!(users[0].email, "bo@x.com");

    let next = reopened
        .create_user(UserCandidate::new("Cy", "Ng", "cy@x.com").with_gender("Non-binary"))
        .await
        .unwrap();
    assert_eq!(next.id, 3);
}

#[tokio::test]
async fn legacy_profile_accepts_users_without_gender() {
    let dir = TempDir::new().unwrap();
    let store = FileUserStore::open(dir.path().join("users.json"), SchemaProfile::Legacy)
        .await
        .unwrap();

    let created = store
        .create_user(UserCandidate::new("Ann", "Lee", "ann@x.com"))
        .await
        .unwrap();
    assert_eq!(created.gender, None);

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("gender"));
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir).await);

    let mut handles = Vec::new();
    for n in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create_user(
                    UserCandidate::new("User", format!("N{n}"), format!("user{n}@x.com"))
                        .with_gender("Female"),
                )
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let created = handle.await.unwrap().unwrap();
        assert!(ids.insert(created.id), "duplicate id {}", created.id);
    }
    assert_eq!(ids, (1..=16).collect::<HashSet<u64>>());

    let reopened = open(&dir).await;
    assert_eq!(reopened.len().await, 16);
}

#[tokio::test]
async fn concurrent_creates_with_same_email_admit_one() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir).await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.create_user(ann()).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((created, conflicts), (1, 7));
}

#[tokio::test]
async fn reopen_recomputes_next_id_from_surviving_users() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir).await;
        store.create_user(ann()).await.unwrap();
        let bo = store
            .create_user(UserCandidate::new("Bo", "Ray", "bo@x.com").with_gender("Male"))
            .await
            .unwrap();
        assert_eq!(bo.id, 2);
        store.delete_user(bo.id).await.unwrap();

        // Within one run the deleted id stays retired.
        let cy = store
            .create_user(UserCandidate::new("Cy", "Ng", "cy@x.com").with_gender("Non-binary"))
            .await
            .unwrap();
        assert_eq!(cy.id, 3);
        store.delete_user(cy.id).await.unwrap();
    }

    // The file only holds users, so the high-water mark restarts at the
    // largest surviving id.
    let reopened = open(&dir).await;
    let next = reopened
        .create_user(UserCandidate::new("Di", "Ko", "di@x.com").with_gender("Female"))
        .await
        .unwrap();
    assert_eq!(next.id, 2);
}
