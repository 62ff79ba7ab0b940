//! Integration tests for create, upload, delete, slugs, and quota.

mod helpers;

use cabinet_core::error::ErrorKind;
use cabinet_core::types::NodeRef;
use cabinet_entity::file::CreateFile;
use cabinet_service::TreeStore;

#[tokio::test]
async fn test_upload_rejects_duplicate_name_without_storing() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    t.file(p, None, "a.txt", 1).await;
    let keys_before = t.store.keys();

    let err = t
        .cabinet
        .service()
        .upload_bytes(
            &t.ctx,
            CreateFile {
                project_id: p,
                folder_id: None,
                name: "a.txt".into(),
                remote_key: None,
                is_public: false,
                owner_id: None,
            },
            "dup",
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    assert_eq!(t.store.keys(), keys_before);
}

#[tokio::test]
async fn test_delete_folder_removes_blobs_and_subtree() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let keep = t.file(p, None, "keep", 5).await;
    let a = t.folder(p, None, "A").await;
    let b = t.folder(p, Some(a), "B").await;
    t.file(p, Some(a), "x", 10).await;
    t.file(p, Some(b), "y", 20).await;

    let removed = t.cabinet.service().delete_folder(&t.ctx, a).await.unwrap();

    assert_eq!(removed.len(), 2);
    let keep_key = t.file_record(keep).await.remote_key;
    assert_eq!(t.store.keys(), vec![keep_key]);
    assert_eq!(t.aggregate(NodeRef::Project(p)).await, (5, false));
    let tree = t.cabinet.tree().read().await;
    assert!(!tree.contains(NodeRef::Folder(a)));
    assert!(!tree.contains(NodeRef::Folder(b)));
}

#[tokio::test]
async fn test_delete_folder_keeps_tree_when_store_is_down() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let a = t.folder(p, None, "A").await;
    t.file(p, Some(a), "x", 10).await;

    t.store.set_offline(true);
    let err = t.cabinet.service().delete_folder(&t.ctx, a).await.unwrap_err();
    t.store.set_offline(false);

    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
    assert_eq!(t.aggregate(NodeRef::Folder(a)).await, (10, false));
    t.cabinet.service().delete_folder(&t.ctx, a).await.unwrap();
    assert_eq!(t.aggregate(NodeRef::Project(p)).await, (0, false));
}

#[tokio::test]
async fn test_slug_is_generated_once() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let service = t.cabinet.service();

    let slug = service.ensure_slug(NodeRef::Project(p)).await.unwrap();
    assert_eq!(slug.len(), 20);
    t.cabinet
        .relocation()
        .rename(&t.ctx, NodeRef::Project(p), "Renamed")
        .await
        .unwrap();
    assert_eq!(service.ensure_slug(NodeRef::Project(p)).await.unwrap(), slug);
}

#[tokio::test]
async fn test_quota_usage() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    t.file(p, None, "a", 250).await;
    let service = t.cabinet.service();

    service.set_quota(1000).await.unwrap();
    assert_eq!(service.used_space().await, 250);
    assert_eq!(service.used_space_percent().await, 25);

    service.set_quota(0).await.unwrap();
    assert_eq!(service.used_space_percent().await, 100);
    assert_eq!(
        service.set_quota(-1).await.unwrap_err().kind,
        ErrorKind::Validation
    );
}

#[tokio::test]
async fn test_snapshot_restores_the_forest() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let a = t.folder(p, None, "A").await;
    let f = t.file(p, Some(a), "x", 10).await;

    let snapshot = t.cabinet.snapshot().await;
    let restored = TreeStore::from_snapshot(snapshot).unwrap();

    assert_eq!(restored.aggregate(NodeRef::Folder(a)).unwrap(), (10, false));
    assert_eq!(restored.file(f).unwrap().folder_id, Some(a));
    let mut restored = restored;
    let next = restored.allocate_file_id();
    assert!(next > f);
}

#[tokio::test]
async fn test_tree_view_reports_sizes() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let a = t.folder(p, None, "A").await;
    t.file(p, Some(a), "x", 10).await;

    let view = t.cabinet.tree_view(NodeRef::Project(p)).await.unwrap();
    assert_eq!(view.size_bytes, 10);
    assert_eq!(view.children[0].name, "A");
    assert_eq!(view.children[0].file_count, 1);
}
