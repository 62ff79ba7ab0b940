//! Integration tests for archive planning and streaming.

mod helpers;

use std::io::{Cursor, Read};

use cabinet_core::types::NodeRef;
use cabinet_entity::file::CreateFile;
use futures::TryStreamExt;

async fn zip_names(t: &helpers::TestCabinet, plan: cabinet_service::ArchivePlan) -> Vec<String> {
    let chunks: Vec<bytes::Bytes> = t
        .cabinet
        .archive_builder()
        .build(plan)
        .try_collect()
        .await
        .unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(chunks.concat())).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_project_archive_round_trip() {
    let t = helpers::TestCabinet::new();
    let p = t.project("Alpha").await;
    let docs = t.folder(p, None, "Docs").await;
    t.folder(p, Some(docs), "Empty").await;
    t.cabinet
        .service()
        .upload_bytes(
            &t.ctx,
            CreateFile {
                project_id: p,
                folder_id: Some(docs),
                name: "notes.txt".into(),
                remote_key: None,
                is_public: false,
                owner_id: None,
            },
            "meeting notes, longer than one sixty-four byte chunk of the test gateway".repeat(3),
        )
        .await
        .unwrap();

    let plan = {
        let tree = t.cabinet.tree().read().await;
        t.cabinet.planner().plan_project(&tree, p).unwrap()
    };
    assert_eq!(plan.content_disposition(), "attachment; filename=Alpha.zip");

    let chunks: Vec<bytes::Bytes> = t
        .cabinet
        .archive_builder()
        .build(plan)
        .try_collect()
        .await
        .unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(chunks.concat())).unwrap();
    let mut body = String::new();
    zip.by_name("Docs/notes.txt")
        .unwrap()
        .read_to_string(&mut body)
        .unwrap();
    assert!(body.starts_with("meeting notes"));
    assert!(zip.by_name("Docs/Empty/").unwrap().is_dir());
}

#[tokio::test]
async fn test_multi_project_archive_prefixes_project_names() {
    let t = helpers::TestCabinet::new();
    let a = t.project("Alpha").await;
    let b = t.project("Beta").await;
    t.file(a, None, "a.bin", 3).await;
    let sub = t.folder(b, None, "Sub").await;
    t.file(b, Some(sub), "b.bin", 3).await;

    let plan = {
        let tree = t.cabinet.tree().read().await;
        t.cabinet.planner().plan_projects(&tree, &[a, b]).unwrap()
    };
    assert_eq!(plan.file_name(), "projects.zip");
    assert_eq!(zip_names(&t, plan).await, vec!["Alpha/a.bin", "Beta/Sub/b.bin"]);
}

#[tokio::test]
async fn test_selection_archive_is_relative_to_parent() {
    let t = helpers::TestCabinet::new();
    let p = t.project("Alpha").await;
    let parent = t.folder(p, None, "Parent").await;
    let child = t.folder(p, Some(parent), "Child").await;
    let picked = t.file(p, Some(parent), "picked.txt", 2).await;
    t.file(p, Some(parent), "skipped.txt", 2).await;
    t.file(p, Some(child), "deep.txt", 2).await;

    let plan = {
        let tree = t.cabinet.tree().read().await;
        t.cabinet
            .planner()
            .plan_selection(&tree, NodeRef::Folder(parent), &[picked], &[child])
            .unwrap()
    };
    assert_eq!(plan.name, "Parent");
    assert_eq!(zip_names(&t, plan).await, vec!["Child/deep.txt", "picked.txt"]);
}

#[tokio::test]
async fn test_archive_after_folder_move_reads_original_keys() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    let q = t.project("Q").await;
    let a = t.folder(p, None, "A").await;
    t.file(p, Some(a), "kept.txt", 4).await;

    t.cabinet
        .relocation()
        .move_nodes(&t.ctx, &[NodeRef::Folder(a)], q, None)
        .await
        .unwrap();

    let plan = {
        let tree = t.cabinet.tree().read().await;
        t.cabinet.planner().plan_project(&tree, q).unwrap()
    };
    assert_eq!(zip_names(&t, plan).await, vec!["A/kept.txt"]);
}
