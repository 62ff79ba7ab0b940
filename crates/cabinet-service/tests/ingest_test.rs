//! Integration tests for filing mail attachments.

mod helpers;

use cabinet_core::types::NodeRef;

#[tokio::test]
async fn test_attach_moves_staged_records() {
    let t = helpers::TestCabinet::new();
    let mail = t.project("Mail").await;
    let target = t.project("Target").await;
    let inbox = t.folder(target, None, "Inbox").await;
    let first = t.file(mail, None, "invoice.pdf", 12).await;
    let second = t.file(mail, None, "photo.jpg", 30).await;

    let report = t
        .cabinet
        .ingest()
        .attach(&t.ctx, &[first, second], target, Some(inbox))
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(t.aggregate(NodeRef::Folder(inbox)).await, (42, false));
    assert_eq!(t.aggregate(NodeRef::Project(mail)).await, (0, false));
    t.assert_consistent().await;
}

#[tokio::test]
async fn test_import_staged_creates_folders_and_skips_duplicates() {
    let t = helpers::TestCabinet::new();
    let p = t.project("P").await;
    t.store.insert("staging/1/invoice.pdf", "pdf-bytes");
    t.store.insert("staging/2/invoice.pdf", "other");

    let ingest = t.cabinet.ingest();
    let file = ingest
        .import_staged(&t.ctx, "staging/1/invoice.pdf", p, &["2024", "March"], "invoice.pdf")
        .await
        .unwrap()
        .expect("filed");

    assert_eq!(file.size_bytes, 9);
    assert!(t.store.keys().contains(&file.remote_key));
    assert!(!t.store.keys().contains(&"staging/1/invoice.pdf".to_string()));
    let path = {
        let tree = t.cabinet.tree().read().await;
        t.cabinet
            .resolver()
            .display_string(&tree, NodeRef::File(file.id))
            .unwrap()
    };
    assert_eq!(path, "P/2024/March/invoice.pdf");

    let skipped = ingest
        .import_staged(&t.ctx, "staging/2/invoice.pdf", p, &["2024", "March"], "invoice.pdf")
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert!(t.store.keys().contains(&"staging/2/invoice.pdf".to_string()));
    assert_eq!(t.cabinet.tree().read().await.folders().count(), 2);
}
