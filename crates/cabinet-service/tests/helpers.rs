//! Shared helpers for the cabinet integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use cabinet_core::config::AppConfig;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::{CreateFile, File};
use cabinet_entity::folder::CreateFolder;
use cabinet_entity::project::CreateProject;
use cabinet_service::{ActorContext, Cabinet, TreeStore};
use cabinet_storage::ObjectStoreGateway;
use cabinet_storage::providers::MemoryObjectStore;

/// A cabinet over an empty forest and an in-memory object store.
pub struct TestCabinet {
    /// The wired services.
    pub cabinet: Cabinet,
    /// The backing store, for fault injection and call counting.
    pub store: Arc<MemoryObjectStore>,
    /// Actor used for every mutation.
    pub ctx: ActorContext,
}

impl TestCabinet {
    /// Create a cabinet with default configuration.
    pub fn new() -> Self {
        let config: AppConfig = serde_json::from_str("{}").expect("default config");
        let store = Arc::new(MemoryObjectStore::new());
        let gateway = ObjectStoreGateway::new(store.clone(), 64);
        Self {
            cabinet: Cabinet::new(TreeStore::new(), gateway, &config),
            store,
            ctx: ActorContext::system(),
        }
    }

    /// Create a project.
    pub async fn project(&self, name: &str) -> ProjectId {
        self.cabinet
            .service()
            .create_project(
                &self.ctx,
                CreateProject {
                    name: name.to_string(),
                    owner_id: None,
                },
            )
            .await
            .expect("create project")
            .id
    }

    /// Create a folder.
    pub async fn folder(&self, project: ProjectId, parent: Option<FolderId>, name: &str) -> FolderId {
        self.cabinet
            .service()
            .create_folder(
                &self.ctx,
                CreateFolder {
                    project_id: project,
                    parent_id: parent,
                    name: name.to_string(),
                    owner_id: None,
                },
            )
            .await
            .expect("create folder")
            .id
    }

    /// Upload a private file of `size` zero bytes.
    pub async fn file(
        &self,
        project: ProjectId,
        folder: Option<FolderId>,
        name: &str,
        size: usize,
    ) -> FileId {
        self.cabinet
            .service()
            .upload_bytes(
                &self.ctx,
                CreateFile {
                    project_id: project,
                    folder_id: folder,
                    name: name.to_string(),
                    remote_key: None,
                    is_public: false,
                    owner_id: None,
                },
                vec![0u8; size],
            )
            .await
            .expect("upload file")
            .id
    }

    /// Cached `(size, is_public)` of a node.
    pub async fn aggregate(&self, node: NodeRef) -> (i64, bool) {
        self.cabinet
            .tree()
            .read()
            .await
            .aggregate(node)
            .expect("node exists")
    }

    /// Current record of a file.
    pub async fn file_record(&self, id: FileId) -> File {
        self.cabinet
            .tree()
            .read()
            .await
            .file(id)
            .expect("file exists")
            .clone()
    }

    /// Assert that every container satisfies size additivity and
    /// visibility OR over its direct children.
    pub async fn assert_consistent(&self) {
        let tree = self.cabinet.tree().read().await;
        let mut containers: Vec<NodeRef> = tree.projects().map(|p| NodeRef::Project(p.id)).collect();
        containers.extend(tree.folders().map(|f| NodeRef::Folder(f.id)));
        for node in containers {
            let files = tree.child_files(node);
            let folders = tree.child_folders(node);
            let size: i64 = files.iter().map(|f| f.size_bytes).sum::<i64>()
                + folders.iter().map(|f| f.size_bytes).sum::<i64>();
            let public = files.iter().any(|f| f.is_public) || folders.iter().any(|f| f.is_public);
            assert_eq!(tree.aggregate(node).unwrap(), (size, public), "aggregate of {node}");
        }
    }
}
