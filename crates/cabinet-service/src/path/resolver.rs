//! Maps tree nodes to identity paths and display paths.
//!
//! The identity path of a node is the chain of numeric ids from its
//! project down to the node (`{project}/{folder}/…`). It is the prefix of
//! every object key minted for that location, so renaming a node never
//! changes a key. The display path is the same chain spelled with names
//! and is what archives and listings show.

use tracing::error;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::File;

use crate::tree::TreeStore;

/// Resolves paths against a [`TreeStore`].
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    bucket_root: String,
}

impl PathResolver {
    /// Create a resolver whose minted keys start with `bucket_root`.
    pub fn new(bucket_root: impl Into<String>) -> Self {
        Self {
            bucket_root: bucket_root.into().trim_matches('/').to_string(),
        }
    }

    /// Project and folder chain (root first) of a container or folder.
    fn chain(&self, tree: &TreeStore, node: NodeRef) -> AppResult<(ProjectId, Vec<FolderId>)> {
        let (project, mut current) = match node {
            NodeRef::Project(id) => (tree.project(id)?.id, None),
            NodeRef::Folder(id) => (tree.folder(id)?.project_id, Some(id)),
            NodeRef::File(id) => {
                let file = tree.file(id)?;
                (file.project_id, file.folder_id)
            }
        };

        let mut folders = Vec::new();
        while let Some(id) = current {
            let folder = tree.folder(id).map_err(|_| {
                let message = format!("Dangling folder link {id} while resolving {node}");
                error!(%node, folder_id = %id, "Dangling folder link");
                AppError::data_integrity(message)
            })?;
            if folders.contains(&id) {
                error!(%node, folder_id = %id, "Folder cycle");
                return Err(AppError::data_integrity(format!(
                    "Folder cycle at {id} while resolving {node}"
                )));
            }
            folders.push(id);
            current = folder.parent_id;
        }
        tree.project(project).map_err(|_| {
            error!(%node, project_id = %project, "Dangling project link");
            AppError::data_integrity(format!("Dangling project link {project} from {node}"))
        })?;
        folders.reverse();
        Ok((project, folders))
    }

    /// Id segments from the project down to `node`. A file ends with the
    /// leaf segment of its current object key.
    pub fn identity_path(&self, tree: &TreeStore, node: NodeRef) -> AppResult<Vec<String>> {
        let (project, folders) = self.chain(tree, node)?;
        let mut segments = Vec::with_capacity(folders.len() + 2);
        segments.push(project.to_string());
        segments.extend(folders.iter().map(FolderId::to_string));
        if let NodeRef::File(id) = node {
            segments.push(leaf_for(tree.file(id)?));
        }
        Ok(segments)
    }

    /// Name segments from the project down to `node`.
    pub fn display_path(&self, tree: &TreeStore, node: NodeRef) -> AppResult<Vec<String>> {
        let (project, folders) = self.chain(tree, node)?;
        let mut segments = Vec::with_capacity(folders.len() + 2);
        segments.push(tree.project(project)?.name.clone());
        for id in folders {
            segments.push(tree.folder(id)?.name.clone());
        }
        if let NodeRef::File(id) = node {
            segments.push(tree.file(id)?.name.clone());
        }
        Ok(segments)
    }

    /// Display path joined with `/`.
    pub fn display_string(&self, tree: &TreeStore, node: NodeRef) -> AppResult<String> {
        Ok(self.display_path(tree, node)?.join("/"))
    }

    /// True iff a container holds no files (at any depth) and no folders.
    /// Files are never empty.
    pub fn is_empty(&self, tree: &TreeStore, node: NodeRef) -> AppResult<bool> {
        if !tree.contains(node) {
            return Err(AppError::not_found(format!("{node} not found")));
        }
        Ok(!node.is_file() && !tree.has_children(node))
    }

    /// Key prefix for blobs stored directly in `container`.
    pub fn key_prefix(&self, tree: &TreeStore, container: NodeRef) -> AppResult<String> {
        if container.is_file() {
            return Err(AppError::validation(format!(
                "{container} cannot contain other nodes"
            )));
        }
        let mut segments = self.identity_path(tree, container)?;
        if !self.bucket_root.is_empty() {
            segments.insert(0, self.bucket_root.clone());
        }
        Ok(segments.join("/"))
    }

    /// Key `file` should have once it lives in `destination`. The file's
    /// leaf segment is kept so the key stays unique.
    pub fn remote_key_for(
        &self,
        tree: &TreeStore,
        file: &File,
        destination: NodeRef,
    ) -> AppResult<String> {
        Ok(format!(
            "{}/{}",
            self.key_prefix(tree, destination)?,
            leaf_for(file)
        ))
    }

    /// Key for a new file that has no blob yet.
    pub fn mint_key(
        &self,
        tree: &TreeStore,
        id: FileId,
        name: &str,
        destination: NodeRef,
    ) -> AppResult<String> {
        Ok(format!(
            "{}/{}",
            self.key_prefix(tree, destination)?,
            leaf_segment(id, name)
        ))
    }
}

/// Leaf segment minted for a new file.
pub fn leaf_segment(id: FileId, name: &str) -> String {
    format!("{id}-{name}")
}

fn leaf_for(file: &File) -> String {
    if file.remote_key.is_empty() {
        leaf_segment(file.id, &file.name)
    } else {
        file.leaf_segment().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActorContext;
    use cabinet_core::error::ErrorKind;
    use cabinet_entity::file::CreateFile;
    use cabinet_entity::folder::CreateFolder;
    use cabinet_entity::project::CreateProject;

    struct Fixture {
        tree: TreeStore,
        p: ProjectId,
        a: FolderId,
        b: FolderId,
        f: FileId,
    }

    fn fixture() -> Fixture {
        let ctx = ActorContext::system();
        let mut tree = TreeStore::new();
        let p = tree
            .create_project(CreateProject { name: "Alpha".into(), owner_id: None }, &ctx)
            .unwrap()
            .id;
        let a = tree
            .create_folder(
                CreateFolder { project_id: p, parent_id: None, name: "Docs".into(), owner_id: None },
                &ctx,
            )
            .unwrap()
            .id;
        let b = tree
            .create_folder(
                CreateFolder { project_id: p, parent_id: Some(a), name: "2024".into(), owner_id: None },
                &ctx,
            )
            .unwrap()
            .id;
        let f = tree.allocate_file_id();
        tree.insert_file(
            f,
            CreateFile {
                project_id: p,
                folder_id: Some(b),
                name: "plan.pdf".into(),
                remote_key: None,
                is_public: false,
                owner_id: None,
            },
            format!("{p}/{a}/{b}/{f}-plan.pdf"),
            10,
            &ctx,
        )
        .unwrap();
        Fixture { tree, p, a, b, f }
    }

    #[test]
    fn test_identity_and_display_paths() {
        let fx = fixture();
        let resolver = PathResolver::default();

        let identity = resolver.identity_path(&fx.tree, NodeRef::File(fx.f)).unwrap();
        assert_eq!(
            identity,
            vec![
                fx.p.to_string(),
                fx.a.to_string(),
                fx.b.to_string(),
                format!("{}-plan.pdf", fx.f)
            ]
        );

        let display = resolver.display_string(&fx.tree, NodeRef::File(fx.f)).unwrap();
        assert_eq!(display, "Alpha/Docs/2024/plan.pdf");

        let root = resolver.display_path(&fx.tree, NodeRef::Project(fx.p)).unwrap();
        assert_eq!(root, vec!["Alpha".to_string()]);
    }

    #[test]
    fn test_rename_does_not_change_identity() {
        let mut fx = fixture();
        let resolver = PathResolver::default();
        let before = resolver.identity_path(&fx.tree, NodeRef::File(fx.f)).unwrap();

        fx.tree
            .rename(NodeRef::Folder(fx.a), "Documents", &ActorContext::system())
            .unwrap();

        let after = resolver.identity_path(&fx.tree, NodeRef::File(fx.f)).unwrap();
        assert_eq!(before, after);
        assert_eq!(
            resolver.display_string(&fx.tree, NodeRef::File(fx.f)).unwrap(),
            "Alpha/Documents/2024/plan.pdf"
        );
    }

    #[test]
    fn test_remote_key_for_keeps_leaf_and_bucket_root() {
        let fx = fixture();
        let resolver = PathResolver::new("/cabinet/");
        let file = fx.tree.file(fx.f).unwrap().clone();

        let key = resolver
            .remote_key_for(&fx.tree, &file, NodeRef::Project(fx.p))
            .unwrap();
        assert_eq!(key, format!("cabinet/{}/{}-plan.pdf", fx.p, fx.f));
    }

    #[test]
    fn test_is_empty() {
        let fx = fixture();
        let resolver = PathResolver::default();
        assert!(!resolver.is_empty(&fx.tree, NodeRef::Folder(fx.a)).unwrap());
        assert!(!resolver.is_empty(&fx.tree, NodeRef::File(fx.f)).unwrap());
        let err = resolver
            .is_empty(&fx.tree, NodeRef::Folder(FolderId(999)))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
