//! Folder tree rendering.

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::NodeRef;
use cabinet_entity::folder::FolderNode;

use crate::path::PathResolver;
use crate::tree::TreeStore;

/// Builds the folder tree below a project or folder.
pub fn folder_tree(tree: &TreeStore, resolver: &PathResolver, root: NodeRef) -> AppResult<FolderNode> {
    if root.is_file() {
        return Err(AppError::validation(format!("{root} has no folder tree")));
    }
    let path = resolver.display_string(tree, root)?;
    build(tree, root, path, 0)
}

fn build(tree: &TreeStore, node: NodeRef, path: String, depth: u32) -> AppResult<FolderNode> {
    let (size_bytes, is_public) = tree.aggregate(node)?;
    let children = tree
        .child_folders(node)
        .into_iter()
        .map(|child| {
            build(
                tree,
                NodeRef::Folder(child.id),
                format!("{path}/{}", child.name),
                depth + 1,
            )
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(FolderNode {
        id: match node {
            NodeRef::Folder(id) => Some(id),
            _ => None,
        },
        name: tree.name_of(node)?.to_string(),
        path,
        depth,
        size_bytes,
        is_public,
        file_count: tree.child_files(node).len() as u64,
        children,
    })
}
