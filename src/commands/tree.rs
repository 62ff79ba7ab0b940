//! Print a folder tree.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use cabinet_core::result::AppResult;
use cabinet_core::types::NodeRef;
use cabinet_entity::folder::FolderNode;

use super::{Session, parse_node};
use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Root of the tree (`project:ID` or `folder:ID`)
    #[arg(value_parser = parse_node)]
    pub root: NodeRef,
    /// Max depth below the root
    #[arg(short, long)]
    pub depth: Option<u32>,
}

/// Folder tree row
#[derive(Debug, Serialize, Tabled)]
struct TreeRow {
    /// Folder ID
    id: String,
    /// Name, indented by depth
    name: String,
    /// Files
    files: u64,
    /// Size
    size: String,
    /// Public
    public: bool,
}

fn flatten(node: &FolderNode, base: u32, max_depth: Option<u32>, rows: &mut Vec<TreeRow>) {
    let level = node.depth - base;
    rows.push(TreeRow {
        id: node.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        name: format!("{}{}", "  ".repeat(level as usize), node.name),
        files: node.file_count,
        size: format_bytes(node.size_bytes),
        public: node.is_public,
    });
    if max_depth.is_some_and(|max| level >= max) {
        return;
    }
    for child in &node.children {
        flatten(child, base, max_depth, rows);
    }
}

/// Execute the tree command
pub async fn execute(args: &TreeArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let tree = session.cabinet().tree_view(args.root).await?;
    match format {
        OutputFormat::Json => output::print_json(&tree),
        OutputFormat::Table => {
            let mut rows = Vec::new();
            flatten(&tree, tree.depth, args.depth, &mut rows);
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
