//! Rename a node.

use clap::Args;

use cabinet_core::result::AppResult;
use cabinet_core::types::NodeRef;

use super::{Session, parse_node};
use crate::output;

/// Arguments for the rename command
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Node to rename (`project:ID`, `folder:ID`, `file:ID`)
    #[arg(value_parser = parse_node)]
    pub node: NodeRef,
    /// New name
    pub name: String,
}

/// Execute the rename command. Blobs keep their keys.
pub async fn execute(args: &RenameArgs, session: &Session) -> AppResult<()> {
    session
        .cabinet()
        .relocation()
        .rename(session.ctx(), args.node, &args.name)
        .await?;
    session.persist().await?;
    output::print_success(&format!("Renamed {} to '{}'", args.node, args.name));
    Ok(())
}
