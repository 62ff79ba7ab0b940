//! Move files and folders.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use cabinet_core::result::AppResult;
use cabinet_core::types::{FolderId, NodeRef, ProjectId};
use cabinet_service::relocation::NodeStatus;
use cabinet_service::MoveReport;

use super::{Session, parse_node, partial_failure};
use crate::output::{self, OutputFormat};

/// Arguments for the move command
#[derive(Debug, Args)]
pub struct MoveArgs {
    /// Nodes to move (`file:ID`, `folder:ID`)
    #[arg(required = true, value_parser = parse_node)]
    pub nodes: Vec<NodeRef>,
    /// Destination project ID
    #[arg(short, long)]
    pub to_project: ProjectId,
    /// Destination folder ID (omit for the project root)
    #[arg(long)]
    pub to_folder: Option<FolderId>,
}

/// Per-node outcome row
#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    /// Node
    node: String,
    /// Status
    status: String,
    /// Reason
    reason: String,
}

/// Print a move report and fail when any node failed.
pub fn print_report(report: &MoveReport, format: OutputFormat) -> AppResult<()> {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = report
                .outcomes
                .iter()
                .map(|o| {
                    let (status, reason) = match &o.status {
                        NodeStatus::Moved => ("moved", String::new()),
                        NodeStatus::Unchanged => ("unchanged", String::new()),
                        NodeStatus::Failed(f) => ("failed", format!("{:?}: {}", f.kind, f.message)),
                    };
                    OutcomeRow {
                        node: o.node.to_string(),
                        status: status.to_string(),
                        reason,
                    }
                })
                .collect();
            output::print_list(&rows, format);
        }
    }
    partial_failure(report.failed().count(), report.outcomes.len())
}

/// Execute the move command
pub async fn execute(args: &MoveArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let report = session
        .cabinet()
        .relocation()
        .move_nodes(session.ctx(), &args.nodes, args.to_project, args.to_folder)
        .await?;
    // successful nodes are committed even when others failed
    session.persist().await?;
    print_report(&report, format)
}
