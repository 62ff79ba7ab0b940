//! Visibility commands.

use clap::{Args, Subcommand};

use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, NodeRef};

use super::{Session, parse_node};
use crate::output::{self, OutputFormat};

/// Arguments for share commands
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Share subcommand
    #[command(subcommand)]
    pub command: ShareCommand,
}

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Make every file under a node public or private
    Bulk {
        /// `project:ID` or `folder:ID`
        #[arg(value_parser = parse_node)]
        node: NodeRef,
        /// Make files private instead of public
        #[arg(long)]
        private: bool,
        /// Keep the first file of the subtree public
        #[arg(long)]
        keep_first: bool,
    },
    /// Make one file public or private
    File {
        /// File ID
        id: FileId,
        /// Make the file private instead of public
        #[arg(long)]
        private: bool,
    },
    /// Report whether every file under a node is public
    Check {
        /// `project:ID`, `folder:ID`, or `file:ID`
        #[arg(value_parser = parse_node)]
        node: NodeRef,
    },
}

/// Execute share commands
pub async fn execute(args: &ShareArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let propagator = session.cabinet().propagator();
    let ctx = session.ctx();

    match &args.command {
        ShareCommand::Bulk {
            node,
            private,
            keep_first,
        } => {
            let report = propagator
                .bulk_set_visibility(ctx, *node, !private, *keep_first)
                .await?;
            session.persist().await?;
            match format {
                OutputFormat::Json => output::print_json(&report),
                OutputFormat::Table => {
                    output::print_kv("Files", &report.files_total.to_string());
                    output::print_kv("Changed", &report.files_changed.to_string());
                    if let Some(id) = report.kept_public {
                        output::print_kv("Kept public", &id.to_string());
                    }
                }
            }
        }
        ShareCommand::File { id, private } => {
            propagator.set_file_visibility(ctx, *id, !private).await?;
            session.persist().await?;
            let state = if *private { "private" } else { "public" };
            output::print_success(&format!("File {id} is {state}"));
        }
        ShareCommand::Check { node } => {
            let shared = propagator.check_shared(*node).await?;
            match format {
                OutputFormat::Json => {
                    output::print_json(&serde_json::json!({ "node": node, "shared": shared }))
                }
                OutputFormat::Table => output::print_kv("Shared", &shared.to_string()),
            }
        }
    }
    Ok(())
}
