//! Write ZIP archives.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_service::archive::CONTENT_TYPE;
use cabinet_service::ArchivePlan;

use super::{Session, parse_node};
use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for the archive command
#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// What to archive: one project or folder, several projects, or with
    /// `--parent` a selection of files and folders
    #[arg(required = true, value_parser = parse_node)]
    pub nodes: Vec<NodeRef>,
    /// Archive the nodes as a selection relative to this project or folder
    #[arg(long, value_parser = parse_node)]
    pub parent: Option<NodeRef>,
    /// Output path (defaults to the archive name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Written {
    path: String,
    entries: usize,
    bytes: u64,
    content_type: &'static str,
    content_disposition: String,
}

fn plan(
    session: &Session,
    tree: &cabinet_service::TreeStore,
    args: &ArchiveArgs,
) -> AppResult<ArchivePlan> {
    let planner = session.cabinet().planner();

    if let Some(parent) = args.parent {
        let mut files: Vec<FileId> = Vec::new();
        let mut folders: Vec<FolderId> = Vec::new();
        for node in &args.nodes {
            match node {
                NodeRef::File(id) => files.push(*id),
                NodeRef::Folder(id) => folders.push(*id),
                NodeRef::Project(_) => {
                    return Err(AppError::validation(format!("{node} cannot be selected")));
                }
            }
        }
        return planner.plan_selection(tree, parent, &files, &folders);
    }

    match args.nodes.as_slice() {
        [NodeRef::Project(id)] => planner.plan_project(tree, *id),
        [NodeRef::Folder(id)] => planner.plan_folder(tree, *id),
        nodes => {
            let projects = nodes
                .iter()
                .map(|node| match node {
                    NodeRef::Project(id) => Ok(*id),
                    other => Err(AppError::validation(format!(
                        "{other} needs --parent to be archived"
                    ))),
                })
                .collect::<AppResult<Vec<ProjectId>>>()?;
            planner.plan_projects(tree, &projects)
        }
    }
}

/// Execute the archive command
pub async fn execute(args: &ArchiveArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let plan = {
        let tree = session.cabinet().tree().read().await;
        plan(session, &tree, args)?
    };
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(plan.file_name()));
    let entries = plan.entries.len();
    let content_disposition = plan.content_disposition();

    let mut out = tokio::fs::File::create(&path).await?;
    let written = session.cabinet().archive_builder().write_to(plan, &mut out).await;
    let bytes = match written {
        Ok(bytes) => bytes,
        Err(e) => {
            // remove the partial archive
            drop(out);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                output::print_warning(&format!("Could not remove {}: {cleanup}", path.display()));
            }
            return Err(e);
        }
    };
    out.flush().await?;

    let report = Written {
        path: path.display().to_string(),
        entries,
        bytes,
        content_type: CONTENT_TYPE,
        content_disposition,
    };
    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => output::print_success(&format!(
            "Wrote {} ({} entries, {})",
            report.path,
            report.entries,
            format_bytes(i64::try_from(bytes).unwrap_or(i64::MAX))
        )),
    }
    Ok(())
}
