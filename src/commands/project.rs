//! Project, folder, and quota management commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FolderId, NodeRef, ProjectId};
use cabinet_entity::folder::CreateFolder;
use cabinet_entity::project::CreateProject;

use super::{Session, parse_node};
use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for project commands
#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project subcommand
    #[command(subcommand)]
    pub command: ProjectCommand,
}

/// Project subcommands
#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// List every project
    List,
    /// Create a new project
    Create {
        /// Project name
        name: String,
    },
    /// Create a folder
    Mkdir {
        /// Owning project ID
        #[arg(short, long)]
        project: ProjectId,
        /// Parent folder ID (omit for the project root)
        #[arg(long)]
        parent: Option<FolderId>,
        /// Folder name
        name: String,
    },
    /// Delete a file or folder together with its blobs
    Delete {
        /// `file:ID` or `folder:ID`
        #[arg(value_parser = parse_node)]
        node: NodeRef,
    },
    /// Print a node's public-link slug, assigning one if needed
    Slug {
        /// `project:ID`, `folder:ID`, or `file:ID`
        #[arg(value_parser = parse_node)]
        node: NodeRef,
    },
    /// Show used space, or replace the quota
    Usage {
        /// New quota in bytes
        #[arg(long)]
        set_quota: Option<i64>,
    },
}

/// Project display row
#[derive(Debug, Serialize, Tabled)]
struct ProjectRow {
    /// Project ID
    id: i64,
    /// Name
    name: String,
    /// Size
    size: String,
    /// Public
    public: bool,
    /// Slug
    slug: String,
    /// Updated at
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct Usage {
    used_bytes: i64,
    quota_bytes: i64,
    used_percent: u8,
}

/// Execute project commands
pub async fn execute(args: &ProjectArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let cabinet = session.cabinet();
    let service = cabinet.service();
    let ctx = session.ctx();

    match &args.command {
        ProjectCommand::List => {
            let rows: Vec<ProjectRow> = {
                let tree = cabinet.tree().read().await;
                tree.projects()
                    .map(|p| ProjectRow {
                        id: p.id.get(),
                        name: p.name.clone(),
                        size: format_bytes(p.size_bytes),
                        public: p.is_public,
                        slug: p.slug.clone().unwrap_or_default(),
                        updated_at: p.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    })
                    .collect()
            };
            output::print_list(&rows, format);
        }
        ProjectCommand::Create { name } => {
            let project = service
                .create_project(
                    ctx,
                    CreateProject {
                        name: name.clone(),
                        owner_id: ctx.user_id,
                    },
                )
                .await?;
            session.persist().await?;
            output::print_success(&format!("Project '{}' created (id {})", project.name, project.id));
        }
        ProjectCommand::Mkdir {
            project,
            parent,
            name,
        } => {
            let folder = service
                .create_folder(
                    ctx,
                    CreateFolder {
                        project_id: *project,
                        parent_id: *parent,
                        name: name.clone(),
                        owner_id: ctx.user_id,
                    },
                )
                .await?;
            session.persist().await?;
            output::print_success(&format!("Folder '{}' created (id {})", folder.name, folder.id));
        }
        ProjectCommand::Delete { node } => {
            let removed = match node {
                NodeRef::File(id) => vec![service.delete_file(ctx, *id).await?],
                NodeRef::Folder(id) => service.delete_folder(ctx, *id).await?,
                NodeRef::Project(_) => {
                    return Err(AppError::validation("Projects cannot be deleted here"));
                }
            };
            session.persist().await?;
            output::print_success(&format!("Deleted {node} ({} files)", removed.len()));
        }
        ProjectCommand::Slug { node } => {
            let slug = service.ensure_slug(*node).await?;
            session.persist().await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({ "node": node, "slug": slug })),
                OutputFormat::Table => println!("{slug}"),
            }
        }
        ProjectCommand::Usage { set_quota } => {
            if let Some(bytes) = set_quota {
                service.set_quota(*bytes).await?;
                session.persist().await?;
            }
            let usage = Usage {
                used_bytes: service.used_space().await,
                quota_bytes: service.quota().await.max_size_bytes,
                used_percent: service.used_space_percent().await,
            };
            match format {
                OutputFormat::Json => output::print_json(&usage),
                OutputFormat::Table => {
                    output::print_kv("Used", &format_bytes(usage.used_bytes));
                    output::print_kv("Quota", &format_bytes(usage.quota_bytes));
                    output::print_kv("Used %", &usage.used_percent.to_string());
                }
            }
        }
    }

    Ok(())
}
