//! Filing of mail attachments.

use clap::{Args, Subcommand};

use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, ProjectId};

use super::Session;
use super::relocate::print_report;
use crate::output::{self, OutputFormat};

/// Arguments for ingest commands
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Ingest subcommand
    #[command(subcommand)]
    pub command: IngestCommand,
}

/// Ingest subcommands
#[derive(Debug, Subcommand)]
pub enum IngestCommand {
    /// Move existing attachment records into a project
    Attach {
        /// Attachment file IDs
        #[arg(required = true)]
        files: Vec<FileId>,
        /// Destination project ID
        #[arg(short, long)]
        project: ProjectId,
        /// Destination folder ID (omit for the project root)
        #[arg(long)]
        folder: Option<FolderId>,
    },
    /// Create a record for a blob uploaded under a staging key
    Import {
        /// Staging key of the blob
        staged_key: String,
        /// Destination project ID
        #[arg(short, long)]
        project: ProjectId,
        /// Folder path below the project root, created as needed (`Mail/2024`)
        #[arg(long, default_value = "")]
        into: String,
        /// File name
        #[arg(short, long)]
        name: String,
    },
}

/// Execute ingest commands
pub async fn execute(args: &IngestArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let ingest = session.cabinet().ingest();
    let ctx = session.ctx();

    match &args.command {
        IngestCommand::Attach {
            files,
            project,
            folder,
        } => {
            let report = ingest.attach(ctx, files, *project, *folder).await?;
            session.persist().await?;
            print_report(&report, format)?;
        }
        IngestCommand::Import {
            staged_key,
            project,
            into,
            name,
        } => {
            let segments: Vec<&str> = into.split('/').filter(|s| !s.is_empty()).collect();
            match ingest
                .import_staged(ctx, staged_key, *project, &segments, name)
                .await?
            {
                Some(file) => {
                    session.persist().await?;
                    match format {
                        OutputFormat::Json => output::print_json(&file),
                        OutputFormat::Table => output::print_success(&format!(
                            "Filed '{}' as file {} (key {})",
                            file.name, file.id, file.remote_key
                        )),
                    }
                }
                None => output::print_warning(&format!(
                    "'{name}' is already filed there; blob left at {staged_key}"
                )),
            }
        }
    }
    Ok(())
}
