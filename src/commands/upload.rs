//! Upload a local file.

use std::path::PathBuf;

use clap::Args;
use tokio_util::io::ReaderStream;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::ByteStream;
use cabinet_core::types::{FolderId, ProjectId};
use cabinet_entity::file::CreateFile;

use super::Session;
use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for the upload command
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Local file to upload
    pub path: PathBuf,
    /// Destination project ID
    #[arg(short, long)]
    pub project: ProjectId,
    /// Destination folder ID (omit for the project root)
    #[arg(long)]
    pub folder: Option<FolderId>,
    /// Name in the cabinet (defaults to the local file name)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Make the file public
    #[arg(long)]
    pub public: bool,
}

/// Execute the upload command
pub async fn execute(args: &UploadArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::validation(format!("Cannot take a name from {}", args.path.display()))
            })?,
    };

    let local = tokio::fs::File::open(&args.path).await?;
    let stream: ByteStream = Box::pin(ReaderStream::new(local));

    let ctx = session.ctx();
    let file = session
        .cabinet()
        .service()
        .upload_file(
            ctx,
            CreateFile {
                project_id: args.project,
                folder_id: args.folder,
                name,
                remote_key: None,
                is_public: args.public,
                owner_id: ctx.user_id,
            },
            stream,
        )
        .await?;
    session.persist().await?;

    match format {
        OutputFormat::Json => output::print_json(&file),
        OutputFormat::Table => output::print_success(&format!(
            "Uploaded '{}' as file {} ({}, key {})",
            file.name,
            file.id,
            format_bytes(file.size_bytes),
            file.remote_key
        )),
    }
    Ok(())
}
