//! CLI command definitions and dispatch.

pub mod archive;
pub mod ingest;
pub mod project;
pub mod recalculate;
pub mod relocate;
pub mod rename;
pub mod share;
pub mod tree;
pub mod upload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use cabinet_core::config::AppConfig;
use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::NodeRef;
use cabinet_database::DatabasePool;
use cabinet_database::repositories::forest::ForestRepository;
use cabinet_entity::snapshot::ForestSnapshot;
use cabinet_service::{ActorContext, Cabinet};

use crate::output::OutputFormat;

/// File Cabinet: project trees backed by an object store
#[derive(Debug, Parser)]
#[command(name = "cabinet", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (extension optional)
    #[arg(short, long, global = true, default_value = "config/default")]
    pub config: String,

    /// Environment overlay, read from config/{env}
    #[arg(short, long, global = true, env = "CABINET_ENV", default_value = "development")]
    pub env: String,

    /// Keep the forest in this JSON file instead of the database
    #[arg(short, long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Project and folder management
    Project(project::ProjectArgs),
    /// Upload a local file into a project
    Upload(upload::UploadArgs),
    /// Print a project or folder tree with sizes and visibility
    Tree(tree::TreeArgs),
    /// Move files and folders to a destination
    Move(relocate::MoveArgs),
    /// Rename a project, folder, or file
    Rename(rename::RenameArgs),
    /// Write a ZIP archive of a project, folder, or selection
    Archive(archive::ArchiveArgs),
    /// Change file visibility
    Share(share::ShareArgs),
    /// Re-read blob sizes and rebuild every aggregate
    Recalculate(recalculate::RecalculateArgs),
    /// File mail attachments into projects
    Ingest(ingest::IngestArgs),
}

impl Cli {
    /// Load the configuration named by the global options.
    pub fn load_config(&self) -> AppResult<AppConfig> {
        AppConfig::load(&self.config, &self.env)
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        let session = Session::open(&config, self.snapshot.clone()).await?;
        match &self.command {
            Commands::Project(args) => project::execute(args, &session, self.format).await,
            Commands::Upload(args) => upload::execute(args, &session, self.format).await,
            Commands::Tree(args) => tree::execute(args, &session, self.format).await,
            Commands::Move(args) => relocate::execute(args, &session, self.format).await,
            Commands::Rename(args) => rename::execute(args, &session).await,
            Commands::Archive(args) => archive::execute(args, &session, self.format).await,
            Commands::Share(args) => share::execute(args, &session, self.format).await,
            Commands::Recalculate(args) => recalculate::execute(args, &session, self.format).await,
            Commands::Ingest(args) => ingest::execute(args, &session, self.format).await,
        }
    }
}

/// Where the forest is persisted between invocations.
#[derive(Debug)]
enum Backend {
    Snapshot(PathBuf),
    Database(ForestRepository),
}

/// A loaded cabinet plus the means to save it again.
#[derive(Debug)]
pub struct Session {
    cabinet: Cabinet,
    backend: Backend,
    ctx: ActorContext,
}

impl Session {
    /// Load the forest and wire the services around it.
    pub async fn open(config: &AppConfig, snapshot: Option<PathBuf>) -> AppResult<Self> {
        let gateway = cabinet_storage::build_gateway(&config.storage).await?;

        let (forest, backend) = match snapshot {
            Some(path) => (read_snapshot(&path).await?, Backend::Snapshot(path)),
            None => {
                let pool = DatabasePool::connect_and_migrate(&config.database).await?;
                let repo = ForestRepository::new(pool.pool().clone());
                (repo.load().await?, Backend::Database(repo))
            }
        };

        Ok(Self {
            cabinet: Cabinet::from_snapshot(forest, gateway, config)?,
            backend,
            ctx: ActorContext::system(),
        })
    }

    /// The wired services.
    pub fn cabinet(&self) -> &Cabinet {
        &self.cabinet
    }

    /// Context stamped onto mutated nodes.
    pub fn ctx(&self) -> &ActorContext {
        &self.ctx
    }

    /// Write the forest back after a mutation.
    pub async fn persist(&self) -> AppResult<()> {
        let snapshot = self.cabinet.snapshot().await;
        match &self.backend {
            Backend::Snapshot(path) => {
                let json = serde_json::to_vec_pretty(&snapshot)?;
                tokio::fs::write(path, json).await?;
                info!(path = %path.display(), nodes = snapshot.len(), "Snapshot written");
            }
            Backend::Database(repo) => repo.save(&snapshot).await?,
        }
        Ok(())
    }
}

/// Read a snapshot file; a missing file is an empty forest.
async fn read_snapshot(path: &std::path::Path) -> AppResult<ForestSnapshot> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(serde_json::from_slice(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot yet; starting empty");
            Ok(ForestSnapshot::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse `project:1`, `folder:2`, or `file:3`.
pub fn parse_node(raw: &str) -> Result<NodeRef, String> {
    let (kind, id) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:ID, got '{raw}'"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|e| format!("invalid id in '{raw}': {e}"))?;
    match kind {
        "project" | "p" => Ok(NodeRef::Project(id.into())),
        "folder" | "d" => Ok(NodeRef::Folder(id.into())),
        "file" | "f" => Ok(NodeRef::File(id.into())),
        other => Err(format!("unknown node kind '{other}'")),
    }
}

/// Report a batch in which some nodes failed as an error exit.
pub fn partial_failure(failed: usize, total: usize) -> AppResult<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(AppError::validation(format!("{failed} of {total} nodes failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_core::types::{FileId, FolderId};

    #[test]
    fn test_parse_node() {
        assert_eq!(parse_node("file:3"), Ok(NodeRef::File(FileId(3))));
        assert_eq!(parse_node("d:12"), Ok(NodeRef::Folder(FolderId(12))));
        assert!(parse_node("folder").is_err());
        assert!(parse_node("disk:1").is_err());
        assert!(parse_node("file:x").is_err());
    }

    #[test]
    fn test_cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cabinet", "tree", "project:1", "--format", "json", "--snapshot", "forest.json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.snapshot, Some(PathBuf::from("forest.json")));
        assert!(matches!(cli.command, Commands::Tree(_)));
    }
}
