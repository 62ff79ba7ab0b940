//! Repository implementations for the project forest.

pub mod file;
pub mod folder;
pub mod forest;
pub mod project;
pub mod quota;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use forest::ForestRepository;
pub use project::ProjectRepository;
pub use quota::QuotaRepository;

use cabinet_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning sibling-name violations into constraint errors.
pub(crate) fn db_error(e: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(constraint) = db_err.constraint() {
            if constraint.ends_with("_sibling_name_key") || constraint == "projects_name_key" {
                return AppError::constraint(format!("{context}: duplicate name ({constraint})"));
            }
        }
    }
    AppError::with_source(ErrorKind::Database, context.to_string(), e)
}
