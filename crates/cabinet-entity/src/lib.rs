//! # cabinet-entity
//!
//! Domain entity models for File Cabinet. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities additionally derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod project;
pub mod snapshot;
pub mod storage;

pub use file::{CreateFile, File};
pub use folder::{CreateFolder, Folder, FolderNode};
pub use project::{CreateProject, Project};
pub use snapshot::ForestSnapshot;
pub use storage::StorageQuota;
