//! Project entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cabinet_core::types::{ProjectId, UserId};

/// A project: the root container of a folder/file tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Unique project name.
    pub name: String,
    /// Public-link token, assigned once and never changed.
    pub slug: Option<String>,
    /// The project owner.
    pub owner_id: Option<UserId>,
    /// Whether any descendant is public.
    pub is_public: bool,
    /// Sum of all descendant file sizes.
    pub size_bytes: i64,
    /// Users with access to the project.
    #[sqlx(skip)]
    #[serde(default)]
    pub members: Vec<UserId>,
    /// Who last touched the project or one of its nodes.
    pub updated_by: Option<UserId>,
    /// When the project was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Project name.
    pub name: String,
    /// The project owner.
    pub owner_id: Option<UserId>,
}
