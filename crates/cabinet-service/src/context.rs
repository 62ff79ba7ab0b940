//! Who is performing a mutation, and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cabinet_core::types::UserId;

/// Stamped onto every node a mutation touches (`updated_by`, `updated_at`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActorContext {
    /// The acting user; None for maintenance jobs and ingestion.
    pub user_id: Option<UserId>,
    /// When the operation started.
    pub at: DateTime<Utc>,
}

impl ActorContext {
    /// Context for a user-initiated operation.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            at: Utc::now(),
        }
    }

    /// Context for an operation with no acting user.
    pub fn system() -> Self {
        Self {
            user_id: None,
            at: Utc::now(),
        }
    }
}
