//! Relocation of nodes between folders and projects.

pub mod engine;
pub mod lock;
pub mod report;

pub use engine::RelocationEngine;
pub use lock::{ProjectGuards, ProjectLocks};
pub use report::{MoveReport, NodeFailure, NodeOutcome, NodeStatus};
