//! ZIP archives of projects, folders, and selections.

pub mod builder;
pub mod planner;

pub use builder::{ArchiveBuilder, ArchiveStream};
pub use planner::{ArchiveEntry, ArchivePlan, ArchivePlanner, CONTENT_TYPE};
