//! # cabinet-service
//!
//! The hierarchical relocation and archival core of File Cabinet.
//!
//! - [`TreeStore`]: the project forest with its sibling-name and
//!   same-project invariants.
//! - [`PathResolver`]: identity paths (object key prefixes) and display
//!   paths (archive and UI names).
//! - [`AggregatePropagator`]: keeps cached sizes and visibility consistent.
//! - [`RelocationEngine`]: moves and renames nodes, relocating blobs.
//! - [`ArchiveBuilder`]: streams ZIP archives of planned subtrees.
//! - [`CabinetService`]: create/upload/delete entry points.
//!
//! Services share one [`SharedTree`] and one [`ObjectStoreGateway`]; see
//! [`Cabinet`] for the wiring.
//!
//! [`ObjectStoreGateway`]: cabinet_storage::ObjectStoreGateway

pub mod aggregate;
pub mod archive;
pub mod cabinet;
pub mod context;
pub mod events;
pub mod ingest;
pub mod path;
pub mod relocation;
pub mod slug;
pub mod tree;

pub use aggregate::{AggregatePropagator, RecalculateReport, VisibilityReport};
pub use archive::{ArchiveBuilder, ArchiveEntry, ArchivePlan, ArchivePlanner};
pub use cabinet::{Cabinet, CabinetService};
pub use context::ActorContext;
pub use events::EventBus;
pub use ingest::MailIngest;
pub use path::PathResolver;
pub use relocation::{MoveReport, NodeOutcome, ProjectLocks, RelocationEngine};
pub use tree::{SharedTree, TreeStore};
