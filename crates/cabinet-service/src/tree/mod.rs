//! The project forest and its shared handle.

pub mod store;

use std::sync::Arc;

use tokio::sync::RwLock;

pub use store::{TreeStore, validate_name};

/// The forest shared by every service.
///
/// Hold the lock only for in-memory work; never across object store I/O.
pub type SharedTree = Arc<RwLock<TreeStore>>;

/// Wrap a store for sharing.
pub fn shared(store: TreeStore) -> SharedTree {
    Arc::new(RwLock::new(store))
}
