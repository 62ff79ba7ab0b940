//! Domain events emitted when the project forest changes.

pub mod tree;

pub use tree::TreeEvent;
