//! # cabinet-storage
//!
//! Object store implementations for File Cabinet and the
//! [`ObjectStoreGateway`], the only component that talks to a blob store.
//! Supports an in-memory store, the local filesystem, and S3-compatible
//! buckets.

pub mod factory;
pub mod gateway;
pub mod providers;

pub use factory::{build_gateway, build_store};
pub use gateway::ObjectStoreGateway;
