//! # cabinet-database
//!
//! PostgreSQL connection management and repository implementations for
//! the File Cabinet project forest.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::ForestRepository;
