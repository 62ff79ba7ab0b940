//! # cabinet-core
//!
//! Core crate for File Cabinet. Contains the object store trait,
//! configuration schemas, typed identifiers, tree events, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other cabinet crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
