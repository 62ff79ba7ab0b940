//! Identity and display path resolution.

pub mod resolver;

pub use resolver::PathResolver;
