//! Storage quota entities.

pub mod quota;

pub use quota::StorageQuota;
