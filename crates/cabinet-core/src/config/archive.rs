//! Archive output configuration.

use serde::{Deserialize, Serialize};

/// Compression applied to archive members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    /// Deflate every member.
    #[default]
    Deflated,
    /// Store members uncompressed.
    Stored,
}

/// Archive output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Member compression.
    #[serde(default)]
    pub compression: ArchiveCompression,
    /// Archive name used when several projects are combined.
    #[serde(default = "default_merged_name")]
    pub merged_name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression: ArchiveCompression::default(),
            merged_name: default_merged_name(),
        }
    }
}

fn default_merged_name() -> String {
    "projects".to_string()
}
