//! Storage quota model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The total capacity shared by every project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct StorageQuota {
    /// Maximum number of bytes across all projects.
    pub max_size_bytes: i64,
}

impl StorageQuota {
    /// Percentage of the quota consumed by `used` bytes, clamped to 100.
    ///
    /// A zero quota reports 100.
    pub fn used_percent(&self, used: i64) -> u8 {
        if self.max_size_bytes <= 0 {
            return 100;
        }
        let percent = used.max(0).saturating_mul(100) / self.max_size_bytes;
        percent.min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_percent() {
        let quota = StorageQuota {
            max_size_bytes: 1000,
        };
        assert_eq!(quota.used_percent(0), 0);
        assert_eq!(quota.used_percent(255), 25);
        assert_eq!(quota.used_percent(5000), 100);
    }

    #[test]
    fn test_zero_quota_is_full() {
        let quota = StorageQuota { max_size_bytes: 0 };
        assert_eq!(quota.used_percent(1), 100);
    }
}
