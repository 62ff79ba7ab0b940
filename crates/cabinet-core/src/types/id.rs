//! Newtype wrappers around `i64` for all tree node identifiers.
//!
//! Using distinct types prevents accidentally passing a `FolderId` where a
//! `FileId` is expected. Identifiers are numeric because they double as
//! segments of the identity path (`{project}/{folder}/…`). When the `sqlx`
//! feature is enabled each ID type also implements `sqlx::Type`,
//! `sqlx::Encode`, and `sqlx::Decode` as a PostgreSQL `BIGINT`.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `i64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the inner integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i64 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <i64 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a project (tree root).
    ProjectId
);

define_id!(
    /// Unique identifier for a folder.
    FolderId
);

define_id!(
    /// Unique identifier for a file.
    FileId
);

define_id!(
    /// Unique identifier for a user.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_plain_number() {
        assert_eq!(FolderId(42).to_string(), "42");
    }

    #[test]
    fn test_from_str() {
        let id: FileId = " 17 ".parse().expect("should parse");
        assert_eq!(id, FileId(17));
        assert!("abc".parse::<ProjectId>().is_err());
    }

    #[test]
    fn test_ordering_follows_number() {
        let mut ids = vec![FileId(3), FileId(1), FileId(2)];
        ids.sort();
        assert_eq!(ids, vec![FileId(1), FileId(2), FileId(3)]);
    }
}
