//! Platform identifiers
//!
//! Communities, members and roles are identified by opaque platform strings
//! (snowflakes on most platforms). Member identifiers are globally unique,
//! so a member id alone is enough to key per-member locks.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create identifier from any string-like value
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Managed community (guild) identifier
    CommunityId
);

string_id!(
    /// Platform user identifier, unique across communities
    MemberId
);

string_id!(
    /// Role identifier within a community
    RoleId
);

/// Convert a list of string literals into role ids
#[must_use]
pub fn roles<I, S>(ids: I) -> Vec<RoleId>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(RoleId::new).collect()
}
