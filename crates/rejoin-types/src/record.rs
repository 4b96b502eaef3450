//! Persisted member state

use crate::ids::RoleId;
use serde::{Deserialize, Serialize};

/// State captured when a member leaves, keyed by (community, member)
///
/// Records are always written whole. Absent fields mean "nothing captured",
/// not "clear on restore".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStateRecord {
    /// Eligible roles the member held at departure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleId>,
    /// Nickname at departure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl PersistedStateRecord {
    /// Create empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With roles
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<RoleId>) -> Self {
        self.roles = roles;
        self
    }

    /// With nickname
    #[inline]
    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// True when nothing was captured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.nickname.as_deref().map_or(true, str::is_empty)
    }
}
