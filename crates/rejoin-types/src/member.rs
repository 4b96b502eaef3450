//! Member snapshots and profile edits

use crate::ids::{MemberId, RoleId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Member state as delivered by the platform with a join or leave event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// Member id
    pub id: MemberId,
    /// Roles currently held
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Community nickname, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl MemberSnapshot {
    /// Create snapshot with no roles and no nickname
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            nickname: None,
        }
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

    /// Nickname if set and non-empty
    #[inline]
    #[must_use]
    pub fn non_empty_nickname(&self) -> Option<&str> {
        self.nickname.as_deref().filter(|n| !n.is_empty())
    }
}

/// A single profile edit request
///
/// Only fields that are `Some` are changed. A `roles` value replaces the
/// member's entire role list, so callers must merge before building one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEdit {
    /// Full replacement role list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleId>>,
    /// New nickname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl MemberEdit {
    /// Create empty edit
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the edit would change nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_none() && self.nickname.is_none()
    }
}

/// Category of state brought back on rejoin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoredField {
    /// Role memberships
    Roles,
    /// Display nickname
    Nickname,
}

impl RestoredField {
    /// Audit label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roles => "roles",
            Self::Nickname => "nickname",
        }
    }

    /// Join labels the way audit entries show them (`"roles, nickname"`)
    #[must_use]
    pub fn join(fields: &[RestoredField]) -> String {
        fields
            .iter()
            .map(RestoredField::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RestoredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::roles;

    #[test]
    fn nickname_empty_string_is_absent() {
        let member = MemberSnapshot::new("1").with_nickname("");
        assert_eq!(member.non_empty_nickname(), None);

        let member = MemberSnapshot::new("1").with_nickname("Al");
        assert_eq!(member.non_empty_nickname(), Some("Al"));
    }

    #[test]
    fn member_edit_empty() {
        assert!(MemberEdit::new().is_empty());

        let edit = MemberEdit {
            roles: Some(roles(["mod"])),
            nickname: None,
        };
        assert!(!edit.is_empty());
    }

    #[test]
    fn restored_fields_join() {
        let joined = RestoredField::join(&[RestoredField::Roles, RestoredField::Nickname]);
        assert_eq!(joined, "roles, nickname");
        assert_eq!(RestoredField::join(&[]), "");
    }

    #[test]
    fn snapshot_deserializes_without_optional_fields() {
        let member: MemberSnapshot = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
        assert!(member.roles.is_empty());
        assert!(member.nickname.is_none());
    }
}
