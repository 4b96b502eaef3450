//! Per-community restore policy

use crate::ids::RoleId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Which member state a community keeps across leave and rejoin
///
/// Read-only to the handlers: each event works on its own snapshot.
/// Shape validation belongs to whoever loads the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Roles eligible for persistence (matched as a set)
    #[serde(default)]
    pub persisted_roles: Vec<RoleId>,
    /// Whether nicknames are kept
    #[serde(default)]
    pub persist_nicknames: bool,
    /// Deprecated. Still accepted so older configs parse; has no effect.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub persist_voice_mutes: bool,
}

impl RestoreConfig {
    /// Create config that persists nothing
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With eligible roles
    #[inline]
    #[must_use]
    pub fn with_persisted_roles(mut self, roles: Vec<RoleId>) -> Self {
        self.persisted_roles = roles;
        self
    }

    /// With nickname persistence toggled
    #[inline]
    #[must_use]
    pub fn with_persist_nicknames(mut self, enabled: bool) -> Self {
        self.persist_nicknames = enabled;
        self
    }

    /// True when at least one role is eligible for persistence
    #[inline]
    #[must_use]
    pub fn has_persisted_roles(&self) -> bool {
        !self.persisted_roles.is_empty()
    }

    /// Intersect the eligible roles with `held`
    ///
    /// Result follows the configured order and contains no duplicates.
    #[must_use]
    pub fn eligible_roles(&self, held: &[RoleId]) -> Vec<RoleId> {
        let held: IndexSet<&RoleId> = held.iter().collect();
        self.persisted_roles
            .iter()
            .filter(|role| held.contains(role))
            .collect::<IndexSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }
}
