//! Capture and restore planning
//!
//! Pure functions of (config, state). The handlers run these and then
//! perform whatever IO the plan calls for.

use indexmap::IndexSet;
use rejoin_types::{MemberEdit, MemberSnapshot, PersistedStateRecord, RestoreConfig, RestoredField, RoleId};

/// Decide what to keep for a departing member
///
/// Returns `None` when nothing qualifies, so no empty record is written.
#[must_use]
pub fn plan_departure(config: &RestoreConfig, member: &MemberSnapshot) -> Option<PersistedStateRecord> {
    let mut persist = false;
    let mut record = PersistedStateRecord::new();

    if config.has_persisted_roles() && !member.roles.is_empty() {
        let roles = config.eligible_roles(&member.roles);
        if !roles.is_empty() {
            persist = true;
            record.roles = roles;
        }
    }

    if config.persist_nicknames {
        if let Some(nickname) = member.non_empty_nickname() {
            persist = true;
            record.nickname = Some(nickname.to_string());
        }
    }

    persist.then_some(record)
}

/// Profile edit restoring a member, and which categories it covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePlan {
    /// Edit to send in one call
    pub edit: MemberEdit,
    /// Categories in the order they were matched
    pub restored: Vec<RestoredField>,
}

impl RestorePlan {
    /// True when nothing in the record matched the config
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty()
    }

    /// Audit label, e.g. `"roles, nickname"`
    #[inline]
    #[must_use]
    pub fn restored_data(&self) -> String {
        RestoredField::join(&self.restored)
    }
}

/// Decide what to bring back for a rejoining member
///
/// `live_roles` are the roles the platform granted on join. The planned
/// role list is the union of restorable and live roles, so a restore never
/// removes a role the member currently holds.
#[must_use]
pub fn plan_restore(
    config: &RestoreConfig,
    record: &PersistedStateRecord,
    live_roles: &[RoleId],
) -> RestorePlan {
    let mut plan = RestorePlan::default();

    if config.has_persisted_roles() {
        let to_restore = config.eligible_roles(&record.roles);
        if !to_restore.is_empty() {
            plan.restored.push(RestoredField::Roles);
            plan.edit.roles = Some(union_roles(&to_restore, live_roles));
        }
    }

    if config.persist_nicknames {
        if let Some(nickname) = record.nickname.as_deref().filter(|n| !n.is_empty()) {
            plan.restored.push(RestoredField::Nickname);
            plan.edit.nickname = Some(nickname.to_string());
        }
    }

    plan
}

/// Restored roles first, then live roles, without duplicates
#[must_use]
pub fn union_roles(restored: &[RoleId], live: &[RoleId]) -> Vec<RoleId> {
    restored
        .iter()
        .chain(live)
        .cloned()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
