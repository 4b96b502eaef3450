//! Arrival handling
//!
//! Per member: `NoLock -> Locked -> (EarlyExit | Restoring) -> Unlocked`.
//!
//! The member lock is held from the store read through the profile edit
//! and the record clear, so duplicate joins cannot both restore from the
//! same record. The lock guard is released on every path, errors included.

use crate::audit::{AuditEvent, AuditSink};
use crate::error::PersistError;
use crate::event::MemberArrived;
use crate::merge::plan_restore;
use crate::platform::{CommunityPlatform, RESTORE_REASON};
use rejoin_locks::{KeyedLockManager, LockOptions};
use rejoin_store::PersistedStateStore;
use rejoin_types::{MemberEdit, MemberId, RestoreConfig, RestoredField};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lock key for a member's restore sequence
#[inline]
#[must_use]
pub fn member_lock_key(member: &MemberId) -> String {
    format!("member-roles-{member}")
}

/// What to do with a record none of whose fields match the current config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedRecordPolicy {
    /// Leave it for a future config that matches again
    #[default]
    Retain,
    /// Delete it
    Clear,
}

/// Handler tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Member lock bounds
    pub lock: LockOptions,
    /// Fate of unmatched records
    pub unmatched_record: UnmatchedRecordPolicy,
}

impl HandlerOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With lock options
    #[inline]
    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// With unmatched-record policy
    #[inline]
    #[must_use]
    pub fn with_unmatched_record(mut self, policy: UnmatchedRecordPolicy) -> Self {
        self.unmatched_record = policy;
        self
    }
}

/// Result of one arrival
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// No record for the member
    NoRecord,
    /// Record found but nothing in it matched the config
    NothingMatched {
        /// Whether the record was deleted
        cleared: bool,
    },
    /// Profile edited and record cleared
    Restored {
        /// Restored categories
        restored: Vec<RestoredField>,
        /// Edit that was applied
        edit: MemberEdit,
    },
}

/// Handles member-joined events
#[derive(Clone)]
pub struct MemberArrivalHandler {
    store: Arc<dyn PersistedStateStore>,
    platform: Arc<dyn CommunityPlatform>,
    audit: Arc<dyn AuditSink>,
    locks: KeyedLockManager,
    unmatched_record: UnmatchedRecordPolicy,
}

impl std::fmt::Debug for MemberArrivalHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberArrivalHandler")
            .field("locks", &self.locks)
            .field("unmatched_record", &self.unmatched_record)
            .finish_non_exhaustive()
    }
}

impl MemberArrivalHandler {
    /// Create handler with its own lock registry
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistedStateStore>,
        platform: Arc<dyn CommunityPlatform>,
        audit: Arc<dyn AuditSink>,
        options: HandlerOptions,
    ) -> Self {
        Self::with_locks(
            store,
            platform,
            audit,
            KeyedLockManager::with_options(options.lock),
            options.unmatched_record,
        )
    }

    /// Create handler sharing an existing lock registry
    #[must_use]
    pub fn with_locks(
        store: Arc<dyn PersistedStateStore>,
        platform: Arc<dyn CommunityPlatform>,
        audit: Arc<dyn AuditSink>,
        locks: KeyedLockManager,
        unmatched_record: UnmatchedRecordPolicy,
    ) -> Self {
        Self {
            store,
            platform,
            audit,
            locks,
            unmatched_record,
        }
    }

    /// Lock registry used for member locks
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &KeyedLockManager {
        &self.locks
    }

    /// Restore whatever the member's record and `config` agree on
    ///
    /// # Errors
    /// - `PersistError::Lock` if the member lock is starved
    /// - `PersistError::Store` if reading or clearing the record fails
    /// - `PersistError::ProfileEditRejected` if the platform refuses the
    ///   edit; the record is kept for a later attempt
    pub async fn handle(
        &self,
        event: &MemberArrived,
        config: &RestoreConfig,
    ) -> Result<ArrivalOutcome, PersistError> {
        let community = &event.community_id;
        let member = &event.member;

        let lock = self.locks.acquire(member_lock_key(&member.id)).await?;

        let Some(record) = self.store.find(community, &member.id).await? else {
            tracing::debug!(community = %community, member = %member.id, "no persisted state");
            return Ok(ArrivalOutcome::NoRecord);
        };

        let plan = plan_restore(config, &record, &member.roles);

        if plan.is_empty() {
            let cleared = match self.unmatched_record {
                UnmatchedRecordPolicy::Retain => false,
                UnmatchedRecordPolicy::Clear => self.store.clear(community, &member.id).await?,
            };
            tracing::debug!(
                community = %community,
                member = %member.id,
                cleared,
                "persisted state matches no restorable field"
            );
            return Ok(ArrivalOutcome::NothingMatched { cleared });
        }

        let restored_data = plan.restored_data();

        if let Err(source) = self
            .platform
            .edit_member_profile(community, &member.id, plan.edit.clone(), RESTORE_REASON)
            .await
        {
            tracing::warn!(
                community = %community,
                member = %member.id,
                error = %source,
                "restore edit failed, keeping persisted state"
            );
            self.audit.log(AuditEvent::member_restore_failed(
                community.clone(),
                member.clone(),
                restored_data,
                source.to_string(),
            ));
            return Err(PersistError::ProfileEditRejected {
                member: member.id.clone(),
                source,
            });
        }

        // Profile already edited; the kept record makes a later restore repeat it
        if let Err(e) = self.store.clear(community, &member.id).await {
            tracing::warn!(
                community = %community,
                member = %member.id,
                error = %e,
                "restored profile but could not clear persisted state"
            );
            self.audit.log(AuditEvent::member_restore_failed(
                community.clone(),
                member.clone(),
                restored_data,
                format!("persisted state not cleared: {e}"),
            ));
            return Err(e.into());
        }

        self.audit.log(AuditEvent::member_restore(
            community.clone(),
            member.clone(),
            restored_data.clone(),
        ));
        tracing::info!(
            community = %community,
            member = %member.id,
            restored = %restored_data,
            "restored member state"
        );

        lock.release();

        Ok(ArrivalOutcome::Restored {
            restored: plan.restored,
            edit: plan.edit,
        })
    }
}
