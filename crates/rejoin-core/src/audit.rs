//! Audit events for restorations
//!
//! Sinks are fire-and-forget: a failing sink must never undo or block a
//! restoration that already happened.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rejoin_types::{CommunityId, MemberSnapshot};
use serde::{Deserialize, Serialize};

/// Kind of audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// State was restored on rejoin
    MemberRestore,
    /// A restoration was attempted and failed
    MemberRestoreFailed,
}

/// Audit entry payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub community_id: CommunityId,
    /// Member as seen at join time
    pub member: MemberSnapshot,
    /// Restored categories, e.g. `"roles, nickname"`
    pub restored_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Successful restore entry
    #[must_use]
    pub fn member_restore(
        community_id: CommunityId,
        member: MemberSnapshot,
        restored_data: String,
    ) -> Self {
        Self {
            kind: AuditKind::MemberRestore,
            community_id,
            member,
            restored_data,
            error: None,
            at: Utc::now(),
        }
    }

    /// Failed restore entry
    #[must_use]
    pub fn member_restore_failed(
        community_id: CommunityId,
        member: MemberSnapshot,
        restored_data: String,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind: AuditKind::MemberRestoreFailed,
            community_id,
            member,
            restored_data,
            error: Some(error.into()),
            at: Utc::now(),
        }
    }
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    /// Record an entry
    fn log(&self, event: AuditEvent);
}

/// Emits audit entries as `tracing` records under `rejoin::audit`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, event: AuditEvent) {
        match event.kind {
            AuditKind::MemberRestore => tracing::info!(
                target: "rejoin::audit",
                kind = ?event.kind,
                community = %event.community_id,
                member = %event.member.id,
                restored_data = %event.restored_data,
                "member restored"
            ),
            AuditKind::MemberRestoreFailed => tracing::warn!(
                target: "rejoin::audit",
                kind = ?event.kind,
                community = %event.community_id,
                member = %event.member.id,
                restored_data = %event.restored_data,
                error = event.error.as_deref().unwrap_or_default(),
                "member restore failed"
            ),
        }
    }
}

/// Keeps audit entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all entries in arrival order
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }

    /// Entries of one kind
    #[must_use]
    pub fn of_kind(&self, kind: AuditKind) -> Vec<AuditEvent> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl AuditSink for MemoryAuditLog {
    fn log(&self, event: AuditEvent) {
        self.inner.lock().push(event);
    }
}
