//! Departure handling
//!
//! Captures qualifying state and overwrites any earlier record for the
//! member. Takes no lock: a member cannot leave twice without rejoining,
//! and a racing arrival is serialized on the arrival side.

use crate::error::PersistError;
use crate::event::MemberDeparted;
use crate::merge::plan_departure;
use rejoin_store::PersistedStateStore;
use rejoin_types::{PersistedStateRecord, RestoreConfig};
use std::sync::Arc;

/// Result of one departure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartureOutcome {
    /// Nothing qualified; store untouched
    NothingToPersist,
    /// Record written, replacing any previous one
    Persisted(PersistedStateRecord),
}

/// Handles member-left events
#[derive(Clone)]
pub struct MemberDepartureHandler {
    store: Arc<dyn PersistedStateStore>,
}

impl std::fmt::Debug for MemberDepartureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberDepartureHandler").finish_non_exhaustive()
    }
}

impl MemberDepartureHandler {
    /// Create handler over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn PersistedStateStore>) -> Self {
        Self { store }
    }

    /// Persist whatever `config` says to keep for the departing member
    ///
    /// # Errors
    /// - `PersistError::Store` if the write fails
    pub async fn handle(
        &self,
        event: &MemberDeparted,
        config: &RestoreConfig,
    ) -> Result<DepartureOutcome, PersistError> {
        let member = &event.member;

        let Some(record) = plan_departure(config, member) else {
            tracing::debug!(
                community = %event.community_id,
                member = %member.id,
                "nothing to persist"
            );
            return Ok(DepartureOutcome::NothingToPersist);
        };

        self.store
            .set(&event.community_id, &member.id, record.clone())
            .await?;

        tracing::info!(
            community = %event.community_id,
            member = %member.id,
            roles = record.roles.len(),
            nickname = record.nickname.is_some(),
            "persisted member state"
        );

        Ok(DepartureOutcome::Persisted(record))
    }
}
