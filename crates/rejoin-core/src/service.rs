//! Event dispatcher
//!
//! Wires the handlers to their collaborators and routes platform events.
//! Events for communities that are not allow-listed are dropped, since the
//! service is not loaded there.

use crate::arrival::{ArrivalOutcome, HandlerOptions, MemberArrivalHandler};
use crate::audit::AuditSink;
use crate::config::ConfigSource;
use crate::departure::{DepartureOutcome, MemberDepartureHandler};
use crate::error::PersistError;
use crate::event::MemberEvent;
use crate::platform::CommunityPlatform;
use rejoin_store::{AllowedCommunities, PersistedStateStore};
use rejoin_types::MemberId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

/// Result of dispatching one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Community not allow-listed
    Skipped,
    /// Departure handled
    Departed(DepartureOutcome),
    /// Arrival handled
    Arrived(ArrivalOutcome),
}

/// Counters collected by [`PersistService::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Events received
    pub events: usize,
    /// Events for non-allowed communities
    pub skipped: usize,
    /// Departures that wrote a record
    pub persisted: usize,
    /// Departures with nothing to keep
    pub nothing_to_persist: usize,
    /// Arrivals that restored state
    pub restored: usize,
    /// Arrivals with no record
    pub no_record: usize,
    /// Arrivals whose record matched nothing
    pub unmatched: usize,
    /// Events that ended in an error
    pub failed: usize,
}

impl ServiceStats {
    fn record(&mut self, result: &Result<EventOutcome, PersistError>) {
        self.events += 1;
        match result {
            Ok(EventOutcome::Skipped) => self.skipped += 1,
            Ok(EventOutcome::Departed(DepartureOutcome::Persisted(_))) => self.persisted += 1,
            Ok(EventOutcome::Departed(DepartureOutcome::NothingToPersist)) => {
                self.nothing_to_persist += 1;
            }
            Ok(EventOutcome::Arrived(ArrivalOutcome::Restored { .. })) => self.restored += 1,
            Ok(EventOutcome::Arrived(ArrivalOutcome::NoRecord)) => self.no_record += 1,
            Ok(EventOutcome::Arrived(ArrivalOutcome::NothingMatched { .. })) => {
                self.unmatched += 1;
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Persist service: departure capture plus arrival restore
pub struct PersistService {
    departures: MemberDepartureHandler,
    arrivals: MemberArrivalHandler,
    config: Arc<dyn ConfigSource>,
    allow_list: Arc<dyn AllowedCommunities>,
}

impl std::fmt::Debug for PersistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistService")
            .field("departures", &self.departures)
            .field("arrivals", &self.arrivals)
            .finish_non_exhaustive()
    }
}

impl PersistService {
    /// Create service over its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistedStateStore>,
        platform: Arc<dyn CommunityPlatform>,
        audit: Arc<dyn AuditSink>,
        allow_list: Arc<dyn AllowedCommunities>,
        config: Arc<dyn ConfigSource>,
        options: HandlerOptions,
    ) -> Self {
        Self {
            departures: MemberDepartureHandler::new(Arc::clone(&store)),
            arrivals: MemberArrivalHandler::new(store, platform, audit, options),
            config,
            allow_list,
        }
    }

    /// Arrival handler, for callers that drive it directly
    #[inline]
    #[must_use]
    pub fn arrivals(&self) -> &MemberArrivalHandler {
        &self.arrivals
    }

    /// Departure handler, for callers that drive it directly
    #[inline]
    #[must_use]
    pub fn departures(&self) -> &MemberDepartureHandler {
        &self.departures
    }

    /// Handle one event with a fresh config snapshot
    ///
    /// # Errors
    /// Propagates store, lock and platform errors from the handlers, and
    /// store errors from the allow-list lookup.
    pub async fn dispatch(&self, event: &MemberEvent) -> Result<EventOutcome, PersistError> {
        let community = event.community_id();

        if !self.allow_list.is_allowed(community).await? {
            tracing::debug!(community = %community, "community not allow-listed, event skipped");
            return Ok(EventOutcome::Skipped);
        }

        let config = self.config.snapshot(community);

        match event {
            MemberEvent::Departed(e) => self
                .departures
                .handle(e, &config)
                .await
                .map(EventOutcome::Departed),
            MemberEvent::Arrived(e) => self
                .arrivals
                .handle(e, &config)
                .await
                .map(EventOutcome::Arrived),
        }
    }

    /// Consume events until the channel closes
    ///
    /// Each event runs in its own task. Tasks for the same member are
    /// chained, so that member's events finish in receive order, while
    /// different members proceed concurrently.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<MemberEvent>) -> ServiceStats {
        let mut stats = ServiceStats::default();
        let mut tasks = JoinSet::new();
        let mut tails = Tails::new();
        let mut seq = 0_u64;

        while let Some(event) = events.recv().await {
            seq += 1;
            let member = event.member().id.clone();
            let (finished, next) = oneshot::channel();
            let prev = tails.insert(member.clone(), (seq, next)).map(|(_, rx)| rx);

            let service = Arc::clone(&self);
            tasks.spawn(async move {
                if let Some(prev) = prev {
                    // Err only if the earlier task panicked
                    let _ = prev.await;
                }
                let result = service.dispatch(&event).await;
                if let Err(e) = &result {
                    log_failure(&event, e);
                }
                let _ = finished.send(());
                Finished {
                    member,
                    seq,
                    result,
                }
            });

            // Reap finished tasks without waiting
            while let Some(done) = tasks.try_join_next() {
                collect(&mut stats, &mut tails, done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            collect(&mut stats, &mut tails, done);
        }

        tracing::info!(?stats, "event stream closed");
        stats
    }
}

/// Completed event task
struct Finished {
    member: MemberId,
    seq: u64,
    result: Result<EventOutcome, PersistError>,
}

type Tails = HashMap<MemberId, (u64, oneshot::Receiver<()>)>;

fn collect(
    stats: &mut ServiceStats,
    tails: &mut Tails,
    done: Result<Finished, tokio::task::JoinError>,
) {
    match done {
        Ok(finished) => {
            // Drop the chain entry unless a newer event for the member is queued
            if tails
                .get(&finished.member)
                .is_some_and(|(seq, _)| *seq == finished.seq)
            {
                tails.remove(&finished.member);
            }
            stats.record(&finished.result);
        }
        Err(e) => {
            tracing::error!(error = %e, "event task panicked");
            stats.events += 1;
            stats.failed += 1;
        }
    }
}

fn log_failure(event: &MemberEvent, error: &PersistError) {
    let community = event.community_id();
    let member = &event.member().id;
    if error.is_fatal() {
        tracing::error!(community = %community, member = %member, error = %error, "event handling failed");
    } else {
        tracing::warn!(
            community = %community,
            member = %member,
            error = %error,
            retryable = error.is_retryable(),
            "event handling failed"
        );
    }
}
