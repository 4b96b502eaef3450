//! Testing utilities for the rejoin workspace
//!
//! Shared fakes and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rejoin_core::{
    CommunityPlatform, HandlerOptions, MemoryAuditLog, PersistService, PlatformError,
    StaticConfigSource,
};
use rejoin_store::{
    AllowedCommunity, MemoryAllowList, MemoryStateStore, PersistedStateStore, StoreError,
};
use rejoin_types::{
    roles, CommunityId, MemberEdit, MemberId, PersistedStateRecord, RestoreConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const COMMUNITY: &str = "g1";

/// One call seen by [`RecordingPlatform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCall {
    pub community: CommunityId,
    pub member: MemberId,
    pub edit: MemberEdit,
    pub reason: String,
}

/// Platform fake that records edits, optionally slow or failing
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<EditCall>>,
    delay: Option<Duration>,
    fail_with: Mutex<Option<PlatformError>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every edit
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every edit with `error` until cleared
    pub fn fail_with(&self, error: Option<PlatformError>) {
        *self.fail_with.lock() = error;
    }

    pub fn calls(&self) -> Vec<EditCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommunityPlatform for RecordingPlatform {
    async fn edit_member_profile(
        &self,
        community: &CommunityId,
        member: &MemberId,
        edit: MemberEdit,
        reason: &str,
    ) -> Result<(), PlatformError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().push(EditCall {
            community: community.clone(),
            member: member.clone(),
            edit,
            reason: reason.to_string(),
        });

        match self.fail_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Store wrapper whose operations can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStateStore,
    fail_find: AtomicBool,
    fail_set: AtomicBool,
    fail_clear: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStateStore {
        &self.inner
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistedStateStore for FlakyStore {
    async fn find(
        &self,
        community: &CommunityId,
        member: &MemberId,
    ) -> Result<Option<PersistedStateRecord>, StoreError> {
        Self::check(&self.fail_find, "find")?;
        self.inner.find(community, member).await
    }

    async fn set(
        &self,
        community: &CommunityId,
        member: &MemberId,
        record: PersistedStateRecord,
    ) -> Result<(), StoreError> {
        Self::check(&self.fail_set, "set")?;
        self.inner.set(community, member, record).await
    }

    async fn clear(&self, community: &CommunityId, member: &MemberId) -> Result<bool, StoreError> {
        Self::check(&self.fail_clear, "clear")?;
        self.inner.clear(community, member).await
    }
}

/// `{persisted_roles: ["mod"], persist_nicknames: true}`
pub fn mod_config() -> RestoreConfig {
    RestoreConfig::new()
        .with_persisted_roles(roles(["mod"]))
        .with_persist_nicknames(true)
}

/// Service and its collaborators, wired for [`COMMUNITY`]
pub struct TestService {
    pub service: Arc<PersistService>,
    pub store: Arc<FlakyStore>,
    pub platform: Arc<RecordingPlatform>,
    pub audit: Arc<MemoryAuditLog>,
    pub config: Arc<StaticConfigSource>,
}

impl TestService {
    pub async fn record(&self, member: &str) -> Option<PersistedStateRecord> {
        self.store
            .inner()
            .find(&COMMUNITY.into(), &member.into())
            .await
            .unwrap_or_default()
    }
}

pub fn setup_service(config: RestoreConfig, platform: RecordingPlatform) -> TestService {
    setup_service_with(config, platform, HandlerOptions::new())
}

pub fn setup_service_with(
    config: RestoreConfig,
    platform: RecordingPlatform,
    options: HandlerOptions,
) -> TestService {
    let store = Arc::new(FlakyStore::new());
    let platform = Arc::new(platform);
    let audit = Arc::new(MemoryAuditLog::new());
    let config = Arc::new(StaticConfigSource::uniform(config));
    let allow = MemoryAllowList::from_communities([AllowedCommunity::new(COMMUNITY, "Test", "owner")]);

    let service = PersistService::new(
        store.clone(),
        platform.clone(),
        audit.clone(),
        Arc::new(allow),
        config.clone(),
        options,
    );

    TestService {
        service: Arc::new(service),
        store,
        platform,
        audit,
        config,
    }
}
