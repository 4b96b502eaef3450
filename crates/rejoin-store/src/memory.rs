//! In-memory repositories

use crate::error::StoreError;
use crate::traits::{
    AllowedCommunities, AllowedCommunity, ApiPermission, ApiPermissionKind, PersistedStateStore,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rejoin_types::{CommunityId, MemberId, PersistedStateRecord};

/// Persisted-state store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: DashMap<(CommunityId, MemberId), PersistedStateRecord>,
}

impl MemoryStateStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PersistedStateStore for MemoryStateStore {
    async fn find(
        &self,
        community: &CommunityId,
        member: &MemberId,
    ) -> Result<Option<PersistedStateRecord>, StoreError> {
        Ok(self
            .records
            .get(&(community.clone(), member.clone()))
            .map(|r| r.value().clone()))
    }

    async fn set(
        &self,
        community: &CommunityId,
        member: &MemberId,
        record: PersistedStateRecord,
    ) -> Result<(), StoreError> {
        self.records
            .insert((community.clone(), member.clone()), record);
        Ok(())
    }

    async fn clear(&self, community: &CommunityId, member: &MemberId) -> Result<bool, StoreError> {
        Ok(self
            .records
            .remove(&(community.clone(), member.clone()))
            .is_some())
    }
}

/// Allow-list held in process memory
#[derive(Debug, Default)]
pub struct MemoryAllowList {
    communities: DashMap<CommunityId, AllowedCommunity>,
    permissions: RwLock<Vec<ApiPermission>>,
}

impl MemoryAllowList {
    /// Create empty allow-list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of communities
    #[must_use]
    pub fn from_communities(communities: impl IntoIterator<Item = AllowedCommunity>) -> Self {
        let list = Self::new();
        for community in communities {
            list.allow(community);
        }
        list
    }

    /// Add or replace an entry
    pub fn allow(&self, community: AllowedCommunity) {
        self.communities.insert(community.id.clone(), community);
    }

    /// Remove an entry
    pub fn revoke(&self, community: &CommunityId) -> Option<AllowedCommunity> {
        self.communities.remove(community).map(|(_, c)| c)
    }

    /// Record an API permission grant
    pub fn grant(&self, permission: ApiPermission) {
        let mut permissions = self.permissions.write();
        if !permissions.contains(&permission) {
            permissions.push(permission);
        }
    }
}

#[async_trait]
impl AllowedCommunities for MemoryAllowList {
    async fn is_allowed(&self, community: &CommunityId) -> Result<bool, StoreError> {
        Ok(self.communities.contains_key(community))
    }

    async fn find(&self, community: &CommunityId) -> Result<Option<AllowedCommunity>, StoreError> {
        Ok(self.communities.get(community).map(|c| c.value().clone()))
    }

    async fn for_api_user(&self, user_id: &str) -> Result<Vec<AllowedCommunity>, StoreError> {
        let permissions = self.permissions.read();
        let mut found: Vec<AllowedCommunity> = permissions
            .iter()
            .filter(|p| p.kind == ApiPermissionKind::User && p.target_id == user_id)
            .filter_map(|p| self.communities.get(&p.community_id).map(|c| c.value().clone()))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        Ok(found)
    }

    async fn update_info(
        &self,
        community: &CommunityId,
        name: &str,
        icon: Option<&str>,
        owner_id: &MemberId,
    ) -> Result<(), StoreError> {
        if let Some(mut entry) = self.communities.get_mut(community) {
            entry.name = name.to_string();
            entry.icon = icon.map(str::to_string);
            entry.owner_id = owner_id.clone();
        }
        Ok(())
    }
}
