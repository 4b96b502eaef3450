//! Storage seams
//!
//! Persisted member state and the community allow-list.

use crate::error::StoreError;
use async_trait::async_trait;
use rejoin_types::{CommunityId, MemberId, PersistedStateRecord};
use serde::{Deserialize, Serialize};

/// Durable mapping from (community, member) to the captured record
///
/// Each operation on a single key must be linearizable. The store takes
/// no part in serializing a member's read-merge-clear cycle; callers lock.
#[async_trait]
pub trait PersistedStateStore: Send + Sync {
    /// Get the record for a member, if one exists
    async fn find(
        &self,
        community: &CommunityId,
        member: &MemberId,
    ) -> Result<Option<PersistedStateRecord>, StoreError>;

    /// Replace any existing record for a member
    async fn set(
        &self,
        community: &CommunityId,
        member: &MemberId,
        record: PersistedStateRecord,
    ) -> Result<(), StoreError>;

    /// Delete the record for a member.
    ///
    /// Returns `true` when a record was removed and `false` when there was
    /// none. A missing record is not an error.
    async fn clear(&self, community: &CommunityId, member: &MemberId) -> Result<bool, StoreError>;
}

/// A community the service is enabled for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedCommunity {
    pub id: CommunityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub owner_id: MemberId,
}

impl AllowedCommunity {
    /// Create entry with no icon
    #[must_use]
    pub fn new(
        id: impl Into<CommunityId>,
        name: impl Into<String>,
        owner_id: impl Into<MemberId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
            owner_id: owner_id.into(),
        }
    }
}

/// Who an API permission is granted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiPermissionKind {
    User,
    Role,
}

/// Grant of API access to a community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPermission {
    pub community_id: CommunityId,
    pub kind: ApiPermissionKind,
    pub target_id: String,
}

/// Read-mostly repository of communities the service runs in
#[async_trait]
pub trait AllowedCommunities: Send + Sync {
    /// Whether the community is allow-listed
    async fn is_allowed(&self, community: &CommunityId) -> Result<bool, StoreError>;

    /// Get a community entry
    async fn find(&self, community: &CommunityId) -> Result<Option<AllowedCommunity>, StoreError>;

    /// Communities a user holds a direct (`User`) API permission for
    async fn for_api_user(&self, user_id: &str) -> Result<Vec<AllowedCommunity>, StoreError>;

    /// Refresh display info for an allow-listed community.
    ///
    /// Communities that are not allow-listed are left alone.
    async fn update_info(
        &self,
        community: &CommunityId,
        name: &str,
        icon: Option<&str>,
        owner_id: &MemberId,
    ) -> Result<(), StoreError>;
}
