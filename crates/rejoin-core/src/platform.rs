//! Community platform seam
//!
//! The handlers only ever ask the platform for one thing: apply a profile
//! edit to a member. Connection handling and event delivery live with
//! whoever drives [`PersistService`](crate::PersistService).

use crate::error::PlatformError;
use async_trait::async_trait;
use rejoin_types::{CommunityId, MemberEdit, MemberId};

/// Audit reason attached to restoring edits
pub const RESTORE_REASON: &str = "Restored upon rejoin";

/// Member-edit API of the community platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityPlatform: Send + Sync {
    /// Apply `edit` to a member in one call
    ///
    /// Must be idempotent: re-applying the same edit leaves the member
    /// unchanged.
    async fn edit_member_profile(
        &self,
        community: &CommunityId,
        member: &MemberId,
        edit: MemberEdit,
        reason: &str,
    ) -> Result<(), PlatformError>;
}

/// Platform client that only logs edits
///
/// Used for dry runs and event replays where no live connection exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPlatform;

#[async_trait]
impl CommunityPlatform for LoggingPlatform {
    async fn edit_member_profile(
        &self,
        community: &CommunityId,
        member: &MemberId,
        edit: MemberEdit,
        reason: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(
            community = %community,
            member = %member,
            roles = ?edit.roles,
            nickname = ?edit.nickname,
            reason,
            "edit member profile"
        );
        Ok(())
    }
}
