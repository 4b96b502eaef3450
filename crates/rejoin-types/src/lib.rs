//! Rejoin Types
//!
//! Plain data shared by every rejoin crate:
//! - Platform identifiers (communities, members, roles)
//! - Member snapshots carried by join and leave events
//! - Persisted-state records
//! - Per-community restore configuration

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod ids;
pub mod member;
pub mod record;

pub use config::RestoreConfig;
pub use ids::{roles, CommunityId, MemberId, RoleId};
pub use member::{MemberEdit, MemberSnapshot, RestoredField};
pub use record::PersistedStateRecord;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
