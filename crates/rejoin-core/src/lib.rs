//! Rejoin Core
//!
//! Keeps a configured subset of member state across leave and rejoin:
//! - On departure, captures eligible roles and the nickname
//! - On arrival, merges captured roles with the join-time roles, applies
//!   one profile edit and clears the record
//! - Serializes concurrent arrivals for the same member with a keyed lock
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin_core::prelude::*;
//!
//! # async fn example(service: PersistService) -> Result<(), PersistError> {
//! let event = MemberEvent::arrived("guild", MemberSnapshot::new("1234"));
//! let outcome = service.dispatch(&event).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod arrival;
pub mod audit;
pub mod config;
pub mod departure;
pub mod error;
pub mod event;
pub mod merge;
pub mod platform;
pub mod service;

// Re-exports for convenience
pub use arrival::{
    member_lock_key, ArrivalOutcome, HandlerOptions, MemberArrivalHandler, UnmatchedRecordPolicy,
};
pub use audit::{AuditEvent, AuditKind, AuditSink, MemoryAuditLog, TracingAuditSink};
pub use config::{ConfigSource, LockSettings, ServiceConfig, StaticConfigSource};
pub use departure::{DepartureOutcome, MemberDepartureHandler};
pub use error::{ConfigError, PersistError, PlatformError};
pub use event::{MemberArrived, MemberDeparted, MemberEvent};
pub use merge::{plan_departure, plan_restore, union_roles, RestorePlan};
pub use platform::{CommunityPlatform, LoggingPlatform, RESTORE_REASON};
pub use service::{EventOutcome, PersistService, ServiceStats};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Rejoin Core
    pub use crate::{
        ArrivalOutcome, CommunityPlatform, DepartureOutcome, EventOutcome, HandlerOptions,
        MemberEvent, PersistError, PersistService, ServiceConfig,
    };
    pub use rejoin_types::{CommunityId, MemberId, MemberSnapshot, RestoreConfig, RoleId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
