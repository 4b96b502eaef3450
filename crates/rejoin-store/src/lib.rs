//! Rejoin Store
//!
//! Repositories the handlers talk to:
//! - [`PersistedStateStore`]: captured member state per (community, member)
//! - [`AllowedCommunities`]: which communities the service runs in
//!
//! Both are traits so a deployment can plug in its own database; in-memory
//! and JSON-file implementations are provided.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use file::JsonFileStateStore;
pub use memory::{MemoryAllowList, MemoryStateStore};
pub use traits::{
    AllowedCommunities, AllowedCommunity, ApiPermission, ApiPermissionKind, PersistedStateStore,
};
