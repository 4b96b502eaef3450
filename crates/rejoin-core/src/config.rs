//! Service configuration
//!
//! `ServiceConfig` is the on-disk shape (YAML or TOML). Handlers never see
//! it directly: they get one [`RestoreConfig`] snapshot per event from a
//! [`ConfigSource`].

use crate::arrival::{HandlerOptions, UnmatchedRecordPolicy};
use crate::error::ConfigError;
use parking_lot::RwLock;
use rejoin_locks::LockOptions;
use rejoin_store::AllowedCommunity;
use rejoin_types::{CommunityId, RestoreConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Lock bounds as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Give up waiting after this many milliseconds; 0 waits forever
    pub acquire_timeout_ms: u64,
    /// Warn when a wait exceeds this many milliseconds
    pub warn_after_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 30_000,
            warn_after_ms: 5_000,
        }
    }
}

impl From<LockSettings> for LockOptions {
    fn from(settings: LockSettings) -> Self {
        let timeout = (settings.acquire_timeout_ms > 0)
            .then(|| Duration::from_millis(settings.acquire_timeout_ms));
        LockOptions::new()
            .with_acquire_timeout(timeout)
            .with_warn_after(Duration::from_millis(settings.warn_after_ms))
    }
}

/// Whole-service configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Policy for communities without an explicit entry
    pub defaults: RestoreConfig,
    /// Per-community policy
    pub communities: BTreeMap<CommunityId, RestoreConfig>,
    /// Communities the service is enabled for
    pub allowed_communities: Vec<AllowedCommunity>,
    /// Member lock bounds
    pub lock: LockSettings,
    /// Fate of records nothing matches on rejoin
    pub unmatched_record: UnmatchedRecordPolicy,
}

impl ServiceConfig {
    /// Parse YAML
    ///
    /// # Errors
    /// - `ConfigError::Yaml` on malformed input
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Parse TOML
    ///
    /// # Errors
    /// - `ConfigError::Toml` on malformed input
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a `.yaml`, `.yml` or `.toml` file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::UnsupportedFormat` for other extensions
    /// - parse errors from the matching format
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        match format.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&read()?),
            Some("toml") => Self::from_toml_str(&read()?),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Handler options described by this file
    #[must_use]
    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions::new()
            .with_lock(self.lock.into())
            .with_unmatched_record(self.unmatched_record)
    }

    /// Effective policy for a community
    #[must_use]
    pub fn restore_config(&self, community: &CommunityId) -> &RestoreConfig {
        self.communities.get(community).unwrap_or(&self.defaults)
    }
}

/// Supplies the restore policy for a community
pub trait ConfigSource: Send + Sync {
    /// Owned copy of the current policy
    fn snapshot(&self, community: &CommunityId) -> RestoreConfig;
}

/// In-memory config source, replaceable at runtime
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    inner: RwLock<StaticConfig>,
}

#[derive(Debug, Default)]
struct StaticConfig {
    defaults: RestoreConfig,
    communities: BTreeMap<CommunityId, RestoreConfig>,
}

impl StaticConfigSource {
    /// Same policy for every community
    #[must_use]
    pub fn uniform(config: RestoreConfig) -> Self {
        Self {
            inner: RwLock::new(StaticConfig {
                defaults: config,
                communities: BTreeMap::new(),
            }),
        }
    }

    /// Build from a service config file
    #[must_use]
    pub fn from_service_config(config: &ServiceConfig) -> Self {
        let source = Self::default();
        source.reload(config);
        source
    }

    /// Replace every policy at once
    pub fn reload(&self, config: &ServiceConfig) {
        *self.inner.write() = StaticConfig {
            defaults: config.defaults.clone(),
            communities: config.communities.clone(),
        };
    }

    /// Replace one community's policy
    pub fn set(&self, community: CommunityId, config: RestoreConfig) {
        self.inner.write().communities.insert(community, config);
    }
}

impl ConfigSource for StaticConfigSource {
    fn snapshot(&self, community: &CommunityId) -> RestoreConfig {
        let inner = self.inner.read();
        inner
            .communities
            .get(community)
            .unwrap_or(&inner.defaults)
            .clone()
    }
}
