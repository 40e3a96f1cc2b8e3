//! # Panel Configuration
//!
//! Cache instances and adapter bindings, assembled once at process start and
//! immutable afterwards.
//!
//! ```toml
//! [caches.default]
//! backend = "local-memory"
//! location = "default"
//!
//! [caches.sessions]
//! backend = "redis"
//! location = "redis://localhost:6379/0"
//! key_prefix = "sessions"
//! abilities = { flush_cache = false }
//!
//! [panels.overrides]
//! memcached = "generic"
//!
//! [panels.extensions]
//! keydb = "custom:keydb"
//! ```
//!
//! Backend type identifiers are used as map keys, so they must not contain
//! dots.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::backends::expiration::default_ttl_from_seconds;
use crate::keys::{KeyCodec, DEFAULT_KEY_VERSION};
use crate::panel::Operation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default retention for writes that do not pass a timeout
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Default capacity of in-process tables
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default relational cache table name
pub const DEFAULT_CACHE_TABLE: &str = "cache_table";

fn default_version() -> u32 {
    DEFAULT_KEY_VERSION
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

/// Complete panel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Configured cache instances by name
    #[serde(default)]
    pub caches: BTreeMap<String, CacheInstanceConfig>,

    /// Adapter binding overrides and extensions
    #[serde(default)]
    pub panels: PanelBindingsConfig,
}

/// Backend-type to adapter-reference maps supplied by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelBindingsConfig {
    /// Replace the adapter bound to a built-in backend type
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,

    /// Bind additional backend types; wins over overrides
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

/// One configured cache instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInstanceConfig {
    /// Backend type identifier, e.g. `redis` or `local-memory`
    pub backend: String,

    /// Connection URL, directory or in-process table name, depending on the backend
    #[serde(default)]
    pub location: Option<String>,

    /// Relational cache table name
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub key_prefix: String,

    #[serde(default = "default_version")]
    pub version: u32,

    /// Default retention in seconds; 0 keeps entries until deleted
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,

    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Create the relational cache table on first use
    #[serde(default)]
    pub create_table: bool,

    /// Per-instance capability overrides
    #[serde(default)]
    pub abilities: BTreeMap<Operation, bool>,
}

impl CacheInstanceConfig {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            location: None,
            table: None,
            key_prefix: String::new(),
            version: DEFAULT_KEY_VERSION,
            default_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
            create_table: false,
            abilities: BTreeMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_default_timeout(mut self, seconds: u64) -> Self {
        self.default_timeout_seconds = seconds;
        self
    }

    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    pub fn with_ability(mut self, operation: Operation, enabled: bool) -> Self {
        self.abilities.insert(operation, enabled);
        self
    }

    pub fn codec(&self) -> KeyCodec {
        KeyCodec::new(self.key_prefix.clone(), self.version)
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        default_ttl_from_seconds(self.default_timeout_seconds)
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(DEFAULT_CACHE_TABLE)
    }

    /// Location string or an error naming the instance
    pub fn require_location(&self, cache_name: &str) -> ConfigResult<&str> {
        self.location
            .as_deref()
            .filter(|location| !location.trim().is_empty())
            .ok_or_else(|| {
                ConfigurationError::missing_required_field(
                    "location",
                    format!("cache '{cache_name}' ({} backend)", self.backend),
                )
            })
    }
}

impl PanelConfig {
    pub fn with_cache(mut self, name: impl Into<String>, cache: CacheInstanceConfig) -> Self {
        self.caches.insert(name.into(), cache);
        self
    }

    pub fn with_override(mut self, backend: impl Into<String>, reference: impl Into<String>) -> Self {
        self.panels.overrides.insert(backend.into(), reference.into());
        self
    }

    pub fn with_extension(
        mut self,
        backend: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        self.panels
            .extensions
            .insert(backend.into(), reference.into());
        self
    }

    pub fn instance(&self, name: &str) -> Option<&CacheInstanceConfig> {
        self.caches.get(name)
    }

    /// Check the structural rules serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, cache) in &self.caches {
            if name.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "caches",
                    name.clone(),
                    "cache names must not be empty",
                ));
            }
            if cache.backend.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "backend",
                    format!("cache '{name}'"),
                ));
            }
            if cache.version == 0 {
                return Err(ConfigurationError::invalid_value(
                    format!("caches.{name}.version"),
                    "0",
                    "key versions start at 1",
                ));
            }
        }

        let bindings = self
            .panels
            .overrides
            .iter()
            .map(|binding| ("panels.overrides", binding))
            .chain(
                self.panels
                    .extensions
                    .iter()
                    .map(|binding| ("panels.extensions", binding)),
            );
        for (section, (backend, reference)) in bindings {
            if backend.trim().is_empty() || reference.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    format!("{section}.{backend}"),
                    reference.clone(),
                    "backend type and adapter reference must not be empty",
                ));
            }
        }

        Ok(())
    }
}
