//! # Adapter registry and bindings
//!
//! Two pieces decide which adapter serves a cache:
//!
//! - [`AdapterBindings`] maps backend type identifiers to adapter references.
//!   It is assembled once from the built-in defaults, the configured
//!   overrides and the configured extensions (extensions > overrides >
//!   defaults) and never changes afterwards.
//! - [`AdapterRegistry`] turns a reference into an adapter. Built-in names
//!   (`redis`, `database`, …) map to the bundled adapters; `custom:<name>`
//!   names a factory the host registered.
//!
//! References are only parsed when a cache is resolved, so a broken
//! reference fails that resolution with an `AdapterLoad` error naming it.

use super::adapter::PanelAdapter;
use super::adapters::{
    DatabaseAdapter, DummyAdapter, FileBasedAdapter, GenericAdapter, LocalMemoryAdapter,
    MemcachedAdapter, RedisAdapter, RedisClusterAdapter,
};
use crate::backends::BackendHandle;
use crate::config::{CacheInstanceConfig, PanelBindingsConfig};
use crate::error::{PanelError, PanelResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Prefix of references that name a host-registered factory
pub const CUSTOM_PREFIX: &str = "custom:";

/// Default backend type bindings
const DEFAULT_BINDINGS: &[(&str, BuiltinAdapter)] = &[
    ("local-memory", BuiltinAdapter::LocalMemory),
    ("locmem", BuiltinAdapter::LocalMemory),
    ("memory", BuiltinAdapter::LocalMemory),
    ("moka", BuiltinAdapter::LocalMemory),
    ("database", BuiltinAdapter::Database),
    ("db", BuiltinAdapter::Database),
    ("postgres", BuiltinAdapter::Database),
    ("postgresql", BuiltinAdapter::Database),
    ("sqlite", BuiltinAdapter::Database),
    ("file-based", BuiltinAdapter::FileBased),
    ("filesystem", BuiltinAdapter::FileBased),
    ("file", BuiltinAdapter::FileBased),
    ("redis", BuiltinAdapter::Redis),
    ("dragonfly", BuiltinAdapter::Redis),
    ("valkey", BuiltinAdapter::Redis),
    ("redis-cluster", BuiltinAdapter::RedisCluster),
    ("memcached", BuiltinAdapter::Memcached),
    ("pymemcache", BuiltinAdapter::Memcached),
    ("pylibmc", BuiltinAdapter::Memcached),
    ("dummy", BuiltinAdapter::Dummy),
    ("null", BuiltinAdapter::Dummy),
    ("noop", BuiltinAdapter::Dummy),
];

/// Everything a factory needs to build an adapter for one cache
#[derive(Debug, Clone)]
pub struct AdapterContext<'a> {
    pub cache_name: &'a str,
    pub backend_type: &'a str,
    pub instance: &'a CacheInstanceConfig,
    pub handle: BackendHandle,
}

impl AdapterContext<'_> {
    /// Error for a handle whose shape the adapter cannot drive
    pub fn unsupported_driver(&self, adapter: &str) -> PanelError {
        PanelError::UnsupportedDriver {
            cache_name: self.cache_name.to_string(),
            backend_type: self.backend_type.to_string(),
            reason: format!(
                "adapter '{adapter}' cannot drive a {} handle",
                self.handle.shape()
            ),
        }
    }
}

/// Factory for host-registered adapters
pub type AdapterFactory =
    Box<dyn Fn(&AdapterContext<'_>) -> PanelResult<Arc<dyn PanelAdapter>> + Send + Sync>;

/// Adapters bundled with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAdapter {
    LocalMemory,
    Database,
    FileBased,
    Redis,
    RedisCluster,
    Memcached,
    Dummy,
    Generic,
}

impl BuiltinAdapter {
    pub const ALL: [BuiltinAdapter; 8] = [
        BuiltinAdapter::LocalMemory,
        BuiltinAdapter::Database,
        BuiltinAdapter::FileBased,
        BuiltinAdapter::Redis,
        BuiltinAdapter::RedisCluster,
        BuiltinAdapter::Memcached,
        BuiltinAdapter::Dummy,
        BuiltinAdapter::Generic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LocalMemory => LocalMemoryAdapter::NAME,
            Self::Database => DatabaseAdapter::NAME,
            Self::FileBased => FileBasedAdapter::NAME,
            Self::Redis => RedisAdapter::NAME,
            Self::RedisCluster => RedisClusterAdapter::NAME,
            Self::Memcached => MemcachedAdapter::NAME,
            Self::Dummy => DummyAdapter::NAME,
            Self::Generic => GenericAdapter::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|adapter| adapter.name() == name)
    }

    /// Build the adapter, checking the handle has the shape it needs
    pub fn build(&self, ctx: &AdapterContext<'_>) -> PanelResult<Arc<dyn PanelAdapter>> {
        let adapter: Arc<dyn PanelAdapter> = match (self, &ctx.handle) {
            (Self::LocalMemory, BackendHandle::LocalMemory(store)) => {
                Arc::new(LocalMemoryAdapter::new(store.clone()))
            }
            (Self::Database, BackendHandle::Database(table)) => {
                Arc::new(DatabaseAdapter::new(table.clone()))
            }
            (Self::FileBased, BackendHandle::FileSystem(store)) => {
                Arc::new(FileBasedAdapter::new(store.clone()))
            }
            (Self::Redis, BackendHandle::Remote(store)) => Arc::new(RedisAdapter::new(store.clone())),
            (Self::RedisCluster, BackendHandle::RemoteCluster(store)) => {
                Arc::new(RedisClusterAdapter::new(store.clone()))
            }
            (Self::Memcached, BackendHandle::Memcached(store)) => {
                Arc::new(MemcachedAdapter::new(store.clone()))
            }
            (Self::Dummy, _) => Arc::new(DummyAdapter),
            (Self::Generic, handle) => Arc::new(GenericAdapter::new(handle.clone())),
            (adapter, _) => return Err(ctx.unsupported_driver(adapter.name())),
        };
        Ok(adapter)
    }
}

impl fmt::Display for BuiltinAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed adapter reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterRef {
    Builtin(BuiltinAdapter),
    Custom(String),
}

impl FromStr for AdapterRef {
    type Err = String;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let reference = reference.trim();
        if let Some(name) = reference.strip_prefix(CUSTOM_PREFIX) {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
            return if valid {
                Ok(Self::Custom(name.to_string()))
            } else {
                Err(format!("malformed custom adapter name '{name}'"))
            };
        }
        BuiltinAdapter::from_name(reference)
            .map(Self::Builtin)
            .ok_or_else(|| {
                format!("not a built-in adapter; use one of the built-in names or '{CUSTOM_PREFIX}<name>'")
            })
    }
}

/// Immutable backend-type to adapter-reference map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterBindings {
    bindings: BTreeMap<String, String>,
}

impl Default for AdapterBindings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AdapterBindings {
    /// Built-in bindings only
    pub fn defaults() -> Self {
        let bindings = DEFAULT_BINDINGS
            .iter()
            .map(|(backend, adapter)| (backend.to_string(), adapter.name().to_string()))
            .collect();
        Self { bindings }
    }

    /// Defaults, then overrides, then extensions
    pub fn from_config(config: &PanelBindingsConfig) -> Self {
        let mut bindings = Self::defaults().bindings;
        for (backend, reference) in config.overrides.iter().chain(config.extensions.iter()) {
            bindings.insert(normalize(backend), reference.trim().to_string());
        }
        Self { bindings }
    }

    /// Adapter reference bound to a backend type
    pub fn reference_for(&self, backend_type: &str) -> Option<&str> {
        self.bindings
            .get(&normalize(backend_type))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(backend, reference)| (backend.as_str(), reference.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn normalize(backend_type: &str) -> String {
    backend_type.trim().to_ascii_lowercase()
}

/// Resolves adapter references to adapters
pub struct AdapterRegistry {
    custom: RwLock<HashMap<String, AdapterFactory>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let custom = self.custom.read();
        let mut names: Vec<&String> = custom.keys().collect();
        names.sort();
        f.debug_struct("AdapterRegistry")
            .field("custom_adapters", &names)
            .finish()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory reachable as `custom:<name>`
    ///
    /// ```rust,ignore
    /// registry.register("keydb", |ctx| match &ctx.handle {
    ///     BackendHandle::Remote(store) => Ok(Arc::new(RedisAdapter::new(store.clone()))),
    ///     _ => Err(ctx.unsupported_driver("keydb")),
    /// });
    /// ```
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&AdapterContext<'_>) -> PanelResult<Arc<dyn PanelAdapter>> + Send + Sync + 'static,
    {
        self.custom.write().insert(name.into(), Box::new(factory));
    }

    /// Returns `true` if a factory was removed.
    pub fn unregister(&self, name: &str) -> bool {
        self.custom.write().remove(name).is_some()
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.custom.read().contains_key(name)
    }

    /// Parse a reference and confirm it points at something loadable
    pub fn check_reference(&self, reference: &str, backend_type: &str) -> PanelResult<AdapterRef> {
        let parsed = reference
            .parse::<AdapterRef>()
            .map_err(|reason| adapter_load(reference, backend_type, reason))?;
        if let AdapterRef::Custom(name) = &parsed {
            if !self.is_registered(name) {
                return Err(adapter_load(
                    reference,
                    backend_type,
                    format!("no custom adapter registered under '{name}'"),
                ));
            }
        }
        Ok(parsed)
    }

    /// Build the adapter a reference names
    pub fn build(&self, reference: &str, ctx: &AdapterContext<'_>) -> PanelResult<Arc<dyn PanelAdapter>> {
        match self.check_reference(reference, ctx.backend_type)? {
            AdapterRef::Builtin(adapter) => adapter.build(ctx),
            AdapterRef::Custom(name) => {
                let custom = self.custom.read();
                let factory = custom.get(&name).ok_or_else(|| {
                    adapter_load(
                        reference,
                        ctx.backend_type,
                        format!("no custom adapter registered under '{name}'"),
                    )
                })?;
                factory(ctx)
            }
        }
    }
}

fn adapter_load(reference: &str, backend_type: &str, reason: impl Into<String>) -> PanelError {
    PanelError::AdapterLoad {
        reference: reference.to_string(),
        backend_type: backend_type.to_string(),
        reason: reason.into(),
    }
}
