//! Connection registry: cache name to live backend handle.
//!
//! Handles are built on first request from the instance configuration and
//! reused afterwards. Building never performs I/O; drivers connect lazily on
//! their first call. In-process tables and database pools are shared between
//! instances that point at the same location, so several logical caches can
//! live on one table.

use super::error::{StoreError, StoreResult};
use super::{
    BackendHandle, DatabasePool, DatabaseTable, FileStore, MemoryStore, MemoryTable, NullStore,
};
use crate::config::CacheInstanceConfig;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "cache-memcached")]
use super::MemcachedStore;
#[cfg(feature = "cache-redis")]
use super::{RedisClusterStore, RedisStore};

/// Native driver family behind a backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    LocalMemory,
    Database,
    FileSystem,
    Redis,
    RedisCluster,
    Memcached,
    Null,
}

impl BackendKind {
    /// Map a configured backend type identifier to a driver family
    pub fn from_backend_type(backend_type: &str) -> Option<Self> {
        match backend_type.trim().to_ascii_lowercase().as_str() {
            "local-memory" | "locmem" | "memory" | "moka" => Some(Self::LocalMemory),
            "database" | "db" | "postgres" | "postgresql" | "sqlite" => Some(Self::Database),
            "file-based" | "filesystem" | "file" => Some(Self::FileSystem),
            "redis" | "dragonfly" | "valkey" => Some(Self::Redis),
            "redis-cluster" => Some(Self::RedisCluster),
            "memcached" | "pymemcache" | "pylibmc" => Some(Self::Memcached),
            "dummy" | "null" | "noop" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalMemory => "local-memory",
            Self::Database => "database",
            Self::FileSystem => "file-based",
            Self::Redis => "redis",
            Self::RedisCluster => "redis-cluster",
            Self::Memcached => "memcached",
            Self::Null => "dummy",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a configured cache to its native handle
pub trait BackendAccessor: Send + Sync {
    fn handle(&self, cache_name: &str, instance: &CacheInstanceConfig)
        -> StoreResult<BackendHandle>;
}

/// Default accessor that builds handles from configuration
#[derive(Default)]
pub struct ConnectionRegistry {
    handles: DashMap<String, BackendHandle>,
    memory_tables: DashMap<String, MemoryTable>,
    database_pools: DashMap<String, DatabasePool>,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("handles", &self.handles.len())
            .field("memory_tables", &self.memory_tables.len())
            .field("database_pools", &self.database_pools.len())
            .finish()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle built by the host, e.g. for a backend type this
    /// crate has no driver for. Replaces any handle already cached.
    pub fn register(&self, cache_name: impl Into<String>, handle: BackendHandle) {
        let cache_name = cache_name.into();
        debug!(cache_name = %cache_name, shape = handle.shape(), "Backend handle registered");
        self.handles.insert(cache_name, handle);
    }

    fn memory_table(&self, location: &str, max_entries: u64) -> MemoryTable {
        self.memory_tables
            .entry(location.to_string())
            .or_insert_with(|| MemoryTable::new(max_entries))
            .clone()
    }

    fn database_pool(&self, url: &str) -> StoreResult<DatabasePool> {
        match self.database_pools.entry(url.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let pool = DatabasePool::connect_lazy(url)?;
                Ok(entry.insert(pool).clone())
            }
        }
    }

    fn build(&self, cache_name: &str, instance: &CacheInstanceConfig) -> StoreResult<BackendHandle> {
        let kind = BackendKind::from_backend_type(&instance.backend).ok_or_else(|| {
            StoreError::Configuration(format!(
                "no native driver for backend type '{}'; register a handle for cache '{}'",
                instance.backend, cache_name
            ))
        })?;
        let codec = instance.codec();
        let default_ttl = instance.default_ttl();
        let location = || {
            instance
                .require_location(cache_name)
                .map_err(|e| StoreError::Configuration(e.to_string()))
        };

        let handle = match kind {
            BackendKind::LocalMemory => {
                let table =
                    self.memory_table(instance.location.as_deref().unwrap_or(""), instance.max_entries);
                BackendHandle::LocalMemory(Arc::new(MemoryStore::new(table, codec, default_ttl)))
            }
            BackendKind::Database => {
                let pool = self.database_pool(location()?)?;
                let table = DatabaseTable::new(pool, instance.table_name(), codec, default_ttl)?
                    .with_create_table(instance.create_table);
                BackendHandle::Database(Arc::new(table))
            }
            BackendKind::FileSystem => BackendHandle::FileSystem(Arc::new(FileStore::new(
                location()?,
                codec,
                default_ttl,
            ))),
            BackendKind::Redis => redis_handle(location()?, codec, default_ttl)?,
            BackendKind::RedisCluster => redis_cluster_handle(location()?, codec, default_ttl)?,
            BackendKind::Memcached => memcached_handle(location()?, codec, default_ttl)?,
            BackendKind::Null => BackendHandle::Null(NullStore::new()),
        };

        debug!(
            cache_name = cache_name,
            backend = %instance.backend,
            kind = %kind,
            shape = handle.shape(),
            "Backend handle built"
        );
        Ok(handle)
    }
}

impl BackendAccessor for ConnectionRegistry {
    fn handle(
        &self,
        cache_name: &str,
        instance: &CacheInstanceConfig,
    ) -> StoreResult<BackendHandle> {
        if let Some(handle) = self.handles.get(cache_name) {
            return Ok(handle.clone());
        }
        let handle = self.build(cache_name, instance)?;
        Ok(self
            .handles
            .entry(cache_name.to_string())
            .or_insert(handle)
            .clone())
    }
}

#[cfg(feature = "cache-redis")]
fn redis_handle(
    url: &str,
    codec: crate::keys::KeyCodec,
    default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Ok(BackendHandle::Remote(Arc::new(RedisStore::open(
        url,
        codec,
        default_ttl,
    )?)))
}

#[cfg(not(feature = "cache-redis"))]
fn redis_handle(
    _url: &str,
    _codec: crate::keys::KeyCodec,
    _default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Err(StoreError::Unsupported(
        "redis driver not compiled in (enable the cache-redis feature)".to_string(),
    ))
}

#[cfg(feature = "cache-redis")]
fn redis_cluster_handle(
    nodes: &str,
    codec: crate::keys::KeyCodec,
    default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Ok(BackendHandle::RemoteCluster(Arc::new(
        RedisClusterStore::open(nodes, codec, default_ttl)?,
    )))
}

#[cfg(not(feature = "cache-redis"))]
fn redis_cluster_handle(
    _nodes: &str,
    _codec: crate::keys::KeyCodec,
    _default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Err(StoreError::Unsupported(
        "redis cluster driver not compiled in (enable the cache-redis feature)".to_string(),
    ))
}

#[cfg(feature = "cache-memcached")]
fn memcached_handle(
    url: &str,
    codec: crate::keys::KeyCodec,
    default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Ok(BackendHandle::Memcached(Arc::new(MemcachedStore::new(
        url,
        codec,
        default_ttl,
    ))))
}

#[cfg(not(feature = "cache-memcached"))]
fn memcached_handle(
    _url: &str,
    _codec: crate::keys::KeyCodec,
    _default_ttl: Option<std::time::Duration>,
) -> StoreResult<BackendHandle> {
    Err(StoreError::Unsupported(
        "memcached driver not compiled in (enable the cache-memcached feature)".to_string(),
    ))
}
