//! In-process cache table using Moka
//!
//! A `MemoryTable` is the live table itself; several logical caches pointing at
//! the same `location` share one table and are kept apart by their key
//! namespace. `MemoryStore` is one instance's view of a table: it applies the
//! instance's key codec and default timeout, and enumerates the raw physical
//! keys so the adapter can decode them.
//!
//! **Important**: this table is NOT distributed. Each process has its own.

use super::error::StoreResult;
use super::expiration::{Expiration, Ttl};
use super::NativeCache;
use crate::keys::KeyCodec;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Stored value plus its own lifetime
#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// Per-entry expiry so each write can carry its own timeout
struct PerEntryExpiry;

impl Expiry<String, StoredValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Live in-process table keyed by physical key
#[derive(Clone)]
pub struct MemoryTable {
    cache: Cache<String, StoredValue>,
}

impl std::fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTable")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MemoryTable {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();

        debug!(max_entries = max_entries, "In-process cache table created");
        Self { cache }
    }

    /// Snapshot of the live physical keys.
    pub async fn physical_keys(&self) -> Vec<String> {
        self.cache.run_pending_tasks().await;
        let now = Instant::now();
        self.cache
            .iter()
            .filter(|(_, stored)| stored.is_live(now))
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }

    async fn get_physical(&self, physical: &str) -> Option<Value> {
        self.cache
            .get(physical)
            .await
            .filter(|stored| stored.is_live(Instant::now()))
            .map(|stored| stored.value)
    }

    async fn insert_physical(&self, physical: String, value: Value, ttl: Option<Duration>) {
        // A deadline past the clock's range means no deadline
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        let ttl = ttl.filter(|_| expires_at.is_some());
        self.cache
            .insert(
                physical,
                StoredValue {
                    value,
                    ttl,
                    expires_at,
                },
            )
            .await;
    }

    async fn remove_physical(&self, physical: &str) -> bool {
        self.cache
            .remove(physical)
            .await
            .is_some_and(|stored| stored.is_live(Instant::now()))
    }
}

/// One logical cache's view of a `MemoryTable`
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table: MemoryTable,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new(table: MemoryTable, codec: KeyCodec, default_ttl: Option<Duration>) -> Self {
        Self {
            table,
            codec,
            default_ttl,
        }
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Raw physical keys of the whole table, including other namespaces.
    pub async fn physical_keys(&self) -> Vec<String> {
        self.table.physical_keys().await
    }
}

#[async_trait]
impl NativeCache for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "local-memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let result = self.table.get_physical(&self.codec.encode(key)).await;
        debug!(key = key, hit = result.is_some(), "Cache GET (memory)");
        Ok(result)
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        let physical = self.codec.encode(key);
        match expiration.ttl(self.default_ttl) {
            Ttl::Expired => {
                self.table.remove_physical(&physical).await;
            }
            Ttl::Persistent => {
                self.table.insert_physical(physical, value.clone(), None).await;
            }
            Ttl::Expires(ttl) => {
                self.table
                    .insert_physical(physical, value.clone(), Some(ttl))
                    .await;
            }
        }
        debug!(key = key, ?expiration, "Cache SET (memory)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let existed = self.table.remove_physical(&self.codec.encode(key)).await;
        debug!(key = key, existed = existed, "Cache DEL (memory)");
        Ok(existed)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut removed = 0;
        for physical in self.table.physical_keys().await {
            if self.codec.decode(&physical).is_some() && self.table.remove_physical(&physical).await
            {
                removed += 1;
            }
        }
        debug!(
            namespace = %self.codec.namespace(),
            removed = removed,
            "Cache namespace cleared (memory)"
        );
        Ok(removed)
    }
}
