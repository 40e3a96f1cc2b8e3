//! Remote single-node adapter (Redis, Dragonfly, Valkey).
//!
//! Lists keys with a full cursor scan of the instance namespace, then sorts
//! and slices locally. The whole matching set is held in memory for the
//! duration of one listing.

use crate::backends::{Expiration, RemoteKeyspace, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::CapabilitySet;
use crate::panel::scan::{cursor_scan, paginate};
use crate::panel::types::{KeyQuery, ScanResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RedisAdapter {
    store: Arc<dyn RemoteKeyspace>,
}

impl RedisAdapter {
    pub const NAME: &'static str = "redis";

    pub fn new(store: Arc<dyn RemoteKeyspace>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PanelAdapter for RedisAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ALL
    }

    async fn scan_keys(&self, query: &KeyQuery) -> StoreResult<ScanResult> {
        let keys = cursor_scan(self.store.as_ref(), &query.glob(), query.scan_count).await?;
        Ok(paginate(keys, query))
    }

    async fn fetch_key(&self, key: &str) -> StoreResult<Option<Value>> {
        self.store.get(key).await
    }

    async fn remove_key(&self, key: &str) -> StoreResult<bool> {
        self.store.delete(key).await
    }

    async fn store_key(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        self.store.set(key, value, expiration).await
    }

    /// Deletes the instance namespace only; other caches on the server are untouched.
    async fn clear(&self) -> StoreResult<Option<u64>> {
        self.store.clear().await.map(Some)
    }
}
