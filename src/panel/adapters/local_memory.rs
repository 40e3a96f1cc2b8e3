//! In-process table adapter.
//!
//! Lists keys by iterating the live table, decoding each physical key and
//! filtering in process.

use crate::backends::{Expiration, MemoryStore, NativeCache, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::CapabilitySet;
use crate::panel::scan::{decode_matching, paginate};
use crate::panel::types::{KeyQuery, ScanResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LocalMemoryAdapter {
    store: Arc<MemoryStore>,
}

impl LocalMemoryAdapter {
    pub const NAME: &'static str = "local_memory";

    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PanelAdapter for LocalMemoryAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ALL
    }

    async fn scan_keys(&self, query: &KeyQuery) -> StoreResult<ScanResult> {
        let physical = self.store.physical_keys().await;
        let keys = decode_matching(physical, self.store.codec(), &query.glob());
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

    async fn clear(&self) -> StoreResult<Option<u64>> {
        self.store.clear().await.map(Some)
    }
}
