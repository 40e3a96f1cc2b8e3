//! Remote cluster adapter.
//!
//! Keys are spread across nodes and there is no cross-node aggregation, so
//! listing and flushing are not offered.

use crate::backends::{Expiration, NativeCache, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::{CapabilitySet, Operation};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RedisClusterAdapter {
    store: Arc<dyn NativeCache>,
}

impl RedisClusterAdapter {
    pub const NAME: &'static str = "redis_cluster";

    pub fn new(store: Arc<dyn NativeCache>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PanelAdapter for RedisClusterAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ALL
            .with(Operation::Query, false)
            .with(Operation::FlushCache, false)
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
}
