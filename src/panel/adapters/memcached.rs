//! Memcached adapter.
//!
//! Memcached cannot list keys and can only flush the whole server. Flush is
//! therefore declared off; an instance that owns its server outright can
//! enable it with a capability override, and the flush then runs
//! `flush_all`.

use crate::backends::{Expiration, ServerFlush, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::{CapabilitySet, Operation};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MemcachedAdapter {
    store: Arc<dyn ServerFlush>,
}

impl MemcachedAdapter {
    pub const NAME: &'static str = "memcached";

    pub fn new(store: Arc<dyn ServerFlush>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PanelAdapter for MemcachedAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        self.implemented().with(Operation::FlushCache, false)
    }

    fn implemented(&self) -> CapabilitySet {
        CapabilitySet::ALL.with(Operation::Query, false)
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
        self.store.flush_server().await?;
        Ok(None)
    }
}
