//! File-based store adapter.
//!
//! Filenames are hashes of the physical key, so there is nothing to list.

use crate::backends::{Expiration, FileStore, NativeCache, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::{CapabilitySet, Operation};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FileBasedAdapter {
    store: Arc<FileStore>,
}

impl FileBasedAdapter {
    pub const NAME: &'static str = "file_based";

    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PanelAdapter for FileBasedAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
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
        self.store.clear().await.map(Some)
    }
}
