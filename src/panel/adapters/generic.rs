//! Fallback adapter for backend types without a dedicated binding.
//!
//! Offers point reads and deletes through the native handle. Writes and
//! flush go through the same handle and can be enabled per instance; listing
//! cannot.

use crate::backends::{BackendHandle, Expiration, NativeCache, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::{CapabilitySet, Operation};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct GenericAdapter {
    handle: BackendHandle,
}

impl GenericAdapter {
    pub const NAME: &'static str = "generic";

    pub fn new(handle: BackendHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl PanelAdapter for GenericAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::NONE
            .with(Operation::GetKey, true)
            .with(Operation::DeleteKey, true)
    }

    /// Flush stays off for handles whose native clear cannot be scoped
    /// to one instance.
    fn implemented(&self) -> CapabilitySet {
        let scoped_clear = !matches!(
            self.handle,
            BackendHandle::RemoteCluster(_) | BackendHandle::Memcached(_)
        );
        CapabilitySet::ALL
            .with(Operation::Query, false)
            .with(Operation::FlushCache, scoped_clear)
    }

    async fn fetch_key(&self, key: &str) -> StoreResult<Option<Value>> {
        self.handle.get(key).await
    }

    async fn remove_key(&self, key: &str) -> StoreResult<bool> {
        self.handle.delete(key).await
    }

    async fn store_key(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        self.handle.set(key, value, expiration).await
    }

    async fn clear(&self) -> StoreResult<Option<u64>> {
        self.handle.clear().await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::NullStore;
    use std::sync::Arc;

    #[test]
    fn test_generic_capabilities_are_conservative() {
        let adapter = GenericAdapter::new(BackendHandle::Null(NullStore::new()));
        let caps = adapter.capabilities();
        assert!(caps.get_key && caps.delete_key);
        assert!(!caps.query && !caps.edit_key && !caps.add_key && !caps.flush_cache);
        assert!(caps.is_subset_of(&adapter.implemented()));
        assert!(adapter.implemented().flush_cache);
    }

    #[test]
    fn test_flush_not_implemented_over_cluster_handle() {
        let adapter = GenericAdapter::new(BackendHandle::RemoteCluster(Arc::new(NullStore::new())));
        let implemented = adapter.implemented();
        assert!(!implemented.flush_cache);
        assert!(implemented.edit_key && implemented.add_key);
    }
}
