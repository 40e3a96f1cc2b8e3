//! Dispatcher builders for integration tests.

#![allow(dead_code)]

use super::fake_remote::FakeRemote;
use cache_panel::backends::{BackendHandle, ConnectionRegistry};
use cache_panel::config::{CacheInstanceConfig, PanelConfig};
use cache_panel::panel::{AdapterRegistry, CachePanel, PanelDispatcher};
use std::sync::Arc;

/// Dispatcher plus the registries behind it
pub struct TestPanel {
    pub dispatcher: PanelDispatcher,
    pub connections: Arc<ConnectionRegistry>,
    pub adapters: Arc<AdapterRegistry>,
}

impl TestPanel {
    pub fn resolve(&self, cache_name: &str) -> CachePanel {
        self.dispatcher
            .resolve(cache_name)
            .unwrap_or_else(|e| panic!("failed to resolve {cache_name}: {e}"))
    }
}

/// Builder for a dispatcher over test caches
#[derive(Default)]
pub struct TestPanelBuilder {
    config: PanelConfig,
    handles: Vec<(String, BackendHandle)>,
    adapters: Option<Arc<AdapterRegistry>>,
}

impl TestPanelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, name: &str, instance: CacheInstanceConfig) -> Self {
        self.config = self.config.with_cache(name, instance);
        self
    }

    /// Configure a `redis` cache served by a fake remote store
    pub fn with_remote(mut self, name: &str, instance: CacheInstanceConfig, fake: Arc<FakeRemote>) -> Self {
        self.config = self.config.with_cache(name, instance);
        self.handles.push((name.to_string(), BackendHandle::Remote(fake)));
        self
    }

    pub fn with_handle(mut self, name: &str, instance: CacheInstanceConfig, handle: BackendHandle) -> Self {
        self.config = self.config.with_cache(name, instance);
        self.handles.push((name.to_string(), handle));
        self
    }

    pub fn with_override(mut self, backend: &str, reference: &str) -> Self {
        self.config = self.config.with_override(backend, reference);
        self
    }

    pub fn with_extension(mut self, backend: &str, reference: &str) -> Self {
        self.config = self.config.with_extension(backend, reference);
        self
    }

    pub fn with_adapters(mut self, adapters: Arc<AdapterRegistry>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn build(self) -> TestPanel {
        let connections = Arc::new(ConnectionRegistry::new());
        for (name, handle) in self.handles {
            connections.register(name, handle);
        }
        let adapters = self.adapters.unwrap_or_default();
        let dispatcher = PanelDispatcher::new(self.config, connections.clone(), adapters.clone());
        TestPanel {
            dispatcher,
            connections,
            adapters,
        }
    }
}

/// Local memory cache on its own table
pub fn memory_cache(location: &str) -> CacheInstanceConfig {
    CacheInstanceConfig::new("local-memory").with_location(location)
}

/// `redis` cache definition; the handle is registered separately
pub fn remote_cache(prefix: &str) -> CacheInstanceConfig {
    CacheInstanceConfig::new("redis")
        .with_location("redis://fake:6379/0")
        .with_key_prefix(prefix)
}
