//! # Panel Dispatcher
//!
//! Resolves a configured cache name to a gated [`CachePanel`]:
//!
//! 1. look the cache up in the configuration (`UnknownCache` otherwise)
//! 2. find the adapter reference bound to its backend type, falling back to
//!    the `generic` adapter for unbound types
//! 3. obtain the backend handle from the [`BackendAccessor`]
//! 4. build the adapter and apply the instance's capability overrides
//!
//! Resolution is synchronous and performs no backend I/O. It can be repeated
//! freely and always yields the same effective capabilities for the same
//! configuration.

use super::adapter::{CachePanel, PanelAdapter};
use super::adapters::GenericAdapter;
use super::capabilities::CapabilitySet;
use super::registry::{AdapterBindings, AdapterContext, AdapterRegistry};
use crate::backends::{BackendAccessor, ConnectionRegistry};
use crate::config::{CacheInstanceConfig, PanelConfig};
use crate::error::{PanelError, PanelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One row of the cache index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub name: String,
    pub backend_type: String,
    /// Adapter serving the cache; `None` when resolution failed
    pub adapter: Option<String>,
    pub capabilities: Option<CapabilitySet>,
    /// Resolution failure text
    pub error: Option<String>,
}

/// Entry point for panel operations
#[derive(Clone)]
pub struct PanelDispatcher {
    config: Arc<PanelConfig>,
    bindings: AdapterBindings,
    accessor: Arc<dyn BackendAccessor>,
    registry: Arc<AdapterRegistry>,
}

impl fmt::Debug for PanelDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelDispatcher")
            .field("caches", &self.cache_names())
            .field("bindings", &self.bindings.len())
            .field("registry", &self.registry)
            .finish()
    }
}

impl PanelDispatcher {
    pub fn new(
        config: PanelConfig,
        accessor: Arc<dyn BackendAccessor>,
        registry: Arc<AdapterRegistry>,
    ) -> Self {
        let bindings = AdapterBindings::from_config(&config.panels);
        info!(
            caches = config.caches.len(),
            overrides = config.panels.overrides.len(),
            extensions = config.panels.extensions.len(),
            "Panel dispatcher initialized"
        );
        Self {
            config: Arc::new(config),
            bindings,
            accessor,
            registry,
        }
    }

    /// Dispatcher over the built-in connection registry and adapters
    pub fn from_config(config: PanelConfig) -> Self {
        Self::new(
            config,
            Arc::new(ConnectionRegistry::new()),
            Arc::new(AdapterRegistry::new()),
        )
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn bindings(&self) -> &AdapterBindings {
        &self.bindings
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Configured cache names in sorted order
    pub fn cache_names(&self) -> Vec<&str> {
        self.config.caches.keys().map(String::as_str).collect()
    }

    /// Resolve a cache name to its gated panel
    pub fn resolve(&self, cache_name: &str) -> PanelResult<CachePanel> {
        let instance = self
            .config
            .instance(cache_name)
            .ok_or_else(|| PanelError::UnknownCache {
                cache_name: cache_name.to_string(),
            })?;
        let backend_type = instance.backend.as_str();

        let reference = match self.bindings.reference_for(backend_type) {
            Some(reference) => reference,
            None => {
                warn!(
                    cache_name = cache_name,
                    backend_type = backend_type,
                    "No adapter bound to backend type, using generic adapter"
                );
                GenericAdapter::NAME
            }
        };

        let handle = self
            .accessor
            .handle(cache_name, instance)
            .map_err(|e| PanelError::UnsupportedDriver {
                cache_name: cache_name.to_string(),
                backend_type: backend_type.to_string(),
                reason: e.to_string(),
            })?;

        let ctx = AdapterContext {
            cache_name,
            backend_type,
            instance,
            handle,
        };
        let adapter = self.registry.build(reference, &ctx)?;
        let capabilities = effective_capabilities(cache_name, instance, adapter.as_ref())?;

        debug!(
            cache_name = cache_name,
            backend_type = backend_type,
            adapter = adapter.adapter_name(),
            capabilities = %capabilities,
            "Cache panel resolved"
        );
        Ok(CachePanel::new(cache_name, backend_type, adapter).with_capabilities(capabilities))
    }

    /// Index of every configured cache; failed resolutions are listed with
    /// their error instead of aborting the listing
    pub fn instances(&self) -> Vec<CacheSummary> {
        self.config
            .caches
            .iter()
            .map(|(name, instance)| match self.resolve(name) {
                Ok(panel) => CacheSummary {
                    name: name.clone(),
                    backend_type: instance.backend.clone(),
                    adapter: Some(panel.adapter_name().to_string()),
                    capabilities: Some(panel.capabilities()),
                    error: None,
                },
                Err(e) => CacheSummary {
                    name: name.clone(),
                    backend_type: instance.backend.clone(),
                    adapter: None,
                    capabilities: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

/// Declared capabilities with the instance's overrides applied
///
/// Overrides may disable anything. They may only enable operations the
/// adapter implements.
fn effective_capabilities(
    cache_name: &str,
    instance: &CacheInstanceConfig,
    adapter: &dyn PanelAdapter,
) -> PanelResult<CapabilitySet> {
    let implemented = adapter.implemented();
    let mut capabilities = adapter.capabilities();

    for (&operation, &enabled) in &instance.abilities {
        if enabled && !implemented.supports(operation) {
            return Err(PanelError::InvalidCapabilityOverride {
                cache_name: cache_name.to_string(),
                adapter: adapter.adapter_name().to_string(),
                operation,
            });
        }
        if capabilities.supports(operation) != enabled {
            info!(
                cache_name = cache_name,
                adapter = adapter.adapter_name(),
                operation = %operation,
                enabled = enabled,
                "Capability overridden"
            );
            capabilities.set(operation, enabled);
        }
    }

    Ok(capabilities)
}
