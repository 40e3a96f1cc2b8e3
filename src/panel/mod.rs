//! # Cache Panel
//!
//! Capability-aware administration of configured caches. The
//! [`PanelDispatcher`] resolves a cache name to a [`CachePanel`], which gates
//! every operation on the adapter's effective [`CapabilitySet`].
//!
//! ```rust,no_run
//! use cache_panel::config::{CacheInstanceConfig, PanelConfig};
//! use cache_panel::panel::{KeyQuery, PanelDispatcher};
//!
//! # async fn example() -> Result<(), cache_panel::PanelError> {
//! let config = PanelConfig::default()
//!     .with_cache("default", CacheInstanceConfig::new("local-memory"));
//! let dispatcher = PanelDispatcher::from_config(config);
//!
//! let panel = dispatcher.resolve("default")?;
//! let page = panel.query(&KeyQuery::new("session:*")).await?;
//! println!("{} matching keys", page.total_count);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod adapters;
pub mod capabilities;
pub mod dispatcher;
pub mod registry;
pub mod scan;
pub mod types;

pub use adapter::{CachePanel, PanelAdapter};
pub use capabilities::{CapabilitySet, Operation};
pub use dispatcher::{CacheSummary, PanelDispatcher};
pub use registry::{AdapterBindings, AdapterContext, AdapterFactory, AdapterRef, AdapterRegistry, BuiltinAdapter};
pub use types::{KeyQuery, KeyRecord, OperationOutcome, ScanKey, ScanResult};
