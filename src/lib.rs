#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cache Panel
//!
//! Capability-aware administration of heterogeneous cache backends.
//!
//! ## Overview
//!
//! A host process configures named cache instances, each backed by one of
//! several stores: an in-process table, a relational table, a directory of
//! files, Redis, a Redis cluster, Memcached, or a no-op store. Operators
//! list keys by pattern, inspect, edit, add and delete individual keys, and
//! flush a cache. Each backend supports a different subset of those
//! operations, and the panel refuses anything its backend cannot do before
//! touching the store.
//!
//! ## Module Organization
//!
//! - [`panel`] - Dispatcher, operation gate, capability table, adapters
//! - [`backends`] - Native stores and the connection registry
//! - [`keys`] - Logical/physical key codec and glob patterns
//! - [`config`] - Cache instance configuration and loading
//! - [`error`] - Panel error taxonomy
//! - [`logging`] - Console logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cache_panel::config::ConfigLoader;
//! use cache_panel::panel::{KeyQuery, PanelDispatcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_file("config/cache-panel.toml").load()?;
//! let dispatcher = PanelDispatcher::from_config(config);
//!
//! for summary in dispatcher.instances() {
//!     println!("{} ({})", summary.name, summary.backend_type);
//! }
//!
//! let panel = dispatcher.resolve("default")?;
//! let page = panel.query(&KeyQuery::new("user:*").with_page(1, 50)).await?;
//! for key in page.key_names() {
//!     println!("{key}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                        # Unit tests
//! cargo test                              # Unit and in-process integration tests
//! cargo test --features test-services     # Also hit live Redis/Memcached/Postgres
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod panel;

pub use backends::{BackendAccessor, BackendHandle, ConnectionRegistry, Expiration, StoreError};
pub use config::{CacheInstanceConfig, ConfigLoader, ConfigurationError, PanelConfig};
pub use error::{PanelError, PanelResult};
pub use keys::{GlobPattern, KeyCodec};
pub use panel::{
    AdapterRegistry, CachePanel, CapabilitySet, KeyQuery, KeyRecord, Operation, OperationOutcome,
    PanelAdapter, PanelDispatcher, ScanResult,
};
