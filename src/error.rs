//! Panel error taxonomy
//!
//! Every variant carries the cache name, backend type and operation when they
//! are known, so an error is actionable without looking at adapter state.

use crate::backends::StoreError;
use crate::config::ConfigurationError;
use crate::panel::Operation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    /// The cache name is not configured
    #[error("Unknown cache '{cache_name}'")]
    UnknownCache { cache_name: String },

    /// The adapter does not support the operation
    #[error("Operation '{operation}' is not supported by the {backend_type} backend of cache '{cache_name}'")]
    UnsupportedOperation {
        cache_name: String,
        backend_type: String,
        operation: Operation,
    },

    /// An adapter reference is malformed or names nothing registered
    #[error("Failed to load adapter '{reference}' for backend '{backend_type}': {reason}")]
    AdapterLoad {
        reference: String,
        backend_type: String,
        reason: String,
    },

    /// The backend handle does not have the shape the adapter needs
    #[error("Unsupported driver for cache '{cache_name}' ({backend_type}): {reason}")]
    UnsupportedDriver {
        cache_name: String,
        backend_type: String,
        reason: String,
    },

    /// A capability override enables something the adapter cannot do
    #[error("Invalid capability override for cache '{cache_name}': adapter '{adapter}' does not implement '{operation}'")]
    InvalidCapabilityOverride {
        cache_name: String,
        adapter: String,
        operation: Operation,
    },

    /// The backend failed during a live call; the native error text is kept
    #[error("Backend error during '{operation}' on cache '{cache_name}' ({backend_type}): {source}")]
    BackendTransport {
        cache_name: String,
        backend_type: String,
        operation: Operation,
        #[source]
        source: StoreError,
    },

    /// Caller input rejected before reaching the backend
    #[error("Invalid input for '{operation}' on cache '{cache_name}': {reason}")]
    InvalidInput {
        cache_name: String,
        operation: Operation,
        reason: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl PanelError {
    /// True for errors caused by a capability being switched off
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// Name of the cache this error is about, when known
    pub fn cache_name(&self) -> Option<&str> {
        match self {
            Self::UnknownCache { cache_name }
            | Self::UnsupportedOperation { cache_name, .. }
            | Self::UnsupportedDriver { cache_name, .. }
            | Self::InvalidCapabilityOverride { cache_name, .. }
            | Self::BackendTransport { cache_name, .. }
            | Self::InvalidInput { cache_name, .. } => Some(cache_name),
            Self::AdapterLoad { .. } | Self::Configuration(_) => None,
        }
    }
}

pub type PanelResult<T> = Result<T, PanelError>;
