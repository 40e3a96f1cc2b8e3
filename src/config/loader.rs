//! Configuration Loader
//!
//! Layers a TOML file (or inline TOML) and `CACHE_PANEL__…` environment
//! variables with the `config` crate, then validates the result.
//!
//! Environment keys use `__` between path segments, e.g.
//! `CACHE_PANEL__CACHES__DEFAULT__LOCATION=/var/tmp/cache`.

use super::error::{ConfigResult, ConfigurationError};
use super::PanelConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "CACHE_PANEL";

/// Builder for a one-shot configuration load
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    inline: Option<String>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            inline: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    /// Read a TOML file; it must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Layer inline TOML on top of the file
    pub fn with_toml(mut self, toml: impl Into<String>) -> Self {
        self.inline = Some(toml.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn without_environment(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Load a file with environment overrides
    pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<PanelConfig> {
        Self::new().with_file(path.as_ref()).load()
    }

    /// Parse inline TOML without consulting the environment
    pub fn from_toml_str(toml: &str) -> ConfigResult<PanelConfig> {
        Self::new().without_environment().with_toml(toml).load()
    }

    pub fn load(&self) -> ConfigResult<PanelConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            if !path.is_file() {
                return Err(ConfigurationError::ConfigFileNotFound { path: path.clone() });
            }
            debug!(path = %path.display(), "Loading panel configuration file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        if let Some(toml) = &self.inline {
            builder = builder.add_source(File::from_str(toml, FileFormat::Toml));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let source_name = self
            .file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "inline configuration".to_string());

        let config: PanelConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigurationError::invalid_source(&source_name, e))?;

        config.validate()?;

        info!(
            source = %source_name,
            caches = config.caches.len(),
            overrides = config.panels.overrides.len(),
            extensions = config.panels.extensions.len(),
            "Panel configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Operation;
    use std::io::Write;

    const SAMPLE: &str = r#"
[caches.default]
backend = "local-memory"
location = "default"

[caches.sessions]
backend = "redis"
location = "redis://localhost:6379/0"
key_prefix = "sessions"
version = 2
default_timeout_seconds = 0

[caches.sessions.abilities]
flush = false
query = true

[panels.overrides]
memcached = "generic"

[panels.extensions]
keydb = "redis"
"#;

    #[test]
    fn test_from_toml_str() {
        let config = ConfigLoader::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.caches.len(), 2);

        let default = config.instance("default").unwrap();
        assert_eq!(default.backend, "local-memory");
        assert_eq!(default.default_timeout_seconds, 300);

        let sessions = config.instance("sessions").unwrap();
        assert_eq!(sessions.key_prefix, "sessions");
        assert_eq!(sessions.version, 2);
        assert_eq!(sessions.default_ttl(), None);
        assert_eq!(sessions.abilities.get(&Operation::FlushCache), Some(&false));
        assert_eq!(sessions.abilities.get(&Operation::Query), Some(&true));

        assert_eq!(config.panels.overrides["memcached"], "generic");
        assert_eq!(config.panels.extensions["keydb"], "redis");
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = ConfigLoader::from_toml_str("").unwrap();
        assert!(config.caches.is_empty());
    }

    #[test]
    fn test_missing_backend_is_rejected() {
        let result = ConfigLoader::from_toml_str("[caches.broken]\nlocation = \"x\"\n");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let result = ConfigLoader::from_toml_str("[caches.default\nbackend = ");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .without_environment()
            .with_file("/nonexistent/cache-panel.toml")
            .load();
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ConfigLoader::new()
            .without_environment()
            .with_file(file.path())
            .load()
            .unwrap();
        assert!(config.instance("sessions").is_some());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        // Unique prefix so parallel tests do not observe this variable
        std::env::set_var("PANEL_LOADER_TEST__CACHES__DEFAULT__LOCATION", "from-env");
        let config = ConfigLoader::new()
            .with_env_prefix("PANEL_LOADER_TEST")
            .with_file(file.path())
            .load()
            .unwrap();
        std::env::remove_var("PANEL_LOADER_TEST__CACHES__DEFAULT__LOCATION");

        assert_eq!(
            config.instance("default").unwrap().location.as_deref(),
            Some("from-env")
        );
    }
}
