//! # Logging
//!
//! Environment-aware console logging using the tracing ecosystem. Logs go to
//! stderr so command output on stdout stays machine-readable.
//!
//! Level selection, first match wins:
//!
//! 1. an explicit level passed by the caller (the CLI's `-v` flags)
//! 2. `LOG_LEVEL`
//! 3. `RUST_LOG`
//! 4. the environment default from `CACHE_PANEL_ENV` (`production` → `info`,
//!    anything else → `debug`)
//!
//! Set `CACHE_PANEL_LOG_FORMAT=json` for one JSON object per line.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging with the environment's level
pub fn init_console_only() {
    init_with_level(None);
}

/// Initialize console logging, optionally forcing a level
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_with_level(level: Option<&str>) {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let explicit = level
            .map(str::to_string)
            .or_else(|| std::env::var("LOG_LEVEL").ok())
            .or_else(|| std::env::var("RUST_LOG").ok());
        let log_level = resolve_log_level(&environment, explicit);
        let json = std::env::var("CACHE_PANEL_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let use_ansi = !json && IsTerminal::is_terminal(&std::io::stderr());

        let console_layer = if json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json()
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::debug!(
                environment = %environment,
                log_level = %log_level,
                ansi_colors = use_ansi,
                json = json,
                "Console logging initialized"
            );
        }
    });
}

/// Current environment name
fn get_environment() -> String {
    std::env::var("CACHE_PANEL_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Explicit level if given, else the environment default
fn resolve_log_level(environment: &str, explicit: Option<String>) -> String {
    if let Some(level) = explicit.filter(|level| !level.trim().is_empty()) {
        return level.to_lowercase();
    }
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
