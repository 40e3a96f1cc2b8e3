//! # Cache Panel CLI
//!
//! Command-line interface for inspecting and administering configured caches.

use anyhow::{bail, Context, Result};
use cache_panel::backends::{BackendAccessor, BackendHandle, ConnectionRegistry, Expiration, NativeCache};
use cache_panel::config::ConfigLoader;
use cache_panel::logging;
use cache_panel::panel::{
    AdapterRegistry, CachePanel, KeyQuery, KeyRecord, OperationOutcome, PanelDispatcher,
};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cache-panel")]
#[command(about = "Inspect and administer configured cache backends")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CACHE_PANEL_CONFIG", default_value = "config/cache-panel.toml")]
    config: PathBuf,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured caches with their adapters and capabilities
    List,
    /// List keys matching a pattern
    Query {
        cache: String,
        /// Shell-style pattern (`*` and `?`)
        #[arg(short, long, default_value = "*")]
        pattern: String,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 25)]
        per_page: u64,
        /// Batch size hint for cursor scans
        #[arg(long, default_value_t = 100)]
        scan_count: u64,
    },
    /// Show one key
    Get { cache: String, key: String },
    /// Create or update a key
    Set {
        cache: String,
        key: String,
        value: String,
        /// Timeout in seconds; 0 or less expires immediately
        #[arg(short, long)]
        timeout: Option<f64>,
        /// Store the value as a plain string instead of parsing JSON
        #[arg(long)]
        raw: bool,
    },
    /// Add a key
    Add {
        cache: String,
        key: String,
        value: String,
        #[arg(short, long)]
        timeout: Option<f64>,
        #[arg(long)]
        raw: bool,
    },
    /// Delete a key
    Delete { cache: String, key: String },
    /// Remove every entry of a cache
    Flush { cache: String },
    /// Fill caches with generated test keys
    Populate {
        /// Cache to populate
        #[arg(short, long, default_value = "default")]
        cache: String,
        /// Populate every configured cache
        #[arg(long, conflicts_with = "cache")]
        all: bool,
        /// Number of keys per cache
        #[arg(short, long, default_value_t = 100)]
        num_keys: usize,
    },
    /// Create the relational cache table
    CreateTable { cache: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    logging::init_with_level(Some(log_level));

    let config = ConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let connections = Arc::new(ConnectionRegistry::new());
    let dispatcher = PanelDispatcher::new(
        config,
        connections.clone(),
        Arc::new(AdapterRegistry::new()),
    );
    info!(config = %cli.config.display(), caches = dispatcher.cache_names().len(), "Cache panel starting");

    match cli.command {
        Commands::List => list(&dispatcher, cli.format),
        Commands::Query {
            cache,
            pattern,
            page,
            per_page,
            scan_count,
        } => {
            let panel = dispatcher.resolve(&cache)?;
            let query = KeyQuery::new(pattern)
                .with_page(page, per_page)
                .with_scan_count(scan_count);
            let result = panel.query(&query).await?;
            match cli.format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => {
                    for key in result.key_names() {
                        println!("{key}");
                    }
                    println!(
                        "-- page {}/{} ({} keys)",
                        result.page,
                        result.total_pages().max(1),
                        result.total_count
                    );
                    if let Some(error) = &result.error {
                        eprintln!("warning: scan failed: {error}");
                    }
                }
            }
            Ok(())
        }
        Commands::Get { cache, key } => {
            let record = dispatcher.resolve(&cache)?.get_key(&key).await?;
            print_record(&record, cli.format)
        }
        Commands::Set {
            cache,
            key,
            value,
            timeout,
            raw,
        } => {
            let panel = dispatcher.resolve(&cache)?;
            let outcome = panel.edit_key(&key, parse_value(&value, raw)?, timeout).await?;
            print_outcome(&outcome, cli.format)
        }
        Commands::Add {
            cache,
            key,
            value,
            timeout,
            raw,
        } => {
            let panel = dispatcher.resolve(&cache)?;
            let outcome = panel.add_key(&key, parse_value(&value, raw)?, timeout).await?;
            print_outcome(&outcome, cli.format)
        }
        Commands::Delete { cache, key } => {
            let outcome = dispatcher.resolve(&cache)?.delete_key(&key).await?;
            print_outcome(&outcome, cli.format)
        }
        Commands::Flush { cache } => {
            let panel: CachePanel = dispatcher.resolve(&cache)?;
            let outcome = panel.flush_cache().await?;
            print_outcome(&outcome, cli.format)
        }
        Commands::Populate {
            cache,
            all,
            num_keys,
        } => {
            let targets: Vec<String> = if all {
                dispatcher.cache_names().into_iter().map(str::to_string).collect()
            } else {
                vec![cache]
            };
            populate(&dispatcher, connections.as_ref(), &targets, num_keys).await
        }
        Commands::CreateTable { cache } => {
            let instance = dispatcher
                .config()
                .instance(&cache)
                .with_context(|| format!("unknown cache '{cache}'"))?;
            match connections.handle(&cache, instance)? {
                BackendHandle::Database(table) => {
                    table.ensure_table().await?;
                    println!("Cache table '{}' ready for cache '{cache}'", table.table());
                    Ok(())
                }
                other => bail!(
                    "cache '{cache}' uses a {} backend; only database caches have a table",
                    other.shape()
                ),
            }
        }
    }
}

fn list(dispatcher: &PanelDispatcher, format: OutputFormat) -> Result<()> {
    let index = dispatcher.instances();
    if format == OutputFormat::Json {
        return print_json(&index);
    }
    println!("{:<20} {:<16} {:<14} CAPABILITIES", "CACHE", "BACKEND", "ADAPTER");
    for summary in index {
        let (adapter, capabilities) = match (&summary.adapter, &summary.capabilities, &summary.error) {
            (Some(adapter), Some(capabilities), _) => (adapter.clone(), capabilities.to_string()),
            (_, _, Some(error)) => ("-".to_string(), format!("error: {error}")),
            _ => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<20} {:<16} {:<14} {}",
            summary.name, summary.backend_type, adapter, capabilities
        );
    }
    Ok(())
}

/// Write `test_key_<i>` keys into each target through its backend handle
async fn populate(
    dispatcher: &PanelDispatcher,
    connections: &ConnectionRegistry,
    targets: &[String],
    num_keys: usize,
) -> Result<()> {
    let mut failures = 0usize;
    for cache_name in targets {
        let Some(instance) = dispatcher.config().instance(cache_name) else {
            eprintln!("{cache_name}: unknown cache");
            failures += 1;
            continue;
        };
        let handle = match connections.handle(cache_name, instance) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("{cache_name}: {e}");
                failures += 1;
                continue;
            }
        };

        let writes = (0..num_keys).map(|i| {
            let handle = handle.clone();
            async move {
                handle
                    .set(
                        &format!("test_key_{i}"),
                        &Value::String(format!("test_value_{i}")),
                        Expiration::Default,
                    )
                    .await
            }
        });
        let results = join_all(writes).await;
        match results.into_iter().find_map(Result::err) {
            None => println!("{cache_name}: populated {num_keys} keys"),
            Some(e) => {
                eprintln!("{cache_name}: failed: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} caches failed to populate", targets.len());
    }
    Ok(())
}

fn parse_value(input: &str, raw: bool) -> Result<Value> {
    if raw {
        return Ok(Value::String(input.to_string()));
    }
    serde_json::from_str(input)
        .with_context(|| format!("value is not valid JSON (use --raw for plain strings): {input}"))
}

fn print_record(record: &KeyRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            match &record.value {
                Some(value) if record.exists => {
                    println!("{}", serde_json::to_string_pretty(value)?);
                    if let Some(hint) = &record.type_hint {
                        println!("-- {hint}");
                    }
                }
                _ => println!("Key '{}' not found", record.key),
            }
            Ok(())
        }
    }
}

fn print_outcome(outcome: &OperationOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => {
            println!("{}", outcome.message);
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
