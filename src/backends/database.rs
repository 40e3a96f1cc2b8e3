//! Relational cache table (Postgres or SQLite via sqlx)
//!
//! The table layout is fixed:
//!
//! ```text
//! cache_key  VARCHAR(255) PRIMARY KEY   -- physical key, ":<version>:<prefix>:<key>"
//! value      TEXT                       -- JSON-encoded value
//! expires    TIMESTAMPTZ (postgres) | INTEGER unix micros (sqlite)
//! ```
//!
//! Rows whose `expires` is in the past are logically absent: they are never
//! returned by `get`, never counted, never listed. Expired rows are left for
//! the owning cache to cull.

use super::error::{StoreError, StoreResult};
use super::expiration::{Expiration, Ttl};
use super::{decode_text_value, encode_value, redact_url, NativeCache};
use crate::keys::{pattern, KeyCodec};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// SQL dialect of the cache table's database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    Sqlite,
}

impl SqlDialect {
    /// Detect the dialect from a connection URL scheme
    pub fn from_url(url: &str) -> StoreResult<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(StoreError::Configuration(format!(
                "unsupported database URL scheme: {}",
                redact_url(url)
            )))
        }
    }

    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::Sqlite => "?".to_string(),
        }
    }

    /// Byte-wise key ordering regardless of the database's default collation
    fn order_by_key(self) -> &'static str {
        match self {
            Self::Postgres => "cache_key COLLATE \"C\"",
            Self::Sqlite => "cache_key",
        }
    }

    fn expires_column_type(self) -> &'static str {
        match self {
            Self::Postgres => "TIMESTAMPTZ",
            Self::Sqlite => "INTEGER",
        }
    }
}

/// Connection pool for one of the supported dialects
#[derive(Debug, Clone)]
pub enum DatabasePool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    pub fn dialect(&self) -> SqlDialect {
        match self {
            Self::Postgres(_) => SqlDialect::Postgres,
            Self::Sqlite(_) => SqlDialect::Sqlite,
        }
    }

    /// Build a pool without opening a connection.
    pub fn connect_lazy(url: &str) -> StoreResult<Self> {
        match SqlDialect::from_url(url)? {
            SqlDialect::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_lazy(url)
                    .map_err(|e| {
                        StoreError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
                    })?;
                Ok(Self::Postgres(pool))
            }
            SqlDialect::Sqlite => {
                // LIKE is case-insensitive in SQLite unless asked otherwise
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(|e| StoreError::Configuration(format!("Invalid SQLite URL: {e}")))?
                    .create_if_missing(true)
                    .pragma("case_sensitive_like", "ON");
                // A single long-lived connection keeps `sqlite::memory:` databases alive
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_lazy_with(options);
                Ok(Self::Sqlite(pool))
            }
        }
    }
}

/// Far-future timestamp used for rows that never expire
fn never_expires() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Deadline for a write; `None` marks a row stored already expired
fn deadline(ttl: Ttl, now: DateTime<Utc>) -> DateTime<Utc> {
    match ttl {
        Ttl::Persistent => never_expires(),
        Ttl::Expires(ttl) => chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or_else(never_expires),
        Ttl::Expired => now - chrono::Duration::seconds(1),
    }
}

/// SQLite stores timestamps as unix microseconds
fn sqlite_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Cache table of one logical cache instance
#[derive(Debug)]
pub struct DatabaseTable {
    pool: DatabasePool,
    table: String,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    create_table: bool,
    schema_ready: OnceCell<()>,
}

impl DatabaseTable {
    /// Bind a table to an existing pool
    pub fn new(
        pool: DatabasePool,
        table: impl Into<String>,
        codec: KeyCodec,
        default_ttl: Option<Duration>,
    ) -> StoreResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            pool,
            table,
            codec,
            default_ttl,
            create_table: false,
            schema_ready: OnceCell::new(),
        })
    }

    /// Create the table on first use when it does not exist yet
    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.pool.dialect()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table)
    }

    /// Create the cache table and its expiry index if missing
    pub async fn ensure_table(&self) -> StoreResult<()> {
        let dialect = self.dialect();
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             cache_key VARCHAR(255) NOT NULL PRIMARY KEY, \
             value TEXT NOT NULL, \
             expires {expires} NOT NULL)",
            table = self.quoted_table(),
            expires = dialect.expires_column_type(),
        );
        let index = format!(
            "CREATE INDEX IF NOT EXISTS \"{name}_expires\" ON {table} (expires)",
            name = self.table,
            table = self.quoted_table(),
        );

        for statement in [create, index] {
            match &self.pool {
                DatabasePool::Postgres(pool) => {
                    sqlx::query(&statement).execute(pool).await?;
                }
                DatabasePool::Sqlite(pool) => {
                    sqlx::query(&statement).execute(pool).await?;
                }
            }
        }

        info!(table = %self.table, dialect = ?dialect, "Cache table ready");
        Ok(())
    }

    async fn ready(&self) -> StoreResult<()> {
        if self.create_table {
            self.schema_ready
                .get_or_try_init(|| self.ensure_table())
                .await?;
        }
        Ok(())
    }

    /// Count live rows whose physical key matches a `LIKE` operand
    pub async fn count_matching(&self, like: &str) -> StoreResult<u64> {
        self.ready().await?;
        let dialect = self.dialect();
        let sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE cache_key LIKE {p1} ESCAPE '\\' AND expires > {p2}",
            table = self.quoted_table(),
            p1 = dialect.placeholder(1),
            p2 = dialect.placeholder(2),
        );
        let now = Utc::now();

        let count: i64 = match &self.pool {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(like)
                    .bind(now)
                    .fetch_one(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(like)
                    .bind(sqlite_timestamp(now))
                    .fetch_one(pool)
                    .await?
            }
        };

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// One ordered page of live physical keys matching a `LIKE` operand
    pub async fn page_matching(
        &self,
        like: &str,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<String>> {
        self.ready().await?;
        let dialect = self.dialect();
        let sql = format!(
            "SELECT cache_key FROM {table} WHERE cache_key LIKE {p1} ESCAPE '\\' AND expires > {p2} \
             ORDER BY {order} LIMIT {p3} OFFSET {p4}",
            table = self.quoted_table(),
            order = dialect.order_by_key(),
            p1 = dialect.placeholder(1),
            p2 = dialect.placeholder(2),
            p3 = dialect.placeholder(3),
            p4 = dialect.placeholder(4),
        );
        let now = Utc::now();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let keys: Vec<String> = match &self.pool {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(like)
                    .bind(now)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(like)
                    .bind(sqlite_timestamp(now))
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(keys)
    }

    async fn fetch_live_value(&self, physical: &str) -> StoreResult<Option<String>> {
        let dialect = self.dialect();
        let sql = format!(
            "SELECT value FROM {table} WHERE cache_key = {p1} AND expires > {p2}",
            table = self.quoted_table(),
            p1 = dialect.placeholder(1),
            p2 = dialect.placeholder(2),
        );
        let now = Utc::now();

        let value = match &self.pool {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(physical)
                    .bind(now)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar(&sql)
                    .bind(physical)
                    .bind(sqlite_timestamp(now))
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(value)
    }
}

#[async_trait]
impl NativeCache for DatabaseTable {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.ready().await?;
        let raw = self.fetch_live_value(&self.codec.encode(key)).await?;
        debug!(key = key, table = %self.table, hit = raw.is_some(), "Cache GET (database)");
        Ok(raw.map(|text| decode_text_value(&text)))
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        self.ready().await?;
        let dialect = self.dialect();
        let sql = format!(
            "INSERT INTO {table} (cache_key, value, expires) VALUES ({p1}, {p2}, {p3}) \
             ON CONFLICT (cache_key) DO UPDATE SET value = excluded.value, expires = excluded.expires",
            table = self.quoted_table(),
            p1 = dialect.placeholder(1),
            p2 = dialect.placeholder(2),
            p3 = dialect.placeholder(3),
        );
        let physical = self.codec.encode(key);
        let text = encode_value(value)?;
        let expires = deadline(expiration.ttl(self.default_ttl), Utc::now());

        match &self.pool {
            DatabasePool::Postgres(pool) => {
                sqlx::query(&sql)
                    .bind(&physical)
                    .bind(&text)
                    .bind(expires)
                    .execute(pool)
                    .await?;
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query(&sql)
                    .bind(&physical)
                    .bind(&text)
                    .bind(sqlite_timestamp(expires))
                    .execute(pool)
                    .await?;
            }
        }

        debug!(key = key, table = %self.table, ?expiration, "Cache SET (database)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ready().await?;
        let sql = format!(
            "DELETE FROM {table} WHERE cache_key = {p1}",
            table = self.quoted_table(),
            p1 = self.dialect().placeholder(1),
        );
        let physical = self.codec.encode(key);

        let affected = match &self.pool {
            DatabasePool::Postgres(pool) => sqlx::query(&sql)
                .bind(&physical)
                .execute(pool)
                .await?
                .rows_affected(),
            DatabasePool::Sqlite(pool) => sqlx::query(&sql)
                .bind(&physical)
                .execute(pool)
                .await?
                .rows_affected(),
        };

        debug!(key = key, table = %self.table, affected = affected, "Cache DEL (database)");
        Ok(affected > 0)
    }

    async fn clear(&self) -> StoreResult<u64> {
        self.ready().await?;
        let sql = format!(
            "DELETE FROM {table} WHERE cache_key LIKE {p1} ESCAPE '\\'",
            table = self.quoted_table(),
            p1 = self.dialect().placeholder(1),
        );
        let mut like = pattern::escape_like(&self.codec.namespace());
        like.push('%');

        let affected = match &self.pool {
            DatabasePool::Postgres(pool) => sqlx::query(&sql)
                .bind(&like)
                .execute(pool)
                .await?
                .rows_affected(),
            DatabasePool::Sqlite(pool) => sqlx::query(&sql)
                .bind(&like)
                .execute(pool)
                .await?
                .rows_affected(),
        };

        debug!(
            table = %self.table,
            namespace = %self.codec.namespace(),
            removed = affected,
            "Cache namespace cleared (database)"
        );
        Ok(affected)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are allowed
fn validate_table_name(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && table.len() <= 63 {
        Ok(())
    } else {
        Err(StoreError::Configuration(format!(
            "invalid cache table name '{table}'"
        )))
    }
}
