use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SqlMapperError;

/// A pooled `SQLite` connection. Blocking work locks it from `spawn_blocking`.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

fn default_pool_size() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_wal() -> bool {
    true
}

/// Options for configuring a `SQLite` pool.
///
/// Every connection to `:memory:` (or an empty path) opens its own private database, so
/// such pools hold exactly one connection that is never retired, whatever `pool_size` says.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_wal")]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_wal(),
        }
    }

    /// True when each connection would get its own private database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_empty() || self.db_path == ":memory:"
    }

    /// Parse options from JSON, e.g. `{"db_path": "app.db", "pool_size": 8}`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` if the JSON is malformed or lacks `db_path`.
    pub fn from_json(json: &str) -> Result<Self, SqlMapperError> {
        serde_json::from_str(json)
            .map_err(|e| SqlMapperError::ConfigError(format!("invalid sqlite options: {e}")))
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}

/// bb8 manager for `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    options: SqliteOptions,
}

impl SqliteManager {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConnectionError` if creating the pool fails.
    pub async fn build_pool(self) -> Result<Pool<SqliteManager>, SqlMapperError> {
        let builder = if self.options.is_in_memory() {
            debug!(target: "sql_mapper::sqlite", "in-memory database; pool holds one connection");
            Pool::<SqliteManager>::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            Pool::<SqliteManager>::builder().max_size(self.options.pool_size.max(1))
        };
        builder
            .build(self)
            .await
            .map_err(|e| SqlMapperError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

fn open_connection(options: &SqliteOptions) -> Result<rusqlite::Connection, rusqlite::Error> {
    let conn = rusqlite::Connection::open(&options.db_path)?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    if options.wal {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(target: "sql_mapper::sqlite", db_path = %options.db_path, journal_mode = %mode, "opened sqlite connection");
    }
    Ok(conn)
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = rusqlite::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let options = self.options.clone();
        async move { open_connection(&options).map(|conn| Arc::new(Mutex::new(conn))) }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let conn = Arc::clone(conn);
        async move {
            let guard = conn.lock().await;
            guard.query_row("SELECT 1", [], |_| Ok(()))
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
