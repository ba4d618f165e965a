use std::sync::Arc;

use async_trait::async_trait;
use bb8::PooledConnection;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::accumulator::ResultList;
use crate::command::SqlCommand;
use crate::cursor::{collect_records, single_record};
use crate::error::SqlMapperError;
use crate::mapper::RecordMapper;
use crate::record::{FromRecord, ToParams};

use super::config::{SharedSqliteConnection, SqliteManager};
use super::params::bind_command;
use super::row::{SqliteCursor, schema_from_statement};

/// How a unit of work opens its transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionBehavior {
    /// Locks are taken on first read/write.
    #[default]
    Deferred,
    /// The write lock is taken immediately.
    Immediate,
    /// No other connection may read or write until the transaction ends.
    Exclusive,
}

impl TransactionBehavior {
    fn begin_sql(self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Mapped query execution against one open transaction.
#[async_trait]
pub trait DbAccessor: Send {
    /// Run a query and map every row into `T`.
    async fn query_with_cancel<T, P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<ResultList<T>, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams;

    /// Run a query that must return exactly one row.
    async fn single_with_cancel<T, P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<T, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams;

    /// Run a statement and return the number of rows it changed.
    async fn execute_with_cancel<P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<usize, SqlMapperError>
    where
        P: ToParams;

    async fn query<T, P>(&mut self, sql: &str, params: &P) -> Result<ResultList<T>, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams,
    {
        self.query_with_cancel(sql, params, &CancellationToken::new())
            .await
    }

    async fn single<T, P>(&mut self, sql: &str, params: &P) -> Result<T, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams,
    {
        self.single_with_cancel(sql, params, &CancellationToken::new())
            .await
    }

    async fn execute<P>(&mut self, sql: &str, params: &P) -> Result<usize, SqlMapperError>
    where
        P: ToParams,
    {
        self.execute_with_cancel(sql, params, &CancellationToken::new())
            .await
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlMapperError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlMapperError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlMapperError::ExecutionError(format!("sqlite blocking task failed: {e}")))?
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), SqlMapperError> {
    if cancel.is_cancelled() {
        Err(SqlMapperError::Cancelled)
    } else {
        Ok(())
    }
}

/// One transaction on one pooled connection.
///
/// Finish with [`commit`](UnitOfWork::commit) or [`rollback`](UnitOfWork::rollback).
/// Dropping an unfinished unit of work rolls the transaction back before the connection
/// goes back to the pool.
pub struct UnitOfWork {
    conn: Option<PooledConnection<'static, SqliteManager>>,
    mapper: RecordMapper,
    behavior: TransactionBehavior,
    /// True while a transaction is open and must be rolled back on drop.
    needs_rollback: bool,
}

impl UnitOfWork {
    pub(crate) async fn begin(
        conn: PooledConnection<'static, SqliteManager>,
        mapper: RecordMapper,
        behavior: TransactionBehavior,
    ) -> Result<Self, SqlMapperError> {
        run_blocking(Arc::clone(&*conn), move |c| {
            c.execute_batch(behavior.begin_sql())
                .map_err(SqlMapperError::SqliteError)
        })
        .await?;
        debug!(target: "sql_mapper::sqlite", ?behavior, "unit of work started");
        Ok(Self {
            conn: Some(conn),
            mapper,
            behavior,
            needs_rollback: true,
        })
    }

    #[must_use]
    pub fn behavior(&self) -> TransactionBehavior {
        self.behavior
    }

    #[must_use]
    pub fn mapper(&self) -> &RecordMapper {
        &self.mapper
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, SqlMapperError> {
        self.conn.as_ref().map(|c| Arc::clone(&**c)).ok_or_else(|| {
            SqlMapperError::ExecutionError("sqlite connection already released".into())
        })
    }

    fn prepare_command<P: ToParams>(
        &self,
        sql: &str,
        params: &P,
    ) -> Result<SqlCommand, SqlMapperError> {
        if sql.trim().is_empty() {
            return Err(SqlMapperError::ExecutionError(
                "SQL text must not be empty".into(),
            ));
        }
        let mut command = SqlCommand::new(sql);
        self.mapper.bind_parameters(&mut command, params)?;
        Ok(command)
    }

    async fn finish(&mut self, sql: &'static str) -> Result<(), SqlMapperError> {
        let handle = self.conn_handle()?;
        run_blocking(handle, move |c| {
            c.execute_batch(sql).map_err(SqlMapperError::SqliteError)
        })
        .await?;
        self.needs_rollback = false;
        Ok(())
    }

    /// Commit the transaction and return the connection to the pool.
    ///
    /// # Errors
    /// Returns `SqlMapperError` if committing fails; the transaction is then rolled back.
    pub async fn commit(mut self) -> Result<(), SqlMapperError> {
        match self.finish("COMMIT").await {
            Ok(()) => {
                debug!(target: "sql_mapper::sqlite", "unit of work committed");
                Ok(())
            }
            Err(err) => {
                warn!(target: "sql_mapper::sqlite", error = %err, "commit failed; rolling back");
                // Best-effort; Drop retries if this fails too.
                let _ = self.finish("ROLLBACK").await;
                Err(err)
            }
        }
    }

    /// Roll the transaction back and return the connection to the pool.
    ///
    /// # Errors
    /// Returns `SqlMapperError` if rolling back fails.
    pub async fn rollback(mut self) -> Result<(), SqlMapperError> {
        self.finish("ROLLBACK").await?;
        debug!(target: "sql_mapper::sqlite", "unit of work rolled back");
        Ok(())
    }
}

#[async_trait]
impl DbAccessor for UnitOfWork {
    async fn query_with_cancel<T, P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<ResultList<T>, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams,
    {
        check_cancelled(cancel)?;
        let plan = self.mapper.compile_read::<T>()?;
        let command = self.prepare_command(sql, params)?;
        // An abandoned future cancels the blocking row loop.
        let cancel = cancel.child_token();
        let _abandoned = cancel.clone().drop_guard();
        run_blocking(self.conn_handle()?, move |c| {
            let mut stmt = c.prepare(command.sql())?;
            bind_command(&mut stmt, &command)?;
            let schema = Arc::new(schema_from_statement(&stmt));
            let mut cursor = SqliteCursor::new(stmt.raw_query(), schema);
            collect_records(&mut cursor, &plan, &cancel)
        })
        .await
    }

    async fn single_with_cancel<T, P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<T, SqlMapperError>
    where
        T: FromRecord,
        P: ToParams,
    {
        check_cancelled(cancel)?;
        let plan = self.mapper.compile_read::<T>()?;
        let command = self.prepare_command(sql, params)?;
        // An abandoned future cancels the blocking row loop.
        let cancel = cancel.child_token();
        let _abandoned = cancel.clone().drop_guard();
        run_blocking(self.conn_handle()?, move |c| {
            let mut stmt = c.prepare(command.sql())?;
            bind_command(&mut stmt, &command)?;
            let schema = Arc::new(schema_from_statement(&stmt));
            let mut cursor = SqliteCursor::new(stmt.raw_query(), schema);
            single_record(&mut cursor, &plan, &cancel)
        })
        .await
    }

    async fn execute_with_cancel<P>(
        &mut self,
        sql: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<usize, SqlMapperError>
    where
        P: ToParams,
    {
        check_cancelled(cancel)?;
        let command = self.prepare_command(sql, params)?;
        run_blocking(self.conn_handle()?, move |c| {
            let mut stmt = c.prepare(command.sql())?;
            bind_command(&mut stmt, &command)?;
            Ok(stmt.raw_execute()?)
        })
        .await
    }
}

fn rollback_now(conn: &rusqlite::Connection) {
    if let Err(err) = conn.execute_batch("ROLLBACK") {
        warn!(target: "sql_mapper::sqlite", error = %err, "rollback on drop failed");
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.needs_rollback {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        let conn_handle: SharedSqliteConnection = Arc::clone(&*conn);
        // The pooled connection is released only after the rollback ran on it.
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                block_in_place(|| rollback_now(&conn_handle.blocking_lock()));
            }
            Ok(handle) => {
                let rolled_back = match conn_handle.try_lock() {
                    Ok(guard) => {
                        rollback_now(&guard);
                        true
                    }
                    Err(_) => false,
                };
                if !rolled_back {
                    debug!(target: "sql_mapper::sqlite", "connection busy on drop; rolling back once released");
                    handle.spawn_blocking(move || {
                        rollback_now(&conn_handle.blocking_lock());
                        drop(conn);
                    });
                    return;
                }
            }
            Err(_) => rollback_now(&conn_handle.blocking_lock()),
        }
        debug!(target: "sql_mapper::sqlite", "unfinished unit of work rolled back on drop");
        drop(conn);
    }
}
