//! Statement executor abstraction.
//!
//! [`Executor`] is the only thing models need from a connection: run a statement and get rows
//! back, run a statement and get an affected count, and bracket work in a transaction. It is
//! implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction` and (with the `pool`
//! feature) pooled `deadpool_postgres::Client`s, so callers pass whichever they hold.

use crate::error::{OrmError, OrmResult};
use crate::row::decode_row;
use crate::value::{Row, SqlParam, Value};
use std::future::Future;
use tokio_postgres::types::ToSql;

/// A connection that can execute statements.
pub trait Executor: Send + Sync {
    /// Execute a statement and return every row, decoded.
    fn query(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Begin a transaction on this connection.
    fn begin(&self) -> impl Future<Output = OrmResult<()>> + Send {
        async move { self.execute("BEGIN", &[]).await.map(|_| ()) }
    }

    /// Commit the open transaction.
    fn commit(&self) -> impl Future<Output = OrmResult<()>> + Send {
        async move { self.execute("COMMIT", &[]).await.map(|_| ()) }
    }

    /// Roll back the open transaction.
    fn rollback(&self) -> impl Future<Output = OrmResult<()>> + Send {
        async move { self.execute("ROLLBACK", &[]).await.map(|_| ()) }
    }
}

/// Truncate SQL for logging, respecting char boundaries.
pub(crate) fn truncate_sql(sql: &str, max_bytes: usize) -> String {
    if sql.len() <= max_bytes {
        return sql.to_string();
    }
    let mut end = max_bytes;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

fn bind(params: &[Value]) -> Vec<SqlParam> {
    params.iter().cloned().map(SqlParam).collect()
}

fn refs(params: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn decode_all(rows: Vec<tokio_postgres::Row>) -> OrmResult<Vec<Row>> {
    rows.iter().map(decode_row).collect()
}

impl Executor for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let bound = bind(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs(&bound))
            .await
            .map_err(OrmError::from_db_error)?;
        decode_all(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let bound = bind(params);
        tokio_postgres::Client::execute(self, sql, &refs(&bound))
            .await
            .map_err(OrmError::from_db_error)
    }
}

/// Statements run inside the borrowed transaction. `begin`/`commit`/`rollback` map to
/// savepoints so batch writes nest cleanly inside a caller-owned transaction.
impl Executor for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let bound = bind(params);
        let rows = tokio_postgres::Transaction::query(self, sql, &refs(&bound))
            .await
            .map_err(OrmError::from_db_error)?;
        decode_all(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let bound = bind(params);
        tokio_postgres::Transaction::execute(self, sql, &refs(&bound))
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn begin(&self) -> OrmResult<()> {
        Executor::execute(self, "SAVEPOINT pgrecord_batch", &[])
            .await
            .map(|_| ())
    }

    async fn commit(&self) -> OrmResult<()> {
        Executor::execute(self, "RELEASE SAVEPOINT pgrecord_batch", &[])
            .await
            .map(|_| ())
    }

    async fn rollback(&self) -> OrmResult<()> {
        Executor::execute(self, "ROLLBACK TO SAVEPOINT pgrecord_batch", &[])
            .await
            .map(|_| ())
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let client: &tokio_postgres::Client = self;
        Executor::query(client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let client: &tokio_postgres::Client = self;
        Executor::execute(client, sql, params).await
    }
}
