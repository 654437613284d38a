//! Driver traits: the seam between the pool and a concrete database client

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::result::Row;
use crate::value::Value;

/// Database-specific literal escaping.
pub trait Dialect: Send + Sync {
    /// Render a scalar as a quoted, escaped SQL literal.
    fn escape(&self, value: &Value) -> String;
}

/// Opens sessions against a database server.
///
/// The pool owns one driver and calls [`Driver::connect`] every time a
/// connection needs a fresh session.
#[async_trait]
pub trait Driver: Dialect + 'static {
    /// Live session type produced by this driver
    type Session: Session;

    /// Establish a new session using the given configuration.
    async fn connect(&self, config: &Config) -> Result<Self::Session>;
}

/// One live database session.
///
/// A session is only ever used by the single holder of its connection,
/// so every method takes `&mut self`.
#[async_trait]
pub trait Session: Send + 'static {
    /// Lightweight liveness probe.
    async fn ping(&mut self) -> Result<()>;

    /// Run one or more `;`-separated statements over the text protocol and
    /// drain every result set in order.
    async fn query(&mut self, sql: &str) -> Result<Vec<ResultSet>>;

    /// Execute a single statement once per row of bound values.
    ///
    /// The returned set carries the summed affected-row count.
    async fn exec_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<ResultSet>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Close the session, releasing the underlying handle.
    async fn close(self) -> Result<()>;
}

/// One raw result set as reported by the driver.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// Column names; empty when the statement produced no result set
    pub columns: Vec<String>,
    /// Fetched rows
    pub rows: Vec<Row>,
    /// Rows affected by a non-row-returning statement
    pub affected_rows: u64,
    /// Last auto-increment id, if any
    pub last_insert_id: Option<u64>,
}

impl ResultSet {
    /// Whether the statement exposed a row-returning result set.
    pub fn has_rows(&self) -> bool {
        !self.columns.is_empty()
    }
}
