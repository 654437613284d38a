//! A single pooled database connection

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::result::{ExecuteResult, QueryResult};
use crate::template::Expanded;
use crate::traits::{Driver, ResultSet, Session};
use crate::value::Value;

/// One database connection: at most one live session at a time.
///
/// A connection starts out disconnected. [`Connection::connect`] opens a
/// session (retrying with backoff), [`Connection::close`] releases it. A
/// session that drops unexpectedly is not tracked here; the pool finds out
/// with a ping on the next checkout.
///
/// A statement counts as pending from the moment it is sent until its
/// commit or rollback completes. A caller that gives up mid-statement leaves
/// it pending, and [`Connection::discard_pending`] must run before the
/// session is reused.
pub struct Connection<D: Driver> {
    id: usize,
    driver: Arc<D>,
    config: Arc<Config>,
    session: Option<D::Session>,
    pending: bool,
}

impl<D: Driver> Connection<D> {
    /// Create a disconnected connection.
    pub fn new(id: usize, driver: Arc<D>, config: Arc<Config>) -> Self {
        Self {
            id,
            driver,
            config,
            session: None,
            pending: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a statement was sent but never committed or rolled back.
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Roll back a statement abandoned mid-flight.
    ///
    /// If the rollback itself fails the session is closed, so the next
    /// liveness probe fails and the connection is reopened.
    pub async fn discard_pending(&mut self) {
        if !self.pending {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            self.pending = false;
            return;
        };
        warn!(connection = self.id, "rolling back abandoned statement");
        match session.rollback().await {
            Ok(()) => self.pending = false,
            Err(e) => {
                warn!(connection = self.id, error = %e, "rollback failed, dropping session");
                self.close().await;
            }
        }
    }

    /// Open a session, retrying up to `retries` extra times.
    ///
    /// Any session already held is closed first. Attempts are spaced by the
    /// configured exponential backoff; on exhaustion the last driver error is
    /// wrapped in [`Error::Connection`] and the connection stays disconnected.
    pub async fn connect(&mut self, retries: u32) -> Result<()> {
        self.close().await;

        let attempts = retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(
                connection = self.id,
                host = %self.config.host,
                database = %self.config.database,
                attempt,
                "connecting to mysql"
            );

            match self.driver.connect(&self.config).await {
                Ok(session) => {
                    info!(connection = self.id, "connected");
                    self.session = Some(session);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    let delay = self.config.backoff(attempt - 1);
                    warn!(
                        connection = self.id,
                        attempt,
                        error = %e,
                        retry_in = ?delay,
                        "connect attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(connection = self.id, attempts, error = %e, "failed to connect");
                    return Err(Error::Connection {
                        attempts,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    /// Liveness probe. A disconnected connection is never alive.
    pub async fn is_alive(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(connection = self.id, error = %e, "ping failed");
                false
            }
        }
    }

    /// Run an expanded single statement and commit it.
    ///
    /// Batched inserts go through one batched execute; anything else runs
    /// over the text protocol and is classified by whether it produced a
    /// result set.
    pub async fn execute(&mut self, expanded: Expanded) -> Result<QueryResult> {
        let (sql, rows) = expanded.into_parts();
        if let Some(rows) = rows {
            return self.execute_batch(&sql, rows).await;
        }

        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        debug!(connection = self.id, sql = %sql, "executing");
        self.pending = true;
        let outcome = session.query(&sql).await;
        let mut sets = self.finish(&sql, outcome).await?;

        Ok(match sets.len() {
            0 => QueryResult::Affected(ExecuteResult::default()),
            _ => classify(sets.swap_remove(0)),
        })
    }

    /// Run a `;`-separated batch and commit once after every result set
    /// has been drained.
    pub async fn execute_multi_statement(
        &mut self,
        expanded: Expanded,
    ) -> Result<Vec<QueryResult>> {
        if expanded.is_batch() {
            return Err(Error::ParamShape(
                "row-tuples cannot be used in a multi-statement query".into(),
            ));
        }
        let (sql, _) = expanded.into_parts();

        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        debug!(connection = self.id, sql = %sql, "executing multi-statement");
        self.pending = true;
        let outcome = session.query(&sql).await;
        let sets = self.finish(&sql, outcome).await?;

        Ok(sets.into_iter().map(classify).collect())
    }

    /// Execute `sql` once per row of bound values and commit.
    pub async fn execute_batch(
        &mut self,
        sql: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<QueryResult> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        debug!(connection = self.id, sql, rows = rows.len(), "executing batch");
        self.pending = true;
        let outcome = session.exec_batch(sql, rows).await;
        let set = self.finish(sql, outcome).await?;

        Ok(QueryResult::Affected(ExecuteResult {
            rows_affected: set.affected_rows,
            last_insert_id: set.last_insert_id,
        }))
    }

    /// Commit after a successful driver call, roll back after a failed one.
    async fn finish<T>(&mut self, sql: &str, outcome: Result<T>) -> Result<T> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        let cause = match outcome {
            Ok(value) => match session.commit().await {
                Ok(()) => {
                    self.pending = false;
                    return Ok(value);
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        warn!(connection = self.id, sql, error = %cause, "query failed");
        match session.rollback().await {
            Ok(()) => self.pending = false,
            // Still pending: the next checkout retries the rollback
            Err(e) => debug!(connection = self.id, error = %e, "rollback failed"),
        }
        Err(Error::query(sql, cause))
    }

    /// Close the session. Closing a disconnected connection is a no-op.
    pub async fn close(&mut self) {
        self.pending = false;
        let Some(session) = self.session.take() else {
            return;
        };
        match session.close().await {
            Ok(()) => debug!(connection = self.id, "closed connection"),
            Err(e) => warn!(connection = self.id, error = %e, "failed to close connection"),
        }
    }
}

fn classify(set: ResultSet) -> QueryResult {
    if set.has_rows() {
        QueryResult::Rows(set.rows)
    } else {
        QueryResult::Affected(ExecuteResult {
            rows_affected: set.affected_rows,
            last_insert_id: set.last_insert_id,
        })
    }
}
