//! Query execution: checkout, expand, execute, release

use tracing::debug;

use crate::error::Result;
use crate::param::Param;
use crate::pool::Pool;
use crate::result::QueryResult;
use crate::template::{expand, Expanded};
use crate::traits::Driver;
use crate::value::Value;

impl<D: Driver> Pool<D> {
    /// Expand a template without executing it.
    pub fn expand(&self, template: &str, params: &[Param]) -> Result<Expanded> {
        expand(&*self.inner.driver, template, params)
    }

    /// Run a single statement.
    ///
    /// Row-returning statements yield [`QueryResult::Rows`], everything else
    /// [`QueryResult::Affected`]. Row-tuple parameters turn the statement
    /// into one batched insert. The connection goes back to the pool on
    /// every exit path.
    pub async fn query(&self, template: &str, params: &[Param]) -> Result<QueryResult> {
        let mut conn = self.checkout().await?;
        let expanded = self.expand(template, params)?;
        debug!(
            connection = conn.id(),
            sql = expanded.sql(),
            bound = expanded.bound_params().len(),
            "query"
        );
        conn.execute(expanded).await
    }

    /// Run several `;`-separated statements, one result per statement in
    /// statement order.
    pub async fn multi_query(
        &self,
        template: &str,
        params: &[Param],
    ) -> Result<Vec<QueryResult>> {
        let mut conn = self.checkout().await?;
        let expanded = self.expand(template, params)?;
        debug!(connection = conn.id(), sql = expanded.sql(), "multi query");
        conn.execute_multi_statement(expanded).await
    }

    /// Execute a statement with driver-native `?` markers once per row.
    pub async fn execute_many(&self, sql: &str, rows: Vec<Vec<Value>>) -> Result<QueryResult> {
        let mut conn = self.checkout().await?;
        conn.execute_batch(sql, rows).await
    }
}

/// A query builder that supports fluent parameter binding.
///
/// # Example
///
/// ```ignore
/// use myq::{Param, Query};
///
/// let result = Query::new("UPDATE users SET ? WHERE name IN (?)")
///     .bind(Param::map([("status", "inactive")]))
///     .bind(Param::list(["a", "b"]))
///     .execute(&pool)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Query<'q> {
    template: &'q str,
    params: Vec<Param>,
}

impl<'q> Query<'q> {
    /// Create a new query with the given template.
    pub fn new(template: &'q str) -> Self {
        Self {
            template,
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Bind one row-tuple of a multi-row insert.
    pub fn bind_row<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Param>,
    {
        self.params.push(Param::row(values));
        self
    }

    /// Get the template.
    pub fn template(&self) -> &str {
        self.template
    }

    /// Get the bound parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Expand without executing.
    pub fn expand<D: Driver>(&self, pool: &Pool<D>) -> Result<Expanded> {
        pool.expand(self.template, &self.params)
    }

    /// Execute as a single statement.
    pub async fn execute<D: Driver>(self, pool: &Pool<D>) -> Result<QueryResult> {
        pool.query(self.template, &self.params).await
    }

    /// Execute as a multi-statement batch.
    pub async fn execute_multi<D: Driver>(self, pool: &Pool<D>) -> Result<Vec<QueryResult>> {
        pool.multi_query(self.template, &self.params).await
    }
}
