//! mysql_async-backed driver

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};

use crate::config::Config;
use crate::error::Result;
use crate::traits::{Dialect, Driver, ResultSet, Session};
use crate::value::Value;

use super::types::{from_mysql_row, to_mysql_value};

/// MySQL literal escaping, backslash-escape mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn escape(&self, value: &Value) -> String {
        to_mysql_value(value).as_sql(false)
    }
}

/// Opens [`MySqlSession`]s with `mysql_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl Dialect for MySqlDriver {
    fn escape(&self, value: &Value) -> String {
        MySqlDialect.escape(value)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    type Session = MySqlSession;

    async fn connect(&self, config: &Config) -> Result<MySqlSession> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            // Explicit transactions: every statement is committed or rolled back by the caller
            .init(vec![
                format!("SET NAMES {}", config.charset),
                "SET autocommit = 0".to_string(),
            ]);

        let conn = Conn::new(opts).await?;
        Ok(MySqlSession { conn })
    }
}

/// A single `mysql_async` connection.
pub struct MySqlSession {
    conn: Conn,
}

#[async_trait]
impl Session for MySqlSession {
    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<ResultSet>> {
        let mut result = self.conn.query_iter(sql).await?;
        let mut sets = Vec::new();

        while !result.is_empty() {
            let columns: Vec<String> = result
                .columns()
                .map(|cols| cols.iter().map(|c| c.name_str().into_owned()).collect())
                .unwrap_or_default();
            let affected_rows = result.affected_rows();
            let last_insert_id = result.last_insert_id();

            let raw: Vec<mysql_async::Row> = result.collect().await?;
            let mut rows = Vec::with_capacity(raw.len());
            for row in raw {
                rows.push(from_mysql_row(row)?);
            }

            sets.push(ResultSet {
                columns,
                rows,
                affected_rows,
                last_insert_id,
            });
        }

        Ok(sets)
    }

    async fn exec_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<ResultSet> {
        let stmt = self.conn.prep(sql).await?;

        let mut affected_rows = 0;
        let mut last_insert_id = None;
        for row in rows {
            let params: Vec<mysql_async::Value> = row.iter().map(to_mysql_value).collect();
            self.conn.exec_drop(&stmt, params).await?;

            affected_rows += self.conn.affected_rows();
            // Report the id of the first inserted row, as a multi-row INSERT would
            if last_insert_id.is_none() {
                last_insert_id = self.conn.last_insert_id();
            }
        }

        Ok(ResultSet {
            affected_rows,
            last_insert_id,
            ..ResultSet::default()
        })
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}
