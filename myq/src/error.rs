//! Error types for myq

use std::time::Duration;

use thiserror::Error;

/// Result type alias for myq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring, pooling or querying.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A connect attempt failed and the retry budget is exhausted
    #[error("Connection error after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The driver rejected the statement or execution failed
    #[error("Query error: {source}")]
    Query {
        /// Rendered statement that failed
        sql: String,
        #[source]
        source: Box<Error>,
    },

    /// Checkout did not get a connection before the deadline
    #[error("Timed out after {0:?} waiting for a pooled connection")]
    PoolTimeout(Duration),

    /// The pool has been shut down
    #[error("Connection pool is closed")]
    PoolClosed,

    /// Unsupported parameter shape or placeholder mismatch
    #[error("Invalid parameter shape: {0}")]
    ParamShape(String),

    /// Statement issued on a connection without a live session
    #[error("Connection is not open")]
    NotConnected,

    /// MySQL driver error
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// Error reported by a non-MySQL driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Type conversion error
    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion {
        expected: &'static str,
        actual: String,
    },

    /// Column not found in row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Null value for non-optional field
    #[error("Unexpected null value for column: {0}")]
    UnexpectedNull(String),
}

impl Error {
    pub(crate) fn query(sql: impl Into<String>, source: Error) -> Self {
        Error::Query {
            sql: sql.into(),
            source: Box::new(source),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
