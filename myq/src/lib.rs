//! myq - MySQL pool and query templates
//!
//! A connection pool for raw SQL on top of `mysql_async`, with a small
//! placeholder language for building statements from heterogeneous
//! parameters.
//!
//! # Features
//!
//! - **Bounded pool**: fixed number of connections, waiting checkout with an
//!   optional deadline, ping-and-reconnect on checkout
//! - **Retrying connect**: exponential backoff between connect attempts
//! - **Templates**: `?` (or `%s`) placeholders filled from scalars, IN-lists,
//!   SET-clause mappings and multi-row insert tuples
//! - **Multi-statement**: one result per `;`-separated statement
//!
//! # Example
//!
//! ```ignore
//! use myq::{Config, Param, Pool, QueryResult};
//!
//! let pool = Pool::connect(Config::new("localhost", "root", "", "app", 3306)).await?;
//!
//! pool.query(
//!     "INSERT INTO users (id, name) VALUES (?)",
//!     &[Param::row(["1", "jasper"]), Param::row(["2", "jv"])],
//! )
//! .await?;
//!
//! if let QueryResult::Rows(rows) = pool
//!     .query("SELECT * FROM users WHERE name IN (?)", &[Param::list(["jasper", "jv"])])
//!     .await?
//! {
//!     for row in rows {
//!         println!("{}", row.get::<String>("name")?);
//!     }
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod mysql;
pub mod param;
pub mod pool;
pub mod query;
pub mod result;
pub mod template;
pub mod traits;
pub mod value;

// Re-export main types
pub use config::Config;
pub use connection::Connection;
pub use error::{Error, Result};
pub use format::Formatter;
pub use mysql::{MySqlDialect, MySqlDriver, MySqlSession};
pub use param::Param;
pub use pool::{Pool, PooledConnection};
pub use query::Query;
pub use result::{ExecuteResult, QueryResult, Row};
pub use template::{expand, Expanded};
pub use traits::{Dialect, Driver, FromValue, ResultSet, Session};
pub use value::Value;
