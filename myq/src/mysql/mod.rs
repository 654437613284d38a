//! MySQL implementation for myq

mod driver;
mod types;

pub use driver::{MySqlDialect, MySqlDriver, MySqlSession};
pub use types::{from_mysql_value, to_mysql_value};
