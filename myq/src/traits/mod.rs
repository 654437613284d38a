//! Core traits for myq

mod driver;
mod from_value;

pub use driver::{Dialect, Driver, ResultSet, Session};
pub use from_value::FromValue;
