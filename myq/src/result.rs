//! Query results: fetched rows and affected-row records

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::traits::FromValue;
use crate::value::Value;

/// A fetched row: column name to value, in result-set column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    /// Build a row from `(column, value)` pairs.
    pub fn new<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: columns.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Get a value from the row by column name.
    ///
    /// Returns an error if the column doesn't exist.
    pub fn get_value(&self, column: &str) -> Result<&Value> {
        self.values
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    /// Get a typed value from the row by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self.get_value(column)?.clone();
        if value.is_null() {
            // Option<T> maps NULL to None; everything else rejects it
            return T::from_value(Value::Null)
                .map_err(|_| Error::UnexpectedNull(column.to_string()));
        }
        T::from_value(value)
    }

    /// Column names in result-set order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        self.values
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement
    pub rows_affected: u64,
    /// Last insert ID (for INSERT statements)
    pub last_insert_id: Option<u64>,
}

/// Result of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The statement produced a result set
    Rows(Vec<Row>),
    /// The statement modified rows
    Affected(ExecuteResult),
}

impl QueryResult {
    /// Rows of a row-returning statement, `None` otherwise.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            QueryResult::Affected(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            QueryResult::Affected(_) => None,
        }
    }

    /// Affected-row count of a modifying statement, `None` for row sets.
    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            QueryResult::Rows(_) => None,
            QueryResult::Affected(r) => Some(r.rows_affected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_typed_access() {
        let row = Row::new([("id", Value::Int(1)), ("name", Value::from("jasper"))]);
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get::<String>("name").unwrap(), "jasper");
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_row_null_and_missing() {
        let row = Row::new([("email", Value::Null)]);
        assert_eq!(row.get::<Option<String>>("email").unwrap(), None);
        assert!(matches!(
            row.get::<String>("email"),
            Err(Error::UnexpectedNull(c)) if c == "email"
        ));
        assert!(matches!(row.get::<i64>("nope"), Err(Error::ColumnNotFound(_))));
    }
}
