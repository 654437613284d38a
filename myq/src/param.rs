//! Query parameters

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::value::Value;

/// One positional query parameter.
///
/// Each parameter is consumed by the placeholder at the same position in
/// the template, except that a run of [`Param::Row`]s jointly fills a single
/// `VALUES (?)` placeholder and turns the statement into a batched insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A single escaped literal
    Scalar(Value),
    /// Comma-separated list, for `IN (?)`
    Sequence(Vec<Param>),
    /// `col = value` pairs in insertion order, for `SET ?`
    Mapping(IndexMap<String, Param>),
    /// One fixed-arity row of a multi-row insert
    Row(Vec<Param>),
}

impl Param {
    /// An IN-list parameter.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Param>,
    {
        Param::Sequence(values.into_iter().map(Into::into).collect())
    }

    /// A row-tuple parameter.
    pub fn row<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Param>,
    {
        Param::Row(values.into_iter().map(Into::into).collect())
    }

    /// A SET-clause parameter; entries keep the given order.
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Param>,
    {
        Param::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_row(&self) -> bool {
        matches!(self, Param::Row(_))
    }

    pub(crate) fn shape_name(&self) -> &'static str {
        match self {
            Param::Scalar(_) => "scalar",
            Param::Sequence(_) => "sequence",
            Param::Mapping(_) => "mapping",
            Param::Row(_) => "row-tuple",
        }
    }

    /// Reject nestings that cannot render to valid SQL.
    ///
    /// Sequences hold scalars or row-tuples, row-tuples and mapping
    /// values hold scalars only.
    pub(crate) fn check_shape(&self) -> Result<()> {
        match self {
            Param::Scalar(_) => Ok(()),
            Param::Sequence(items) => {
                for item in items {
                    match item {
                        Param::Scalar(_) => {}
                        Param::Row(_) => item.check_shape()?,
                        other => {
                            return Err(Error::ParamShape(format!(
                                "a sequence cannot contain a {}",
                                other.shape_name()
                            )))
                        }
                    }
                }
                Ok(())
            }
            Param::Row(items) => {
                if items.is_empty() {
                    return Err(Error::ParamShape("row-tuple has no values".into()));
                }
                match items.iter().find(|p| !matches!(p, Param::Scalar(_))) {
                    Some(other) => Err(Error::ParamShape(format!(
                        "a row-tuple cannot contain a {}",
                        other.shape_name()
                    ))),
                    None => Ok(()),
                }
            }
            Param::Mapping(entries) => {
                match entries.iter().find(|(_, p)| !matches!(p, Param::Scalar(_))) {
                    Some((key, other)) => Err(Error::ParamShape(format!(
                        "mapping entry `{}` holds a {}, expected a scalar",
                        key,
                        other.shape_name()
                    ))),
                    None => Ok(()),
                }
            }
        }
    }

    /// Append this parameter's leaf values in binding order.
    pub(crate) fn flatten_into(&self, out: &mut Vec<Value>) {
        match self {
            Param::Scalar(v) => out.push(v.clone()),
            Param::Sequence(items) | Param::Row(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            Param::Mapping(entries) => {
                for item in entries.values() {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Param::Scalar(v)
    }
}

macro_rules! impl_scalar_param {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Param {
                fn from(v: $ty) -> Self {
                    Param::Scalar(v.into())
                }
            }
        )+
    };
}

impl_scalar_param!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &str,
    NaiveDate,
    NaiveDateTime,
    NaiveTime,
    Decimal,
    serde_json::Value
);

impl<T: Into<Value>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        Param::Scalar(v.into())
    }
}
