//! Query template expansion
//!
//! Templates use positional placeholders, spelled either `?` or `%s`.
//! Expansion works on an internal form where every placeholder is `%s` and
//! every literal `%` is doubled, so substituted text can never be mistaken
//! for a placeholder:
//!
//! 1. normalize the template into the internal form
//! 2. format each parameter and splice it into its placeholder
//! 3. render: `%%` becomes `%`, any `%s` left over (the VALUES group of a
//!    batched insert) becomes the driver's native `?` marker
//!
//! ```ignore
//! use myq::{expand, MySqlDialect, Param};
//!
//! let expanded = expand(
//!     &MySqlDialect,
//!     "UPDATE users SET ? WHERE name IN (?)",
//!     &[Param::map([("status", "inactive")]), Param::list(["a", "b"])],
//! )?;
//! assert_eq!(
//!     expanded.sql(),
//!     "UPDATE users SET status = 'inactive' WHERE name IN ('a', 'b')"
//! );
//! ```

use crate::error::{Error, Result};
use crate::format::Formatter;
use crate::param::Param;
use crate::traits::Dialect;
use crate::value::Value;

/// Internal placeholder marker.
const MARKER: &str = "%s";

/// Driver-native bind marker used when rendering.
const NATIVE_MARKER: char = '?';

/// A template after parameter expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    template: String,
    sql: String,
    bound: Vec<Value>,
    rows: Option<Vec<Vec<Value>>>,
}

impl Expanded {
    fn verbatim(template: &str) -> Self {
        Self {
            template: normalize(template),
            sql: template.to_string(),
            bound: Vec::new(),
            rows: None,
        }
    }

    /// Expanded statement in internal form (`%s` markers, `%%` literals).
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Final statement text handed to the driver.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Every leaf value of every parameter, flattened in binding order.
    pub fn bound_params(&self) -> &[Value] {
        &self.bound
    }

    /// Whether the statement must run as a batched execute.
    pub fn is_batch(&self) -> bool {
        self.rows.is_some()
    }

    /// Per-row bound values of a batched insert.
    pub fn rows(&self) -> Option<&[Vec<Value>]> {
        self.rows.as_deref()
    }

    pub(crate) fn into_parts(self) -> (String, Option<Vec<Vec<Value>>>) {
        (self.sql, self.rows)
    }
}

/// Expand `template` with `params`.
///
/// An empty parameter list leaves the template untouched. When the list
/// contains row-tuples, the run of rows fills a single placeholder with one
/// `%s, %s, ...` group of the row arity, and the statement is marked for a
/// batched execute with one bind per row.
pub fn expand<D: Dialect + ?Sized>(
    dialect: &D,
    template: &str,
    params: &[Param],
) -> Result<Expanded> {
    if params.is_empty() {
        return Ok(Expanded::verbatim(template));
    }

    let normalized = normalize(template);
    let formatter = Formatter::new(dialect);

    let mut bound = Vec::new();
    let mut fragments = Vec::with_capacity(params.len());
    let mut rows: Option<Vec<Vec<Value>>> = None;
    let mut arity = 0;
    let mut rows_closed = false;

    for param in params {
        param.check_shape()?;
        param.flatten_into(&mut bound);

        let Param::Row(items) = param else {
            if rows.is_some() {
                rows_closed = true;
            }
            fragments.push(formatter.format(param));
            continue;
        };

        match rows.as_mut() {
            None => {
                arity = items.len();
                fragments.push(vec![MARKER; arity].join(", "));
                rows = Some(Vec::new());
            }
            Some(_) if rows_closed => {
                return Err(Error::ParamShape(
                    "row-tuples must be passed contiguously".into(),
                ));
            }
            Some(_) if items.len() != arity => {
                return Err(Error::ParamShape(format!(
                    "row-tuple has {} values, expected {}",
                    items.len(),
                    arity
                )));
            }
            Some(_) => {}
        }

        let mut row = Vec::with_capacity(arity);
        param.flatten_into(&mut row);
        if let Some(rows) = rows.as_mut() {
            rows.push(row);
        }
    }

    let template = substitute(&normalized, &fragments)?;
    let sql = render(&template);
    Ok(Expanded {
        template,
        sql,
        bound,
        rows,
    })
}

/// Rewrite a user template into internal form.
///
/// `?` and `%s` become `%s`; any other `%` is doubled.
pub(crate) fn normalize(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '?' => out.push_str(MARKER),
            '%' if chars.peek() == Some(&'s') => {
                chars.next();
                out.push_str(MARKER);
            }
            '%' => out.push_str("%%"),
            c => out.push(c),
        }
    }
    out
}

/// Splice one fragment into each `%s` of an internal-form template.
fn substitute(template: &str, fragments: &[String]) -> Result<String> {
    let extra: usize = fragments.iter().map(String::len).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut next = fragments.iter();
    let mut placeholders = 0;
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push_str("%%"),
            Some('s') => {
                placeholders += 1;
                match next.next() {
                    Some(fragment) => out.push_str(fragment),
                    None => out.push_str(MARKER),
                }
            }
            // normalize() never leaves a bare `%`
            Some(other) => {
                out.push_str("%%");
                out.push(other);
            }
            None => out.push_str("%%"),
        }
    }

    if placeholders != fragments.len() {
        return Err(Error::ParamShape(format!(
            "template has {} placeholder(s) but {} parameter(s) were supplied",
            placeholders,
            fragments.len()
        )));
    }
    Ok(out)
}

/// Turn internal form into driver text.
fn render(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                    continue;
                }
                Some('s') => {
                    chars.next();
                    out.push(NATIVE_MARKER);
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}
