//! Rendering of parameters as escaped SQL text

use crate::param::Param;
use crate::traits::Dialect;

/// Renders [`Param`]s as SQL text using a dialect's escaping primitive.
///
/// Output is in template form: every literal `%` is doubled so it cannot
/// be mistaken for a `%s` marker when the expanded template is rendered.
pub struct Formatter<'a, D: ?Sized> {
    dialect: &'a D,
}

impl<'a, D: Dialect + ?Sized> Formatter<'a, D> {
    pub fn new(dialect: &'a D) -> Self {
        Self { dialect }
    }

    /// Format one parameter.
    ///
    /// - scalar: escaped literal
    /// - sequence: `a, b, c`
    /// - mapping: `k1 = v1, k2 = v2`
    /// - row-tuple: `(a, b, c)`
    pub fn format(&self, param: &Param) -> String {
        match param {
            Param::Scalar(value) => escape_percent(&self.dialect.escape(value)),
            Param::Sequence(items) => self.join(items.iter()),
            Param::Mapping(entries) => entries
                .iter()
                .map(|(key, value)| format!("{} = {}", escape_percent(key), self.format(value)))
                .collect::<Vec<_>>()
                .join(", "),
            Param::Row(items) => format!("({})", self.join(items.iter())),
        }
    }

    fn join<'p>(&self, items: impl Iterator<Item = &'p Param>) -> String {
        items
            .map(|item| self.format(item))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) fn escape_percent(text: &str) -> String {
    text.replace('%', "%%")
}
