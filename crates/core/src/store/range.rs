// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Key ranges for secondary-index queries.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
struct Bound {
    value: Value,
    open: bool,
}

/// A range over index values.
///
/// Bounds are inclusive unless constructed as open. Text and numbers are both
/// valid index values; numbers sort before text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl KeyRange {
    /// Every indexed value.
    pub fn all() -> Self {
        KeyRange::default()
    }

    /// Exactly one value.
    pub fn only(value: impl Into<Value>) -> Self {
        let value = value.into();
        KeyRange {
            lower: Some(Bound { value: value.clone(), open: false }),
            upper: Some(Bound { value, open: false }),
        }
    }

    /// Values greater than (or equal to, unless `open`) `value`.
    pub fn lower_bound(value: impl Into<Value>, open: bool) -> Self {
        KeyRange { lower: Some(Bound { value: value.into(), open }), upper: None }
    }

    /// Values less than (or equal to, unless `open`) `value`.
    pub fn upper_bound(value: impl Into<Value>, open: bool) -> Self {
        KeyRange { lower: None, upper: Some(Bound { value: value.into(), open }) }
    }

    /// Values between `lower` and `upper`.
    pub fn bound(
        lower: impl Into<Value>,
        upper: impl Into<Value>,
        lower_open: bool,
        upper_open: bool,
    ) -> Self {
        KeyRange {
            lower: Some(Bound { value: lower.into(), open: lower_open }),
            upper: Some(Bound { value: upper.into(), open: upper_open }),
        }
    }

    /// Renders the range as SQL conditions on `column`, appending parameters.
    pub(crate) fn to_sql(&self, column: &str, params: &mut Vec<SqlValue>) -> Result<String> {
        let mut clauses = Vec::new();
        if let Some(lower) = &self.lower {
            let op = if lower.open { ">" } else { ">=" };
            params.push(range_value(&lower.value)?);
            clauses.push(format!("{column} {op} ?{}", params.len()));
        }
        if let Some(upper) = &self.upper {
            let op = if upper.open { "<" } else { "<=" };
            params.push(range_value(&upper.value)?);
            clauses.push(format!("{column} {op} ?{}", params.len()));
        }
        Ok(clauses.join(" AND "))
    }
}

fn range_value(value: &Value) -> Result<SqlValue> {
    index_value(value).ok_or_else(|| {
        Error::InvalidInput(format!("key range bound must be a string or number, got {value}"))
    })
}

/// Converts a JSON scalar into the value stored in an index entry.
///
/// Returns `None` for values that cannot be indexed (null, objects, arrays).
pub(crate) fn index_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Follows a dot-separated field path into a JSON document.
pub(crate) fn extract_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}
