//! Payload shapes and the shape validator.
//!
//! A payload is either one flat mapping (`Single`) or a non-empty list of flat mappings
//! (`Multi`). Every key must be a non-empty string. Validation collects every violation it finds
//! and reports them together as [`ShapeErrors`].

use crate::value::{Row, Value, ValueKind};
use serde::Serialize;
use std::fmt;

/// What went wrong with one part of a payload.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeCode {
    /// Empty mapping or empty sequence.
    Empty,
    /// A mapping key is the empty string.
    EmptyKey,
    /// Something other than a mapping where a row was expected.
    NotAMapping,
    /// A column an insert must supply is missing or null.
    Required,
}

impl ShapeCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "empty",
            Self::EmptyKey => "empty_key",
            Self::NotAMapping => "not_a_mapping",
            Self::Required => "required",
        }
    }
}

impl Serialize for ShapeCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single shape violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeError {
    /// Where in the payload: `$` for the root, `$[2]` for the third row, `$[2].name` for a key.
    pub location: String,
    pub code: ShapeCode,
    pub message: String,
}

impl ShapeError {
    pub fn new(location: impl Into<String>, code: ShapeCode, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeErrors {
    pub items: Vec<ShapeError>,
}

impl ShapeErrors {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, err: ShapeError) {
        self.items.push(err);
    }

    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeError> {
        self.items.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ShapeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShapeErrors {}

/// A validated single-row or multi-row payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Row),
    Multi(Vec<Row>),
}

impl Payload {
    /// Classify an arbitrary JSON value, rejecting anything that is not a well-formed payload.
    pub fn from_value(value: Value) -> Result<Self, ShapeErrors> {
        let mut errors = ShapeErrors::default();
        match value {
            Value::Object(row) => {
                check_row("$", &row, &mut errors);
                errors.into_result().map(|()| Self::Single(row))
            }
            Value::Array(items) => {
                if items.is_empty() {
                    errors.push(ShapeError::new("$", ShapeCode::Empty, "empty sequence"));
                }
                let mut rows = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let location = format!("$[{i}]");
                    match item {
                        Value::Object(row) => {
                            check_row(&location, &row, &mut errors);
                            rows.push(row);
                        }
                        other => errors.push(ShapeError::new(
                            location,
                            ShapeCode::NotAMapping,
                            format!("expected a mapping, found {}", ValueKind::of(&other)),
                        )),
                    }
                }
                errors.into_result().map(|()| Self::Multi(rows))
            }
            other => {
                errors.push(ShapeError::new(
                    "$",
                    ShapeCode::NotAMapping,
                    format!(
                        "expected a mapping or a sequence of mappings, found {}",
                        ValueKind::of(&other)
                    ),
                ));
                Err(errors)
            }
        }
    }

    /// Re-check a payload that was assembled directly rather than through [`Payload::from_value`].
    pub fn validate(&self) -> Result<(), ShapeErrors> {
        let mut errors = ShapeErrors::default();
        match self {
            Self::Single(row) => check_row("$", row, &mut errors),
            Self::Multi(rows) => {
                if rows.is_empty() {
                    errors.push(ShapeError::new("$", ShapeCode::Empty, "empty sequence"));
                }
                for (i, row) in rows.iter().enumerate() {
                    check_row(&format!("$[{i}]"), row, &mut errors);
                }
            }
        }
        errors.into_result()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Single(row) => std::slice::from_ref(row),
            Self::Multi(rows) => rows,
        }
    }

    /// The multi-row view: a single row becomes a one-element list.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Single(row) => vec![row],
            Self::Multi(rows) => rows,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Single(row) => Value::Object(row),
            Self::Multi(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
        }
    }
}

impl From<Row> for Payload {
    fn from(row: Row) -> Self {
        Self::Single(row)
    }
}

impl From<Vec<Row>> for Payload {
    fn from(rows: Vec<Row>) -> Self {
        Self::Multi(rows)
    }
}

fn check_row(location: &str, row: &Row, errors: &mut ShapeErrors) {
    if row.is_empty() {
        errors.push(ShapeError::new(location, ShapeCode::Empty, "empty mapping"));
    }
    if row.keys().any(String::is_empty) {
        errors.push(ShapeError::new(
            format!("{location}.\"\""),
            ShapeCode::EmptyKey,
            "keys must be non-empty strings",
        ));
    }
}

/// Collect a [`ShapeCode::Required`] violation for each column in `required` that `row` lacks
/// or holds as `null`.
pub fn check_required<S: AsRef<str>>(row: &Row, required: &[S]) -> Result<(), ShapeErrors> {
    let mut errors = ShapeErrors::default();
    for column in required {
        let column = column.as_ref();
        if row.get(column).is_none_or(Value::is_null) {
            errors.push(ShapeError::new(
                format!("$.{column}"),
                ShapeCode::Required,
                "required column has no value",
            ));
        }
    }
    errors.into_result()
}
