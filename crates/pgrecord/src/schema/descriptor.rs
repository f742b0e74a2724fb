use crate::value::{Row, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
    Array,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    /// Whether a runtime value agrees with this type.
    ///
    /// `null` is accepted everywhere; nullability is the storage layer's call. Integers are
    /// valid doubles, and JSON objects count as arrays.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, ValueKind::of(value)) {
            (_, ValueKind::Null) => true,
            (Self::String, ValueKind::String) => true,
            (Self::Integer, ValueKind::Integer) => true,
            (Self::Double, ValueKind::Integer | ValueKind::Double) => true,
            (Self::Boolean, ValueKind::Boolean) => true,
            (Self::Array, ValueKind::Array | ValueKind::Object) => true,
            _ => false,
        }
    }
}

/// `'text'::type` -> `text`; anything else unchanged.
fn unwrap_cast(expr: &str) -> &str {
    let expr = expr.trim();
    let head = match expr.find("::") {
        Some(pos) => &expr[..pos],
        None => expr,
    };
    head.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(head)
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Introspected column default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DefaultValue {
    /// No default (or an explicit `NULL` default).
    #[default]
    Unset,
    /// The storage engine stamps the current time.
    CurrentTimestamp,
    /// A literal default, verbatim.
    Literal(Value),
}

impl DefaultValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

/// Immutable description of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    column: String,
    data_type: DataType,
    default_value: DefaultValue,
    nullable: bool,
    auto_increment: bool,
    unique: bool,
}

impl SchemaDescriptor {
    /// A nullable, non-unique column with no default.
    pub fn new(column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            column: column.into(),
            data_type,
            default_value: DefaultValue::Unset,
            nullable: true,
            auto_increment: false,
            unique: false,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default_value
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub fn with_column(&self, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_data_type(&self, data_type: DataType) -> Self {
        Self {
            data_type,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_default_value(&self, default_value: DefaultValue) -> Self {
        Self {
            default_value,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self {
            nullable,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_auto_increment(&self, auto_increment: bool) -> Self {
        Self {
            auto_increment,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_unique(&self, unique: bool) -> Self {
        Self {
            unique,
            ..self.clone()
        }
    }

    /// Starting entry value for a fresh record.
    ///
    /// Literal defaults arrive as text; they are converted to the column's type when the text
    /// parses (`'0'` for an integer column becomes `0`), with PostgreSQL casts such as
    /// `'draft'::character varying` unwrapped. Everything else starts as `null`.
    pub fn default_entry(&self) -> Value {
        let literal = match &self.default_value {
            DefaultValue::Literal(Value::String(text)) => unwrap_cast(text),
            DefaultValue::Literal(other) => return other.clone(),
            DefaultValue::Unset | DefaultValue::CurrentTimestamp => return Value::Null,
        };

        let parsed = match self.data_type {
            DataType::String => None,
            DataType::Integer => literal.parse::<i64>().ok().map(Value::from),
            DataType::Double => literal.parse::<f64>().ok().map(Value::from),
            DataType::Boolean => match literal.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Some(Value::Bool(true)),
                "false" | "f" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            DataType::Array => serde_json::from_str(literal).ok(),
        };
        parsed.unwrap_or_else(|| Value::from(literal))
    }

    /// Whether an insert must supply this column: no default and not nullable.
    pub fn is_required(&self) -> bool {
        self.default_value.is_unset() && !self.nullable && !self.auto_increment
    }

    /// Flat key/value view, in a fixed key order.
    pub fn to_map(&self) -> Row {
        let default = match &self.default_value {
            DefaultValue::Unset => Value::Null,
            DefaultValue::CurrentTimestamp => Value::from("CURRENT_TIMESTAMP"),
            DefaultValue::Literal(value) => value.clone(),
        };

        let mut map = Row::new();
        map.insert("column".into(), Value::from(self.column.clone()));
        map.insert("data_type".into(), Value::from(self.data_type.as_str()));
        map.insert("default".into(), default);
        map.insert("nullable".into(), Value::from(self.nullable));
        map.insert("auto_increment".into(), Value::from(self.auto_increment));
        map.insert("unique".into(), Value::from(self.unique));
        map
    }
}
