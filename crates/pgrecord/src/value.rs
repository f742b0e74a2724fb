//! Dynamic values carried by entries, payloads and statement parameters.
//!
//! Entries are plain [`serde_json::Value`]s so payloads coming from JSON bodies, rule passes and
//! fetched rows share one representation. [`SqlParam`] bridges them to `tokio-postgres`.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

pub use serde_json::Value;

/// One record: column name to value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// Default textual format for timestamps written into entries.
///
/// ISO 8601 without an offset, which is what chrono's serde impls read for `NaiveDateTime`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Runtime kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Double,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a scalar as plain text (strings unquoted, null as empty).
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `true` when the value is a number or a string that parses as one.
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// `true` when the value is an integer or a non-empty all-digit string.
pub fn is_integer_like(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

/// A [`Value`] bound as a statement parameter.
///
/// The wire encoding is chosen from the server-side parameter type, so a JSON string can feed a
/// `timestamp`, `uuid` or integer column as long as its text parses.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam(pub Value);

impl SqlParam {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for SqlParam {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for SqlParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            value if *ty == Type::JSON || *ty == Type::JSONB => value.to_sql_checked(ty, out),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Number(n) => number_to_sql(n, ty, out),
            Value::String(s) => text_to_sql(s, ty, out),
            Value::Array(items) => array_to_sql(items, ty, out),
            value @ Value::Object(_) => {
                Err(format!("cannot bind {} to parameter of type {ty}", ValueKind::of(value)).into())
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn number_to_sql(n: &serde_json::Number, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let as_int = || n.as_i64().ok_or_else(|| BoxError::from(format!("{n} is not an integer")));
    let as_float = || n.as_f64().ok_or_else(|| BoxError::from(format!("{n} is not a number")));

    match *ty {
        Type::INT2 => i16::try_from(as_int()?)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(as_int()?)?.to_sql_checked(ty, out),
        Type::INT8 => as_int()?.to_sql_checked(ty, out),
        Type::FLOAT4 => (as_float()? as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => as_float()?.to_sql_checked(ty, out),
        Type::NUMERIC => number_to_decimal(n)?.to_sql_checked(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => n.to_string().to_sql_checked(ty, out),
        _ => match n.as_i64() {
            Some(i) => i.to_sql_checked(ty, out),
            None => as_float()?.to_sql_checked(ty, out),
        },
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => s.trim().parse::<i16>()?.to_sql_checked(ty, out),
        Type::INT4 => s.trim().parse::<i32>()?.to_sql_checked(ty, out),
        Type::INT8 => s.trim().parse::<i64>()?.to_sql_checked(ty, out),
        Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql_checked(ty, out),
        Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql_checked(ty, out),
        Type::NUMERIC => text_to_decimal(s)?.to_sql_checked(ty, out),
        Type::BOOL => parse_bool(s)?.to_sql_checked(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql_checked(ty, out),
        Type::DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql_checked(ty, out),
        Type::TIME => NaiveTime::parse_from_str(s, "%H:%M:%S")?.to_sql_checked(ty, out),
        Type::TIMESTAMP => parse_naive_datetime(s)?.to_sql_checked(ty, out),
        Type::TIMESTAMPTZ => parse_utc_datetime(s)?.to_sql_checked(ty, out),
        _ => s.to_sql_checked(ty, out),
    }
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "on" => Ok(true),
        "f" | "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("invalid boolean literal: {other:?}").into()),
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Result<Decimal, BoxError> {
    match n.as_i64() {
        Some(i) => Ok(Decimal::from(i)),
        // shortest round-trip rendering, so 0.1 stays 0.1
        None => text_to_decimal(&n.to_string()),
    }
}

fn text_to_decimal(s: &str) -> Result<Decimal, BoxError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(Into::into)
}

/// Bind a JSON array to a server-side array parameter, element by element.
fn array_to_sql(items: &[Value], ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY => {
            elements(items, |v| match v {
                Value::Array(_) | Value::Object(_) => Err(element_error(v, ty)),
                other => Ok(value_to_text(other)),
            })?
            .to_sql_checked(ty, out)
        }
        Type::INT2_ARRAY => {
            elements(items, |v| Ok(i16::try_from(element_int(v, ty)?)?))?.to_sql_checked(ty, out)
        }
        Type::INT4_ARRAY => {
            elements(items, |v| Ok(i32::try_from(element_int(v, ty)?)?))?.to_sql_checked(ty, out)
        }
        Type::INT8_ARRAY => elements(items, |v| element_int(v, ty))?.to_sql_checked(ty, out),
        Type::FLOAT4_ARRAY => {
            elements(items, |v| Ok(element_float(v, ty)? as f32))?.to_sql_checked(ty, out)
        }
        Type::FLOAT8_ARRAY => elements(items, |v| element_float(v, ty))?.to_sql_checked(ty, out),
        Type::NUMERIC_ARRAY => elements(items, |v| match v {
            Value::Number(n) => number_to_decimal(n),
            Value::String(s) => text_to_decimal(s),
            other => Err(element_error(other, ty)),
        })?
        .to_sql_checked(ty, out),
        Type::BOOL_ARRAY => elements(items, |v| match v {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => parse_bool(s),
            other => Err(element_error(other, ty)),
        })?
        .to_sql_checked(ty, out),
        Type::UUID_ARRAY => elements(items, |v| match v {
            Value::String(s) => Ok(uuid::Uuid::parse_str(s)?),
            other => Err(element_error(other, ty)),
        })?
        .to_sql_checked(ty, out),
        _ => Err(format!("cannot bind array to parameter of type {ty}").into()),
    }
}

/// Convert every non-null element; nulls stay SQL `NULL`.
fn elements<T>(
    items: &[Value],
    convert: impl Fn(&Value) -> Result<T, BoxError>,
) -> Result<Vec<Option<T>>, BoxError> {
    items
        .iter()
        .map(|item| match item {
            Value::Null => Ok(None),
            other => convert(other).map(Some),
        })
        .collect()
}

fn element_error(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} element to parameter of type {ty}", ValueKind::of(value)).into()
}

fn element_int(value: &Value, ty: &Type) -> Result<i64, BoxError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| element_error(value, ty)),
        Value::String(s) => Ok(s.trim().parse::<i64>()?),
        other => Err(element_error(other, ty)),
    }
}

fn element_float(value: &Value, ty: &Type) -> Result<f64, BoxError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| element_error(value, ty)),
        Value::String(s) => Ok(s.trim().parse::<f64>()?),
        other => Err(element_error(other, ty)),
    }
}

/// Parse the textual timestamps entries carry: ISO 8601 (`T` or space separated, optional
/// fraction) or RFC 3339 with an offset, which is converted to UTC.
pub(crate) fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime, BoxError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
        .map_err(Into::into)
}

fn parse_utc_datetime(s: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => Ok(parse_naive_datetime(s)?.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_split_integers_from_doubles() {
        assert_eq!(ValueKind::of(&json!(3)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(3.5)), ValueKind::Double);
        assert_eq!(ValueKind::of(&json!("3")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!([1])), ValueKind::Array);
        assert_eq!(ValueKind::of(&Value::Null), ValueKind::Null);
    }

    #[test]
    fn integer_like_accepts_digit_strings_only() {
        assert!(is_integer_like(&json!(12)));
        assert!(is_integer_like(&json!("12")));
        assert!(!is_integer_like(&json!("12a")));
        assert!(!is_integer_like(&json!("")));
        assert!(!is_integer_like(&json!("-1")));
        assert!(!is_integer_like(&json!(1.5)));
    }

    #[test]
    fn text_rendering_unquotes_strings() {
        assert_eq!(value_to_text(&json!("a")), "a");
        assert_eq!(value_to_text(&json!(1.5)), "1.5");
        assert_eq!(value_to_text(&Value::Null), "");
        assert_eq!(value_to_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn params_encode_by_server_type() {
        let mut buf = BytesMut::new();
        let param = SqlParam(json!("12"));
        assert!(matches!(param.to_sql(&Type::INT8, &mut buf), Ok(IsNull::No)));
        assert_eq!(buf.as_ref(), 12_i64.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(SqlParam(json!("abc")).to_sql(&Type::INT4, &mut buf).is_err());

        let mut buf = BytesMut::new();
        assert!(matches!(
            SqlParam(Value::Null).to_sql(&Type::TEXT, &mut buf),
            Ok(IsNull::Yes)
        ));
    }

    #[test]
    fn numeric_params_encode_as_decimals() {
        let mut from_number = BytesMut::new();
        SqlParam(json!(1.5)).to_sql(&Type::NUMERIC, &mut from_number).unwrap();

        let mut from_text = BytesMut::new();
        SqlParam(json!(" 1.5 ")).to_sql(&Type::NUMERIC, &mut from_text).unwrap();

        let mut expected = BytesMut::new();
        Decimal::from_str("1.5").unwrap().to_sql(&Type::NUMERIC, &mut expected).unwrap();
        assert_eq!(from_number, expected);
        assert_eq!(from_text, expected);

        let mut buf = BytesMut::new();
        assert!(SqlParam(json!(42)).to_sql(&Type::NUMERIC, &mut buf).is_ok());
        let mut buf = BytesMut::new();
        assert!(SqlParam(json!("lots")).to_sql(&Type::NUMERIC, &mut buf).is_err());
    }

    #[test]
    fn arrays_bind_to_array_parameters() {
        let mut buf = BytesMut::new();
        let tags = SqlParam(json!(["a", null, "b"]));
        assert!(matches!(tags.to_sql(&Type::TEXT_ARRAY, &mut buf), Ok(IsNull::No)));

        let mut expected = BytesMut::new();
        vec![Some("a".to_string()), None, Some("b".to_string())]
            .to_sql(&Type::TEXT_ARRAY, &mut expected)
            .unwrap();
        assert_eq!(buf, expected);

        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([1, "2"])).to_sql(&Type::INT4_ARRAY, &mut buf).is_ok());
        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([true, "f"])).to_sql(&Type::BOOL_ARRAY, &mut buf).is_ok());

        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([1.5])).to_sql(&Type::INT8_ARRAY, &mut buf).is_err());
        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([{"a": 1}])).to_sql(&Type::TEXT_ARRAY, &mut buf).is_err());
        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([1])).to_sql(&Type::INT4, &mut buf).is_err());

        let mut buf = BytesMut::new();
        assert!(SqlParam(json!([1, 2])).to_sql(&Type::JSONB, &mut buf).is_ok());
    }

    #[test]
    fn timestamps_parse_with_either_separator() {
        let iso = parse_naive_datetime("2024-01-02T03:04:05").unwrap();
        assert_eq!(parse_naive_datetime("2024-01-02 03:04:05").unwrap(), iso);
        assert_eq!(parse_naive_datetime("2024-01-02T03:04:05+00:00").unwrap(), iso);
        assert!(parse_naive_datetime("2024").is_err());

        let mut buf = BytesMut::new();
        let stamp = iso.format(TIMESTAMP_FORMAT).to_string();
        assert!(SqlParam(json!(stamp)).to_sql(&Type::TIMESTAMP, &mut buf).is_ok());
    }
}
