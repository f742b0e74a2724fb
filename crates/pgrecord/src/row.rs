//! Decoding `tokio_postgres::Row`s into [`Row`] maps.

use crate::error::{OrmError, OrmResult};
use crate::value::{Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use tokio_postgres::types::{FromSql, Type};

/// Decode every column of a fetched row, keeping column order.
pub fn decode_row(row: &tokio_postgres::Row) -> OrmResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())
            .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

/// `timestamp` columns render as ISO 8601, keeping any fractional seconds.
const NAIVE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize) -> Result<Option<T>, tokio_postgres::Error>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
}

fn lift<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

fn decode_column(
    row: &tokio_postgres::Row,
    idx: usize,
    ty: &Type,
) -> Result<Value, Box<dyn Error + Sync + Send>> {
    let value = match *ty {
        Type::BOOL => lift(get::<bool>(row, idx)?),
        Type::INT2 => lift(get::<i16>(row, idx)?),
        Type::INT4 => lift(get::<i32>(row, idx)?),
        Type::INT8 => lift(get::<i64>(row, idx)?),
        Type::OID => lift(get::<u32>(row, idx)?),
        Type::FLOAT4 => lift(get::<f32>(row, idx)?),
        Type::FLOAT8 => lift(get::<f64>(row, idx)?),
        Type::NUMERIC => lift(get::<Decimal>(row, idx)?.and_then(|d| d.to_f64())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            lift(get::<String>(row, idx)?)
        }
        Type::JSON | Type::JSONB => get::<Value>(row, idx)?.unwrap_or(Value::Null),
        Type::UUID => lift(get::<uuid::Uuid>(row, idx)?.map(|u| u.to_string())),
        Type::TIMESTAMP => lift(
            get::<NaiveDateTime>(row, idx)?.map(|ts| ts.format(NAIVE_TIMESTAMP).to_string()),
        ),
        Type::TIMESTAMPTZ => lift(get::<DateTime<Utc>>(row, idx)?.map(|ts| ts.to_rfc3339())),
        Type::DATE => lift(get::<NaiveDate>(row, idx)?.map(|d| d.format("%Y-%m-%d").to_string())),
        Type::TIME => lift(get::<NaiveTime>(row, idx)?.map(|t| t.format("%H:%M:%S").to_string())),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY => {
            array(get::<Vec<Option<String>>>(row, idx)?)
        }
        Type::INT2_ARRAY => array(get::<Vec<Option<i16>>>(row, idx)?),
        Type::INT4_ARRAY => array(get::<Vec<Option<i32>>>(row, idx)?),
        Type::INT8_ARRAY => array(get::<Vec<Option<i64>>>(row, idx)?),
        Type::FLOAT4_ARRAY => array(get::<Vec<Option<f32>>>(row, idx)?),
        Type::FLOAT8_ARRAY => array(get::<Vec<Option<f64>>>(row, idx)?),
        Type::NUMERIC_ARRAY => {
            array(convert_items(get::<Vec<Option<Decimal>>>(row, idx)?, |d| d.to_f64()))
        }
        Type::BOOL_ARRAY => array(get::<Vec<Option<bool>>>(row, idx)?),
        Type::UUID_ARRAY => array(convert_items(
            get::<Vec<Option<uuid::Uuid>>>(row, idx)?,
            |u| Some(u.to_string()),
        )),
        _ => return Err(format!("unsupported column type {ty}").into()),
    };
    Ok(value)
}

fn convert_items<T, U>(
    items: Option<Vec<Option<T>>>,
    convert: impl Fn(T) -> Option<U>,
) -> Option<Vec<Option<U>>> {
    items.map(|items| items.into_iter().map(|item| item.and_then(&convert)).collect())
}

fn array<T: Into<Value>>(items: Option<Vec<Option<T>>>) -> Value {
    match items {
        Some(items) => Value::Array(items.into_iter().map(lift).collect()),
        None => Value::Null,
    }
}
