use super::descriptor::{DataType, DefaultValue, SchemaDescriptor};
use super::table::TableSchema;
use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::value::{Row, Value};
use serde::{Deserialize, Serialize};

/// One row of a "describe columns" result, as storage reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name.
    pub field: String,
    /// Native type, possibly with a length/precision suffix (`varchar(255)`).
    #[serde(rename = "type")]
    pub native_type: String,
    /// Nullability flag (`YES` / `NO`).
    pub null: String,
    /// Key flag (`PRI`, `UNI`, ...); informational.
    #[serde(default)]
    pub key: String,
    /// Default expression; `None` for SQL NULL.
    pub default: Option<String>,
    /// Extra attributes (`auto_increment`, `unique`, ...).
    #[serde(default)]
    pub extra: String,
}

impl RawColumn {
    pub fn new(field: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            native_type: native_type.into(),
            null: "YES".to_string(),
            ..Self::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.null = "NO".to_string();
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        let text = |name: &str| -> Option<String> {
            match row.get(name) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            }
        };

        Ok(Self {
            field: text("Field").ok_or_else(|| OrmError::decode("Field", "missing column name"))?,
            native_type: text("Type").unwrap_or_default(),
            null: text("Null").unwrap_or_default(),
            key: text("Key").unwrap_or_default(),
            default: text("Default"),
            extra: text("Extra").unwrap_or_default(),
        })
    }
}

/// "Describe columns" for PostgreSQL, shaped like MySQL's `SHOW COLUMNS` output.
///
/// Sequence-backed and identity columns report `auto_increment` with no default; columns under
/// a single-column UNIQUE constraint report `unique`.
const DESCRIBE_COLUMNS_SQL: &str = r#"
SELECT
  c.column_name::text AS "Field",
  c.data_type::text AS "Type",
  c.is_nullable::text AS "Null",
  CASE
    WHEN EXISTS (
      SELECT 1
      FROM information_schema.table_constraints tc
      JOIN information_schema.key_column_usage k
        ON k.constraint_name = tc.constraint_name AND k.table_schema = tc.table_schema
      WHERE tc.constraint_type = 'PRIMARY KEY'
        AND tc.table_schema = c.table_schema AND tc.table_name = c.table_name
        AND k.column_name = c.column_name
    ) THEN 'PRI'
    ELSE ''
  END AS "Key",
  CASE
    WHEN c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' THEN NULL
    ELSE c.column_default::text
  END AS "Default",
  CASE
    WHEN c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' THEN 'auto_increment'
    WHEN EXISTS (
      SELECT 1
      FROM information_schema.table_constraints tc
      JOIN information_schema.key_column_usage k
        ON k.constraint_name = tc.constraint_name AND k.table_schema = tc.table_schema
      WHERE tc.constraint_type = 'UNIQUE'
        AND tc.table_schema = c.table_schema AND tc.table_name = c.table_name
        AND k.column_name = c.column_name
        AND (
          SELECT COUNT(*) FROM information_schema.key_column_usage k2
          WHERE k2.constraint_name = tc.constraint_name AND k2.table_schema = tc.table_schema
        ) = 1
    ) THEN 'unique'
    ELSE ''
  END AS "Extra"
FROM information_schema.columns c
WHERE c.table_schema::text = $1 AND c.table_name::text = $2
ORDER BY c.ordinal_position
"#;

/// Run "describe columns" for `table` and return the raw rows unmodified.
///
/// `table` may be schema-qualified (`audit.events`); unqualified names resolve to `public`.
pub async fn describe_table<C: Executor>(conn: &C, table: &str) -> OrmResult<Vec<RawColumn>> {
    let ident = Ident::parse(table)?;
    let (schema, name) = match table.rsplit_once('.') {
        Some((schema, _)) => (schema.trim_matches('"').to_string(), ident.name().to_string()),
        None => ("public".to_string(), ident.name().to_string()),
    };

    let rows = conn
        .query(DESCRIBE_COLUMNS_SQL, &[Value::from(schema), Value::from(name)])
        .await
        .map_err(OrmError::into_storage)?;

    tracing::debug!(target: "pgrecord.schema", table, columns = rows.len(), "described table");
    rows.iter().map(RawColumn::from_row).collect()
}

/// Describe `table` and build its [`TableSchema`].
pub async fn load_table_schema<C: Executor>(conn: &C, table: &str) -> OrmResult<TableSchema> {
    let raw = describe_table(conn, table).await?;
    if raw.is_empty() {
        return Err(OrmError::precondition(format!(
            "table {table} does not exist or has no columns"
        )));
    }
    TableSchema::new(table, build_schema(&raw))
}

/// Map raw column rows to descriptors, one per row, in order.
pub fn build_schema(raw: &[RawColumn]) -> Vec<SchemaDescriptor> {
    raw.iter().map(build_descriptor).collect()
}

fn build_descriptor(raw: &RawColumn) -> SchemaDescriptor {
    SchemaDescriptor::new(raw.field.clone(), classify_native_type(&raw.native_type))
        .with_default_value(classify_default(raw.default.as_deref()))
        .with_nullable(raw.null.eq_ignore_ascii_case("yes"))
        .with_auto_increment(raw.extra == "auto_increment")
        .with_unique(raw.extra == "unique")
}

fn classify_default(raw: Option<&str>) -> DefaultValue {
    match raw {
        None => DefaultValue::Unset,
        Some(expr) if is_null_default(expr) => DefaultValue::Unset,
        Some(expr) if is_current_timestamp(expr) => DefaultValue::CurrentTimestamp,
        Some(expr) => DefaultValue::Literal(Value::from(expr)),
    }
}

/// `NULL`, possibly cast (`NULL::character varying`).
fn is_null_default(expr: &str) -> bool {
    let head = expr.split("::").next().unwrap_or(expr).trim();
    let head = head.trim_start_matches('(').trim_end_matches(')').trim();
    head.eq_ignore_ascii_case("null")
}

fn is_current_timestamp(expr: &str) -> bool {
    let expr = expr.trim().to_ascii_lowercase();
    matches!(
        expr.as_str(),
        "current_timestamp" | "current_timestamp()" | "now()" | "localtimestamp"
    )
}

/// Native type name to generic [`DataType`].
///
/// The name is lower-cased and any `(..)` suffix is dropped first. Unknown names map to
/// [`DataType::String`].
pub fn classify_native_type(native: &str) -> DataType {
    let lowered = native.trim().to_ascii_lowercase();
    let base = match lowered.find('(') {
        Some(pos) => {
            let tail = lowered[pos..].find(')').map_or("", |end| &lowered[pos + end + 1..]);
            format!("{}{}", &lowered[..pos], tail)
        }
        None => lowered,
    };
    let base = base.trim().trim_end_matches(" unsigned").trim();

    match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2" | "int4"
        | "int8" | "serial" | "smallserial" | "bigserial" | "year" => DataType::Integer,
        "float" | "double" | "double precision" | "real" | "decimal" | "numeric" | "float4"
        | "float8" | "money" => DataType::Double,
        "json" | "jsonb" | "array" => DataType::Array,
        "boolean" | "bool" => DataType::Boolean,
        // date/time, text, binary and enum-like natives, plus anything unrecognized
        _ => DataType::String,
    }
}

/// Columns an insert must supply, straight from raw metadata.
pub fn required_columns(raw: &[RawColumn]) -> Vec<String> {
    build_schema(raw)
        .into_iter()
        .filter(SchemaDescriptor::is_required)
        .map(|d| d.column().to_string())
        .collect()
}
