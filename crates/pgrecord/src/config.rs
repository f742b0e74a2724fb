//! Per-entity configuration.

use crate::entity::Entity;
use crate::naming::default_table_name;
use crate::value::{TIMESTAMP_FORMAT, parse_naive_datetime};

/// Default primary key column.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Where an entity lives and how its bookkeeping columns are named.
///
/// Usually derived from the [`Entity`] constants via [`RecordConfig::for_entity`]; every
/// setting can be overridden with the builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    table: String,
    primary_key: String,
    created_at: Option<String>,
    updated_at: Option<String>,
    timestamp_format: String,
    max_logged_sql: usize,
}

impl RecordConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            created_at: Some("created_at".to_string()),
            updated_at: Some("updated_at".to_string()),
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
            max_logged_sql: 200,
        }
    }

    /// Settings from an entity's constants; the table name falls back to the pluralized,
    /// snake-cased type name.
    pub fn for_entity<E: Entity>() -> Self {
        let table = E::TABLE
            .map(str::to_string)
            .unwrap_or_else(|| default_table_name(E::TYPE_NAME));
        Self {
            primary_key: E::PRIMARY_KEY.to_string(),
            created_at: E::CREATED_AT.map(str::to_string),
            updated_at: E::UPDATED_AT.map(str::to_string),
            ..Self::new(table)
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    pub fn max_logged_sql(&self) -> usize {
        self.max_logged_sql
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// `None` disables the creation timestamp.
    pub fn with_created_at(mut self, column: Option<&str>) -> Self {
        self.created_at = column.map(str::to_string);
        self
    }

    /// `None` disables the update timestamp.
    pub fn with_updated_at(mut self, column: Option<&str>) -> Self {
        self.updated_at = column.map(str::to_string);
        self
    }

    pub fn without_timestamps(self) -> Self {
        self.with_created_at(None).with_updated_at(None)
    }

    /// chrono `strftime` format used when stamping timestamp columns.
    ///
    /// The rendering has to read back as a full timestamp (ISO 8601 with a `T` or a space,
    /// optional fraction, optional offset), since it is bound to `timestamp` parameters.
    /// [`now`](Self::now) falls back to [`TIMESTAMP_FORMAT`] for anything else.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn with_max_logged_sql(mut self, max_bytes: usize) -> Self {
        self.max_logged_sql = max_bytes;
        self
    }

    /// The current local time, rendered with the timestamp format.
    pub fn now(&self) -> String {
        use std::fmt::Write as _;

        let now = chrono::Local::now().naive_local();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.timestamp_format)).is_ok()
            && parse_naive_datetime(&out).is_ok()
        {
            return out;
        }
        tracing::warn!(
            target: "pgrecord.config",
            format = %self.timestamp_format,
            "timestamp format does not render a timestamp; using the default"
        );
        now.format(TIMESTAMP_FORMAT).to_string()
    }
}
