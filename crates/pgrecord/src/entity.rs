//! Entity declarations and typed field handles.
//!
//! An [`Entity`] names the table a [`Model`](crate::Model) works on and, optionally, a
//! registration table of its fields. `#[derive(Entity)]` generates all of it from a struct:
//!
//! ```ignore
//! #[derive(Entity, Serialize, Deserialize)]
//! #[record(table = "users")]
//! struct User {
//!     id: Option<i64>,
//!     email: String,
//!     #[record(column = "display_name")]
//!     name: String,
//! }
//!
//! let users = Model::<User>::new();
//! let mut user = users.find(&conn, 1).await?.expect("user 1");
//! user.set_field(&conn, User::NAME, "Ann".to_string()).await?;
//! ```

use crate::config::RecordConfig;
use crate::error::{OrmError, OrmResult};
use crate::event::{HookAction, ModelEvent};
use crate::schema::DataType;
use crate::value::{Row, Value};
use std::fmt;
use std::marker::PhantomData;

/// One entry of an entity's field registration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Rust field identifier.
    pub name: &'static str,
    /// Storage column.
    pub column: &'static str,
    /// Generic type the Rust field maps to, when it maps to exactly one.
    pub data_type: Option<DataType>,
}

impl FieldDef {
    pub const fn new(
        name: &'static str,
        column: &'static str,
        data_type: Option<DataType>,
    ) -> Self {
        Self {
            name,
            column,
            data_type,
        }
    }
}

/// Typed handle to one column of an entity.
pub struct Field<T> {
    column: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            _marker: PhantomData,
        }
    }

    pub const fn column(&self) -> &'static str {
        self.column
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.column).finish()
    }
}

/// A record type backed by one table.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Type name, used to derive the default table name.
    const TYPE_NAME: &'static str;
    /// Explicit table name.
    const TABLE: Option<&'static str> = None;
    const PRIMARY_KEY: &'static str = crate::config::DEFAULT_PRIMARY_KEY;
    const CREATED_AT: Option<&'static str> = Some("created_at");
    const UPDATED_AT: Option<&'static str> = Some("updated_at");
    /// Declared fields. Empty means "whatever the table has".
    const FIELDS: &'static [FieldDef] = &[];

    fn config() -> RecordConfig {
        RecordConfig::for_entity::<Self>()
    }

    /// Entity-level lifecycle handler, called after the dispatcher.
    ///
    /// Returning [`HookAction::Abort`] from a "before" event cancels the operation; the return
    /// value of "after" events is ignored.
    fn on_event(event: &ModelEvent) -> HookAction {
        let _ = event;
        HookAction::Continue
    }

    /// Registration entry for a Rust field identifier or a column name.
    fn field(name: &str) -> Option<&'static FieldDef> {
        Self::FIELDS
            .iter()
            .find(|def| def.name == name || def.column == name)
    }
}

/// Build a value from model entries.
pub trait FromEntries: Sized {
    fn from_entries(entries: &Row) -> OrmResult<Self>;
}

/// Turn a value into model entries.
pub trait IntoEntries {
    fn into_entries(self) -> OrmResult<Row>;
}

impl FromEntries for Row {
    fn from_entries(entries: &Row) -> OrmResult<Self> {
        Ok(entries.clone())
    }
}

impl IntoEntries for Row {
    fn into_entries(self) -> OrmResult<Row> {
        Ok(self)
    }
}

/// Read one entry and deserialize it; used by derive-generated `FromEntries` impls.
///
/// A missing entry deserializes from `null`, so `Option<T>` fields may be absent. Timestamps
/// written with a space separator are retried in ISO form, so chrono fields read them too.
pub fn decode_entry<T: serde::de::DeserializeOwned>(entries: &Row, column: &str) -> OrmResult<T> {
    let value = entries.get(column).cloned().unwrap_or_default();
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(e) => iso_timestamp(&value)
            .and_then(|iso| serde_json::from_value(iso).ok())
            .ok_or_else(|| OrmError::decode(column, e.to_string())),
    }
}

fn iso_timestamp(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    if text.as_bytes().get(10) != Some(&b' ') {
        return None;
    }
    let parsed = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Some(Value::from(parsed.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
}

/// Serialize one field into an entry; used by derive-generated `IntoEntries` impls.
pub fn encode_entry<T: serde::Serialize>(
    entries: &mut Row,
    column: &str,
    value: &T,
) -> OrmResult<()> {
    entries.insert(column.to_string(), serde_json::to_value(value)?);
    Ok(())
}

/// An entity with no registration table, addressed purely by table name at runtime.
///
/// `Model::<Table>::with_config(RecordConfig::new("audit_log"))` works on any table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Table;

impl Entity for Table {
    const TYPE_NAME: &'static str = "Table";
}
