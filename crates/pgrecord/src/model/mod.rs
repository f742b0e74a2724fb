//! Active-record core.
//!
//! A [`Model`] holds one record's entries and drives its persistence:
//!
//! - the table schema is introspected lazily, the first time it is needed, and cached for the
//!   instance's lifetime;
//! - `set` type-checks every value against the column's [`DataType`];
//! - instances produced by a read track what changed since (the dirty set), and only such
//!   instances may be updated;
//! - writes fire lifecycle events ([`EventName`]) and return an [`Execution`].
//!
//! ```ignore
//! let users = Model::<User>::new();
//! let mut ann = users.find(&conn, 7).await?.ok_or(OrmError::not_found("user 7"))?;
//! ann.set(&conn, "name", "Ann".into()).await?;
//! let done = ann.update(&conn).await?;
//! println!("{}", done.sql()); // UPDATE users SET name = $1, updated_at = $2 WHERE id = $3
//! ```

mod outcome;
mod read;
mod write;

pub use outcome::{Execution, Records};

use crate::client::{Executor, truncate_sql};
use crate::config::RecordConfig;
use crate::entity::{Entity, Field, FromEntries, IntoEntries};
use crate::error::{OrmError, OrmResult};
use crate::event::{EventDispatcher, EventName, HookAction, ModelEvent, TracingDispatcher};
use crate::schema::{DataType, TableSchema, load_table_schema};
use crate::shape;
use crate::statement::Statement;
use crate::value::{Row, Value, ValueKind};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    /// Constructed; no schema yet.
    Fresh,
    /// Schema loaded and default entries seeded.
    Structured,
    /// Entries came from a read; changes are tracked.
    Loaded,
    /// Inserted by `save`.
    Persisted,
    /// Removed by `destroy`.
    Deleted,
}

/// One record of entity `E`.
pub struct Model<E: Entity> {
    config: RecordConfig,
    state: ModelState,
    schema: Option<Arc<TableSchema>>,
    entries: Row,
    dirty: Row,
    dispatcher: Arc<dyn EventDispatcher>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Model<E> {
    /// A fresh instance configured from the entity's constants.
    pub fn new() -> Self {
        Self::with_config(E::config())
    }

    pub fn with_config(config: RecordConfig) -> Self {
        Self {
            config,
            state: ModelState::Fresh,
            schema: None,
            entries: Row::new(),
            dirty: Row::new(),
            dispatcher: Arc::new(TracingDispatcher::new()),
            _entity: PhantomData,
        }
    }

    /// A fresh instance holding `value`'s entries.
    pub fn from_entity<T: IntoEntries>(value: T) -> OrmResult<Self> {
        Ok(Self::new().with_entries(value.into_entries()?))
    }

    /// Replace the event dispatcher (default: [`TracingDispatcher`]).
    pub fn with_dispatcher<D: EventDispatcher + 'static>(self, dispatcher: D) -> Self {
        self.with_dispatcher_arc(Arc::new(dispatcher))
    }

    pub fn with_dispatcher_arc(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Start from `entries` instead of an empty set. Columns left out are seeded from their
    /// defaults when the instance is structured. Values are checked when the instance is saved.
    pub fn with_entries(mut self, entries: Row) -> Self {
        self.entries = entries;
        self
    }

    /// Use an already known schema instead of introspecting one.
    pub fn with_schema(mut self, schema: TableSchema) -> OrmResult<Self> {
        self.install_schema(Arc::new(schema))?;
        Ok(self)
    }

    /// Share a schema between instances of the same table.
    pub fn with_shared_schema(mut self, schema: Arc<TableSchema>) -> OrmResult<Self> {
        self.install_schema(schema)?;
        Ok(self)
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    pub fn table(&self) -> &str {
        self.config.table()
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// The cached schema, if the instance has been structured.
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_deref()
    }

    pub fn entries(&self) -> &Row {
        &self.entries
    }

    /// Fields changed since the read that produced this instance, with their new values.
    pub fn dirty(&self) -> &Row {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// The primary key entry, if present and not null.
    pub fn id(&self) -> Option<&Value> {
        self.entries
            .get(self.config.primary_key())
            .filter(|v| !v.is_null())
    }

    /// Load the table schema (once) and seed default entries on a fresh instance.
    pub async fn structure<C: Executor>(&mut self, conn: &C) -> OrmResult<Arc<TableSchema>> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }
        let schema = Arc::new(load_table_schema(conn, self.config.table()).await?);
        self.install_schema(schema.clone())?;
        Ok(schema)
    }

    fn install_schema(&mut self, schema: Arc<TableSchema>) -> OrmResult<()> {
        check_declared_fields::<E>(&schema)?;
        if self.state == ModelState::Fresh {
            for (column, value) in schema.defaults() {
                if !self.entries.contains_key(&column) {
                    self.entries.insert(column, value);
                }
            }
            self.state = ModelState::Structured;
        }
        tracing::trace!(target: "pgrecord.model", table = schema.table(), columns = schema.len(), "structured");
        self.schema = Some(schema);
        Ok(())
    }

    fn require_schema(&self) -> OrmResult<Arc<TableSchema>> {
        self.schema.clone().ok_or_else(|| {
            OrmError::precondition(format!(
                "{}: schema has not been loaded; call structure() first",
                self.config.table()
            ))
        })
    }

    /// Current value of an entry.
    pub fn get(&self, field: &str) -> OrmResult<&Value> {
        self.entries
            .get(field)
            .ok_or_else(|| OrmError::UnknownField(field.to_string()))
    }

    /// Typed read of an entry.
    pub fn get_field<T: serde::de::DeserializeOwned>(&self, field: Field<T>) -> OrmResult<T> {
        let value = self.get(field.column())?.clone();
        serde_json::from_value(value).map_err(|e| OrmError::decode(field.column(), e.to_string()))
    }

    /// Assign an entry after checking it against the schema, structuring first if needed.
    ///
    /// On a loaded instance the change is also recorded in the dirty set.
    pub async fn set<C: Executor>(&mut self, conn: &C, field: &str, value: Value) -> OrmResult<()> {
        self.structure(conn).await?;
        self.assign(field, value)
    }

    /// Typed form of [`Model::set`].
    pub async fn set_field<C: Executor, T: serde::Serialize>(
        &mut self,
        conn: &C,
        field: Field<T>,
        value: T,
    ) -> OrmResult<()> {
        let value = serde_json::to_value(value)?;
        self.set(conn, field.column(), value).await
    }

    /// [`Model::set`] for every pair in `row`, stopping at the first rejected value.
    pub async fn fill<C: Executor>(&mut self, conn: &C, row: Row) -> OrmResult<()> {
        self.structure(conn).await?;
        for (field, value) in row {
            self.assign(&field, value)?;
        }
        Ok(())
    }

    /// Synchronous [`Model::set`] for an instance that already has its schema.
    pub fn assign(&mut self, field: &str, value: Value) -> OrmResult<()> {
        let schema = self.require_schema()?;
        let descriptor = schema
            .get(field)
            .ok_or_else(|| OrmError::UnknownField(format!("{}.{field}", schema.table())))?;
        if !descriptor.data_type().accepts(&value) {
            return Err(OrmError::type_mismatch(
                field,
                descriptor.data_type(),
                ValueKind::of(&value),
            ));
        }

        if self.state == ModelState::Loaded {
            self.dirty.insert(field.to_string(), value.clone());
        }
        self.entries.insert(field.to_string(), value);
        Ok(())
    }

    /// Columns an insert into this table must supply.
    pub async fn required_columns<C: Executor>(&mut self, conn: &C) -> OrmResult<Vec<String>> {
        let schema = self.structure(conn).await?;
        Ok(schema
            .required_columns()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Check that every required column holds a value.
    pub fn check_required(&self) -> OrmResult<()> {
        let schema = self.require_schema()?;
        shape::check_required(&self.entries, &schema.required_columns())?;
        Ok(())
    }

    /// Convert the entries into a typed value.
    pub fn to_entity<T: FromEntries>(&self) -> OrmResult<T> {
        T::from_entries(&self.entries)
    }

    /// A loaded sibling: same configuration, dispatcher and schema, entries from `row`.
    pub(crate) fn loaded(&self, row: Row) -> Self {
        Self {
            config: self.config.clone(),
            state: ModelState::Loaded,
            schema: self.schema.clone(),
            entries: row,
            dirty: Row::new(),
            dispatcher: self.dispatcher.clone(),
            _entity: PhantomData,
        }
    }

    /// Dispatch an event, then run the entity handler unless propagation was stopped.
    ///
    /// Only cancellable events can return [`HookAction::Abort`].
    fn fire(&self, name: EventName, entries: Row) -> HookAction {
        let mut event = ModelEvent::new(name, self.config.table(), entries);
        self.dispatcher.dispatch(&mut event);
        if event.is_propagation_stopped() {
            return HookAction::Continue;
        }

        match E::on_event(&event) {
            HookAction::Abort(reason) if name.is_cancellable() => {
                tracing::debug!(target: "pgrecord.model", table = self.config.table(), event = name.as_str(), reason = %reason, "aborted");
                HookAction::Abort(reason)
            }
            _ => HookAction::Continue,
        }
    }

    async fn fetch<C: Executor>(&self, conn: &C, stmt: &Statement) -> OrmResult<Vec<Row>> {
        self.log_statement(stmt);
        conn.query(stmt.sql(), stmt.params())
            .await
            .map_err(OrmError::into_storage)
    }

    async fn run<C: Executor>(&self, conn: &C, stmt: &Statement) -> OrmResult<u64> {
        self.log_statement(stmt);
        conn.execute(stmt.sql(), stmt.params())
            .await
            .map_err(OrmError::into_storage)
    }

    fn log_statement(&self, stmt: &Statement) {
        tracing::debug!(
            target: "pgrecord.sql",
            table = self.config.table(),
            sql = %truncate_sql(stmt.sql(), self.config.max_logged_sql()),
            params = stmt.params().len(),
        );
    }
}

/// Declared fields must exist in the table, with a compatible type.
fn check_declared_fields<E: Entity>(schema: &TableSchema) -> OrmResult<()> {
    for def in E::FIELDS {
        let Some(descriptor) = schema.get(def.column) else {
            return Err(OrmError::UnknownField(format!(
                "{}.{} (declared by {}::{})",
                schema.table(),
                def.column,
                E::TYPE_NAME,
                def.name
            )));
        };
        let Some(declared) = def.data_type else {
            continue;
        };
        let actual = descriptor.data_type();
        let compatible =
            declared == actual || (declared == DataType::Double && actual == DataType::Integer);
        if !compatible {
            return Err(OrmError::type_mismatch(def.column, actual, declared));
        }
    }
    Ok(())
}

impl<E: Entity> Default for Model<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: self.state,
            schema: self.schema.clone(),
            entries: self.entries.clone(),
            dirty: self.dirty.clone(),
            dispatcher: self.dispatcher.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entity", &E::TYPE_NAME)
            .field("table", &self.config.table())
            .field("state", &self.state)
            .field("entries", &self.entries)
            .field("dirty", &self.dirty)
            .finish()
    }
}
