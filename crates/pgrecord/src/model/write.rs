use super::{Execution, Model, ModelState};
use crate::client::Executor;
use crate::condition::Condition;
use crate::config::RecordConfig;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::event::{EventName, HookAction};
use crate::rules::{Optimizer, Rules};
use crate::schema::{DataType, TableSchema};
use crate::shape::{self, Payload, ShapeErrors};
use crate::statement::{self, Statement};
use crate::value::{Row, Value, ValueKind, is_integer_like};

/// Writes.
impl<E: Entity> Model<E> {
    /// Insert this instance.
    ///
    /// Stamps the timestamp columns, leaves a null primary key to storage, checks types and
    /// required columns, then fires `Saving` (which may cancel), inserts with
    /// `RETURNING <pk>`, stores the assigned key and fires `Saved`.
    pub async fn save<C: Executor>(&mut self, conn: &C) -> OrmResult<Execution> {
        match self.state {
            ModelState::Loaded => {
                return Err(OrmError::precondition(format!(
                    "{}: instance was produced by a read; use update() instead of save()",
                    self.config.table()
                )));
            }
            ModelState::Persisted | ModelState::Deleted => {
                return Err(OrmError::precondition(format!(
                    "{}: instance was already {}",
                    self.config.table(),
                    if self.state == ModelState::Persisted {
                        "saved"
                    } else {
                        "deleted"
                    }
                )));
            }
            ModelState::Fresh | ModelState::Structured => {}
        }

        let schema = self.structure(conn).await?;
        let now = self.config.now();
        stamp(&self.config, &schema, &mut self.entries, &now, true);

        let pk = self.config.primary_key().to_string();
        let mut payload = self.entries.clone();
        if payload.get(&pk).is_some_and(Value::is_null) {
            payload.shift_remove(&pk);
        }
        // a null column with a storage-side default is left to storage
        payload.retain(|column, value| {
            !(value.is_null()
                && schema
                    .get(column)
                    .is_some_and(|d| !d.default_value().is_unset() || d.is_auto_increment()))
        });
        check_row(&schema, &payload)?;
        Payload::Single(payload.clone()).validate()?;
        shape::check_required(&payload, &schema.required_columns())?;

        let returns_key = schema.contains(&pk);
        let mut insert = statement::insert(self.config.table()).data(&payload);
        if returns_key {
            insert = insert.returning(&pk);
        }
        let stmt = insert.build()?;

        if let HookAction::Abort(reason) = self.fire(EventName::Saving, payload) {
            return Ok(Execution::cancelled(stmt, reason));
        }

        let affected = if returns_key {
            let rows = self.fetch(conn, &stmt).await?;
            if let Some(id) = rows.first().and_then(|row| row.get(&pk)) {
                self.entries.insert(pk, id.clone());
            }
            rows.len() as u64
        } else {
            self.run(conn, &stmt).await?
        };

        self.state = ModelState::Persisted;
        tracing::debug!(target: "pgrecord.model", table = self.config.table(), "saved");
        self.fire(EventName::Saved, self.entries.clone());
        Ok(Execution::done(stmt, affected))
    }

    /// Write the dirty set back, keyed by primary key.
    ///
    /// Only a loaded instance with at least one change can be updated. Afterwards the dirty
    /// set is empty again and the instance stays loaded.
    pub async fn update<C: Executor>(&mut self, conn: &C) -> OrmResult<Execution> {
        if self.state != ModelState::Loaded {
            return Err(OrmError::precondition(format!(
                "{}: call update only after a read produced this instance",
                self.config.table()
            )));
        }
        if self.dirty.is_empty() {
            return Err(OrmError::precondition(format!(
                "{}: nothing to update; no field was set since the read",
                self.config.table()
            )));
        }

        let pk = self.config.primary_key().to_string();
        if self.dirty.contains_key(&pk) {
            return Err(OrmError::precondition(format!(
                "{}: the primary key {pk} cannot be updated",
                self.config.table()
            )));
        }
        let id = self.id().cloned().ok_or_else(|| {
            OrmError::precondition(format!(
                "{}: loaded instance has no {pk} value",
                self.config.table()
            ))
        })?;

        let schema = self.structure(conn).await?;
        if let Some(column) = self.config.updated_at() {
            if schema.contains(column) && !self.dirty.contains_key(column) {
                let now = Value::from(self.config.now());
                self.dirty.insert(column.to_string(), now.clone());
                self.entries.insert(column.to_string(), now);
            }
        }

        let stmt = statement::update(self.config.table())
            .data(&self.dirty)
            .where_(Condition::eq(&pk, id)?)
            .build()?;

        if let HookAction::Abort(reason) = self.fire(EventName::Updating, self.dirty.clone()) {
            return Ok(Execution::cancelled(stmt, reason));
        }

        let affected = self.run(conn, &stmt).await?;
        let changes = std::mem::take(&mut self.dirty);
        tracing::debug!(target: "pgrecord.model", table = self.config.table(), fields = changes.len(), affected, "updated");
        self.fire(EventName::Updated, changes);
        Ok(Execution::done(stmt, affected))
    }

    /// Delete the row whose primary key equals `id`.
    ///
    /// `id` must suit the key's declared type: integer keys take integers or all-digit strings,
    /// string keys take strings. Anything else is a precondition error.
    pub async fn delete_by_id<C: Executor>(
        &mut self,
        conn: &C,
        id: impl Into<Value>,
    ) -> OrmResult<Execution> {
        let schema = self.structure(conn).await?;
        let pk = self.config.primary_key().to_string();
        let key_type = schema.primary_key_type(&pk).ok_or_else(|| {
            OrmError::precondition(format!(
                "{}: primary key column {pk} is not in the table",
                self.config.table()
            ))
        })?;
        let id = normalize_id(&pk, key_type, id.into())?;

        let condition = Condition::eq(&pk, id.clone())?;
        let mut entries = Row::new();
        entries.insert(pk, id);
        self.delete_matching(conn, condition, entries).await
    }

    /// Delete every row matching `condition`.
    pub async fn delete<C: Executor>(
        &self,
        conn: &C,
        condition: Condition,
    ) -> OrmResult<Execution> {
        self.delete_matching(conn, condition, Row::new()).await
    }

    /// Delete this instance's own row.
    pub async fn destroy<C: Executor>(&mut self, conn: &C) -> OrmResult<Execution> {
        if !matches!(self.state, ModelState::Loaded | ModelState::Persisted) {
            return Err(OrmError::precondition(format!(
                "{}: only a read or saved instance can be destroyed",
                self.config.table()
            )));
        }
        let pk = self.config.primary_key();
        let id = self.id().cloned().ok_or_else(|| {
            OrmError::precondition(format!("{}: instance has no {pk} value", self.config.table()))
        })?;

        let condition = Condition::eq(pk, id)?;
        let result = self
            .delete_matching(conn, condition, self.entries.clone())
            .await?;
        if result.is_applied() {
            self.state = ModelState::Deleted;
            self.dirty.clear();
        }
        Ok(result)
    }

    /// Empty the table. No events fire.
    pub async fn truncate<C: Executor>(&self, conn: &C) -> OrmResult<Execution> {
        let stmt = statement::truncate(self.config.table())?;
        let affected = self.run(conn, &stmt).await?;
        tracing::debug!(target: "pgrecord.model", table = self.config.table(), "truncated");
        Ok(Execution::done(stmt, affected))
    }

    /// Insert every row of `payload` in one transaction.
    ///
    /// The payload is shape-checked and, when `rules` is given, optimized first. Every row is
    /// type-checked and checked for required columns before anything runs. The first failing
    /// statement rolls the whole batch back and is reported as a storage error.
    pub async fn insert_many<C: Executor>(
        &mut self,
        conn: &C,
        payload: Payload,
        rules: Option<&Rules>,
    ) -> OrmResult<Vec<Execution>> {
        let rows = prepare_payload(payload, rules)?;
        let schema = self.structure(conn).await?;
        let required = schema.required_columns();
        let now = self.config.now();

        let mut missing = ShapeErrors::default();
        let mut batch = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            stamp(&self.config, &schema, &mut row, &now, true);
            check_row(&schema, &row)?;
            if let Err(errors) = shape::check_required(&row, &required) {
                missing.extend(relocate(errors, i));
                continue;
            }
            let stmt = statement::insert(self.config.table()).data(&row).build()?;
            batch.push((row, stmt));
        }
        missing.into_result()?;

        self.run_batch(conn, EventName::Saving, EventName::Saved, batch)
            .await
    }

    /// Update every row of `payload` by its primary key, in one transaction.
    ///
    /// Each row must carry a non-null primary key and at least one other column.
    pub async fn update_many<C: Executor>(
        &mut self,
        conn: &C,
        payload: Payload,
        rules: Option<&Rules>,
    ) -> OrmResult<Vec<Execution>> {
        let rows = prepare_payload(payload, rules)?;
        let schema = self.structure(conn).await?;
        let pk = self.config.primary_key().to_string();
        let now = self.config.now();

        let mut batch = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            let id = row
                .shift_remove(&pk)
                .filter(|v| !v.is_null())
                .ok_or_else(|| {
                    OrmError::precondition(format!("row {i}: missing primary key {pk}"))
                })?;
            if row.is_empty() {
                return Err(OrmError::precondition(format!(
                    "row {i}: nothing to update besides {pk}"
                )));
            }
            stamp(&self.config, &schema, &mut row, &now, false);
            check_row(&schema, &row)?;

            let stmt = statement::update(self.config.table())
                .data(&row)
                .where_(Condition::eq(&pk, id.clone())?)
                .build()?;
            row.insert(pk.clone(), id);
            batch.push((row, stmt));
        }

        self.run_batch(conn, EventName::Updating, EventName::Updated, batch)
            .await
    }

    async fn delete_matching<C: Executor>(
        &self,
        conn: &C,
        condition: Condition,
        entries: Row,
    ) -> OrmResult<Execution> {
        let stmt = statement::delete(self.config.table())
            .where_(condition)
            .build()?;

        if let HookAction::Abort(reason) = self.fire(EventName::Deleting, entries.clone()) {
            return Ok(Execution::cancelled(stmt, reason));
        }

        let affected = self.run(conn, &stmt).await?;
        tracing::debug!(target: "pgrecord.model", table = self.config.table(), affected, "deleted");
        self.fire(EventName::Deleted, entries);
        Ok(Execution::done(stmt, affected))
    }

    /// Run prepared statements between `begin` and `commit`; roll back on the first failure.
    ///
    /// "After" events fire only once the batch has committed.
    async fn run_batch<C: Executor>(
        &self,
        conn: &C,
        before: EventName,
        after: EventName,
        batch: Vec<(Row, Statement)>,
    ) -> OrmResult<Vec<Execution>> {
        conn.begin().await.map_err(OrmError::into_storage)?;

        let mut results = Vec::with_capacity(batch.len());
        let mut applied = Vec::with_capacity(batch.len());
        for (entries, stmt) in batch {
            if let HookAction::Abort(reason) = self.fire(before, entries.clone()) {
                results.push(Execution::cancelled(stmt, reason));
                continue;
            }
            match self.run(conn, &stmt).await {
                Ok(affected) => {
                    results.push(Execution::done(stmt, affected));
                    applied.push(entries);
                }
                Err(err) => {
                    if let Err(rollback) = conn.rollback().await {
                        tracing::warn!(target: "pgrecord.model", table = self.config.table(), error = %rollback, "rollback failed");
                    }
                    tracing::debug!(target: "pgrecord.model", table = self.config.table(), error = %err, "batch rolled back");
                    return Err(err.into_storage());
                }
            }
        }

        if let Err(err) = conn.commit().await {
            if let Err(rollback) = conn.rollback().await {
                tracing::warn!(target: "pgrecord.model", table = self.config.table(), error = %rollback, "rollback failed");
            }
            return Err(err.into_storage());
        }

        for entries in applied {
            self.fire(after, entries);
        }
        Ok(results)
    }
}

fn prepare_payload(payload: Payload, rules: Option<&Rules>) -> OrmResult<Vec<Row>> {
    payload.validate()?;
    let payload = match rules {
        Some(rules) => Optimizer::apply(&payload, rules),
        None => payload,
    };
    Ok(payload.into_rows())
}

/// Fill the timestamp columns the table has. The creation stamp never overwrites a value.
fn stamp(config: &RecordConfig, schema: &TableSchema, row: &mut Row, now: &str, creating: bool) {
    if creating {
        if let Some(column) = config.created_at() {
            if schema.contains(column) && row.get(column).is_none_or(Value::is_null) {
                row.insert(column.to_string(), Value::from(now));
            }
        }
    }
    if let Some(column) = config.updated_at() {
        if schema.contains(column) {
            row.insert(column.to_string(), Value::from(now));
        }
    }
}

/// Every key must be a column, and every value must suit the column's type.
fn check_row(schema: &TableSchema, row: &Row) -> OrmResult<()> {
    for (column, value) in row {
        let descriptor = schema
            .get(column)
            .ok_or_else(|| OrmError::UnknownField(format!("{}.{column}", schema.table())))?;
        if !descriptor.data_type().accepts(value) {
            return Err(OrmError::type_mismatch(
                column,
                descriptor.data_type(),
                ValueKind::of(value),
            ));
        }
    }
    Ok(())
}

/// Prefix violation locations with the row index: `$.email` -> `$[2].email`.
fn relocate(mut errors: ShapeErrors, row: usize) -> ShapeErrors {
    for error in &mut errors.items {
        let rest = error.location.strip_prefix('$').unwrap_or(&error.location);
        error.location = format!("$[{row}]{rest}");
    }
    errors
}

fn normalize_id(pk: &str, key_type: DataType, id: Value) -> OrmResult<Value> {
    let rejected = |id: &Value| {
        OrmError::precondition(format!(
            "{pk} is a {key_type} key; {} {id} does not fit",
            ValueKind::of(id)
        ))
    };

    match key_type {
        DataType::Integer => {
            if id.is_i64() || id.is_u64() {
                return Ok(id);
            }
            let parsed = is_integer_like(&id)
                .then(|| id.as_str().and_then(|s| s.parse::<i64>().ok()))
                .flatten();
            parsed.map(Value::from).ok_or_else(|| rejected(&id))
        }
        DataType::String if id.is_string() => Ok(id),
        other if !id.is_null() && other != DataType::String && other.accepts(&id) => Ok(id),
        _ => Err(rejected(&id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_keys_accept_digit_strings() {
        assert_eq!(
            normalize_id("id", DataType::Integer, json!("12")).unwrap(),
            json!(12)
        );
        assert_eq!(
            normalize_id("id", DataType::Integer, json!(7)).unwrap(),
            json!(7)
        );
        assert!(
            normalize_id("id", DataType::Integer, json!("abc"))
                .unwrap_err()
                .is_precondition()
        );
        assert!(normalize_id("id", DataType::Integer, json!(1.5)).is_err());
        assert!(normalize_id("id", DataType::Integer, json!("-3")).is_err());
    }

    #[test]
    fn string_keys_accept_any_string() {
        assert_eq!(
            normalize_id("code", DataType::String, json!("abc")).unwrap(),
            json!("abc")
        );
        assert!(normalize_id("code", DataType::String, json!(12)).is_err());
        assert!(normalize_id("code", DataType::String, Value::Null).is_err());
    }

    #[test]
    fn relocate_prefixes_row_index() {
        let row = Row::new();
        let errors = shape::check_required(&row, &["email"]).unwrap_err();
        let errors = relocate(errors, 2);
        assert_eq!(errors.items[0].location, "$[2].email");
    }
}
