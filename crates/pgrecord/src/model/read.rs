use super::{Model, Records};
use crate::client::Executor;
use crate::condition::Condition;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::statement::{Select, Statement, select};
use crate::value::{Row, Value, value_to_text};

/// Reads.
///
/// Each read builds one SELECT, runs it, and turns every returned row into a
/// [`Loaded`](super::ModelState::Loaded) sibling of `self` with an empty dirty set.
impl<E: Entity> Model<E> {
    /// The row whose primary key equals `id`.
    pub async fn find<C: Executor>(
        &self,
        conn: &C,
        id: impl Into<Value>,
    ) -> OrmResult<Option<Model<E>>> {
        self.find_by(conn, self.config.primary_key(), id).await
    }

    /// The first row whose `field` equals `value`.
    pub async fn find_by<C: Executor>(
        &self,
        conn: &C,
        field: &str,
        value: impl Into<Value>,
    ) -> OrmResult<Option<Model<E>>> {
        let stmt = self
            .select()
            .where_(Condition::eq(field, value)?)
            .limit(1)
            .build()?;
        let records = self.load(conn, stmt).await?;
        Ok(records.into_records().into_iter().next())
    }

    /// Rows matching any term: `field ILIKE '%term%'` for each `(field, term)` pair, OR-ed.
    ///
    /// Fails with a precondition error when `terms` is empty.
    pub async fn search<C: Executor>(&self, conn: &C, terms: &Row) -> OrmResult<Records<E>> {
        if terms.is_empty() {
            return Err(OrmError::precondition(format!(
                "{}: search needs at least one term",
                self.config.table()
            )));
        }
        let conditions = terms
            .iter()
            .map(|(field, term)| Condition::ilike(field, format!("%{}%", value_to_text(term))))
            .collect::<OrmResult<Vec<_>>>()?;
        let stmt = self.select().where_(Condition::any(conditions)).build()?;
        self.load(conn, stmt).await
    }

    /// Rows matching `condition`.
    pub async fn where_<C: Executor>(
        &self,
        conn: &C,
        condition: Condition,
    ) -> OrmResult<Records<E>> {
        let stmt = self.select().where_(condition).build()?;
        self.load(conn, stmt).await
    }

    /// Rows with `low <= field <= high`.
    pub async fn between<C: Executor>(
        &self,
        conn: &C,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> OrmResult<Records<E>> {
        let stmt = self
            .select()
            .where_(Condition::between(field, low, high)?)
            .build()?;
        self.load(conn, stmt).await
    }

    /// Every row.
    pub async fn all<C: Executor>(&self, conn: &C) -> OrmResult<Records<E>> {
        let stmt = self.select().build()?;
        self.load(conn, stmt).await
    }

    /// At most `count` rows after skipping `offset`, ordered by primary key.
    pub async fn limit<C: Executor>(
        &self,
        conn: &C,
        offset: u64,
        count: u64,
    ) -> OrmResult<Records<E>> {
        let stmt = self
            .select()
            .order_by(self.config.primary_key(), false)
            .offset(offset)
            .limit(count)
            .build()?;
        self.load(conn, stmt).await
    }

    /// Number of rows matching `condition` (all rows when `None`).
    pub async fn count<C: Executor>(
        &self,
        conn: &C,
        condition: Option<Condition>,
    ) -> OrmResult<u64> {
        let mut query = self.select().count();
        if let Some(condition) = condition {
            query = query.where_(condition);
        }
        let stmt = query.build()?;
        let rows = self.fetch(conn, &stmt).await?;
        let count = rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_u64)
            .ok_or_else(|| OrmError::decode("count", "expected one integer column"))?;
        Ok(count)
    }

    fn select(&self) -> Select {
        select(self.config.table())
    }

    async fn load<C: Executor>(&self, conn: &C, stmt: Statement) -> OrmResult<Records<E>> {
        let rows = self.fetch(conn, &stmt).await?;
        let records = rows.into_iter().map(|row| self.loaded(row)).collect();
        Ok(Records::new(records, stmt))
    }
}
