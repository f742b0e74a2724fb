//! Statement construction.
//!
//! Builders turn a table name plus columns, values and [`Condition`]s into a [`Statement`]:
//! SQL text with `$1, $2, ...` placeholders and the ordered values to bind. A statement is built
//! once per logical operation and handed back to the caller with the operation's result, so the
//! last executed SQL is always available without any shared state.
//!
//! Identifier errors are deferred: the first invalid name is reported by `build()`.
//!
//! Safe defaults: UPDATE requires SET and WHERE, DELETE requires WHERE. Use [`truncate`] to
//! empty a table.
//!
//! ```ignore
//! use pgrecord::statement::{select, update};
//!
//! let stmt = select("users")
//!     .columns(["id", "name"])
//!     .where_(Condition::eq("status", "active")?)
//!     .limit(10)
//!     .build()?;
//! assert_eq!(stmt.sql(), "SELECT id, name FROM users WHERE status = $1 LIMIT 10");
//! ```

use crate::condition::Condition;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::value::{Row, SqlParam, Value};
use std::fmt;

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    /// A statement with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Parameters keyed by placeholder (`$1`, `$2`, ...), in binding order.
    pub fn param_map(&self) -> Vec<(String, Value)> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("${}", i + 1), v.clone()))
            .collect()
    }

    /// Parameters wrapped for `tokio-postgres`.
    pub fn sql_params(&self) -> Vec<SqlParam> {
        self.params.iter().cloned().map(SqlParam).collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Collects the first identifier error seen while chaining.
#[derive(Debug, Clone, Default)]
struct Idents {
    error: Option<String>,
}

impl Idents {
    fn parse(&mut self, name: &str) -> Option<Ident> {
        match Ident::parse(name) {
            Ok(ident) => Some(ident),
            Err(e) => {
                self.error.get_or_insert_with(|| e.to_string());
                None
            }
        }
    }

    fn check(&self) -> OrmResult<()> {
        match &self.error {
            Some(msg) => Err(OrmError::precondition(msg.clone())),
            None => Ok(()),
        }
    }
}

fn render_where(sql: &mut String, params: &mut Vec<Value>, condition: Option<&Condition>) {
    if let Some(condition) = condition {
        sql.push_str(" WHERE ");
        condition.render(sql, params);
    }
}

fn push_placeholder(sql: &mut String, params: &mut Vec<Value>, value: Value) {
    params.push(value);
    sql.push('$');
    sql.push_str(&params.len().to_string());
}

fn join_idents(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(Ident::to_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── SELECT ──

/// Start a SELECT against `table`.
pub fn select(table: &str) -> Select {
    Select::new(table)
}

/// SELECT builder.
#[derive(Debug, Clone)]
pub struct Select {
    idents: Idents,
    table: Option<Ident>,
    columns: Vec<Ident>,
    count: bool,
    condition: Option<Condition>,
    order_by: Vec<(Ident, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    pub fn new(table: &str) -> Self {
        let mut idents = Idents::default();
        let table = idents.parse(table);
        Self {
            idents,
            table,
            columns: Vec::new(),
            count: false,
            condition: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Columns to select; none means `*`.
    pub fn columns<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        for column in columns {
            if let Some(ident) = self.idents.parse(column.as_ref()) {
                self.columns.push(ident);
            }
        }
        self
    }

    /// Select `COUNT(*)` instead of columns.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Add a condition; repeated calls are combined with AND.
    pub fn where_(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        if let Some(ident) = self.idents.parse(column) {
            self.order_by.push((ident, descending));
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(&self) -> OrmResult<Statement> {
        self.idents.check()?;
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::precondition("SELECT requires a table"))?;

        let mut sql = String::from("SELECT ");
        if self.count {
            sql.push_str("COUNT(*)");
        } else if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&join_idents(&self.columns));
        }
        sql.push_str(" FROM ");
        sql.push_str(&table.to_sql());

        let mut params = Vec::new();
        render_where(&mut sql, &mut params, self.condition.as_ref());

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(column, desc)| {
                    format!("{} {}", column.to_sql(), if *desc { "DESC" } else { "ASC" })
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(Statement { sql, params })
    }
}

// ── INSERT ──

/// Start an INSERT into `table`.
pub fn insert(table: &str) -> Insert {
    Insert::new(table)
}

/// INSERT builder.
#[derive(Debug, Clone)]
pub struct Insert {
    idents: Idents,
    table: Option<Ident>,
    columns: Vec<Ident>,
    values: Vec<Value>,
    returning: Vec<Ident>,
}

impl Insert {
    pub fn new(table: &str) -> Self {
        let mut idents = Idents::default();
        let table = idents.parse(table);
        Self {
            idents,
            table,
            columns: Vec::new(),
            values: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        for column in columns {
            if let Some(ident) = self.idents.parse(column.as_ref()) {
                self.columns.push(ident);
            }
        }
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values.extend(values);
        self
    }

    /// Columns and values from one row.
    pub fn data(self, row: &Row) -> Self {
        self.columns(row.keys()).values(row.values().cloned())
    }

    pub fn returning(mut self, column: &str) -> Self {
        if let Some(ident) = self.idents.parse(column) {
            self.returning.push(ident);
        }
        self
    }

    pub fn build(&self) -> OrmResult<Statement> {
        self.idents.check()?;
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::precondition("INSERT requires a table"))?;
        if self.columns.len() != self.values.len() {
            return Err(OrmError::precondition(format!(
                "INSERT has {} columns but {} values",
                self.columns.len(),
                self.values.len()
            )));
        }

        let mut sql = format!("INSERT INTO {}", table.to_sql());
        let mut params = Vec::with_capacity(self.values.len());
        if self.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(" (");
            sql.push_str(&join_idents(&self.columns));
            sql.push_str(") VALUES (");
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                push_placeholder(&mut sql, &mut params, value.clone());
            }
            sql.push(')');
        }
        if !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&join_idents(&self.returning));
        }

        Ok(Statement { sql, params })
    }
}

// ── UPDATE ──

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> Update {
    Update::new(table)
}

/// UPDATE builder.
#[derive(Debug, Clone)]
pub struct Update {
    idents: Idents,
    table: Option<Ident>,
    assignments: Vec<(Ident, Value)>,
    condition: Option<Condition>,
}

impl Update {
    pub fn new(table: &str) -> Self {
        let mut idents = Idents::default();
        let table = idents.parse(table);
        Self {
            idents,
            table,
            assignments: Vec::new(),
            condition: None,
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        if let Some(ident) = self.idents.parse(column) {
            self.assignments.push((ident, value.into()));
        }
        self
    }

    /// One assignment per entry of `row`.
    pub fn data(mut self, row: &Row) -> Self {
        for (column, value) in row {
            self = self.set(column, value.clone());
        }
        self
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn build(&self) -> OrmResult<Statement> {
        self.idents.check()?;
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::precondition("UPDATE requires a table"))?;
        if self.assignments.is_empty() {
            return Err(OrmError::precondition("UPDATE requires at least one SET"));
        }
        let condition = self
            .condition
            .as_ref()
            .ok_or_else(|| OrmError::precondition("UPDATE requires a WHERE condition"))?;

        let mut sql = format!("UPDATE {} SET ", table.to_sql());
        let mut params = Vec::with_capacity(self.assignments.len() + 1);
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&column.to_sql());
            sql.push_str(" = ");
            push_placeholder(&mut sql, &mut params, value.clone());
        }
        render_where(&mut sql, &mut params, Some(condition));

        Ok(Statement { sql, params })
    }
}

// ── DELETE / TRUNCATE ──

/// Start a DELETE from `table`.
pub fn delete(table: &str) -> Delete {
    Delete::new(table)
}

/// DELETE builder.
#[derive(Debug, Clone)]
pub struct Delete {
    idents: Idents,
    table: Option<Ident>,
    condition: Option<Condition>,
}

impl Delete {
    pub fn new(table: &str) -> Self {
        let mut idents = Idents::default();
        let table = idents.parse(table);
        Self {
            idents,
            table,
            condition: None,
        }
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn build(&self) -> OrmResult<Statement> {
        self.idents.check()?;
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::precondition("DELETE requires a table"))?;
        let condition = self
            .condition
            .as_ref()
            .ok_or_else(|| OrmError::precondition("DELETE requires a WHERE condition"))?;

        let mut sql = format!("DELETE FROM {}", table.to_sql());
        let mut params = Vec::new();
        render_where(&mut sql, &mut params, Some(condition));
        Ok(Statement { sql, params })
    }
}

/// `TRUNCATE TABLE <table>`
pub fn truncate(table: &str) -> OrmResult<Statement> {
    let table = Ident::parse(table)?;
    Ok(Statement::raw(format!("TRUNCATE TABLE {}", table.to_sql())))
}

#[cfg(test)]
mod tests;
