#![allow(dead_code)]

use pgrecord::{Executor, OrmError, OrmResult, Row, Value};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-memory executor: answers "describe columns" from a fixed column list, hands out
/// scripted rows for other queries, and records every statement it sees.
pub struct MockConn {
    describe: Vec<Row>,
    results: Mutex<VecDeque<Vec<Row>>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
    writes: Mutex<usize>,
    fail_write: Option<usize>,
    next_id: Mutex<i64>,
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn column(field: &str, ty: &str, nullable: &str, key: &str, default: Value, extra: &str) -> Row {
    row(json!({
        "Field": field,
        "Type": ty,
        "Null": nullable,
        "Key": key,
        "Default": default,
        "Extra": extra,
    }))
}

impl MockConn {
    pub fn new(describe: Vec<Row>) -> Self {
        Self {
            describe,
            results: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
            writes: Mutex::new(0),
            fail_write: None,
            next_id: Mutex::new(1),
        }
    }

    /// The `users` table most tests run against.
    pub fn users() -> Self {
        Self::new(vec![
            column("id", "bigint", "NO", "PRI", Value::Null, "auto_increment"),
            column("email", "character varying", "NO", "", Value::Null, "unique"),
            column("name", "text", "YES", "", Value::Null, ""),
            column(
                "status",
                "character varying",
                "NO",
                "",
                json!("'active'::character varying"),
                "",
            ),
            column("score", "double precision", "YES", "", json!("0"), ""),
            column("created_at", "timestamp without time zone", "YES", "", Value::Null, ""),
            column("updated_at", "timestamp without time zone", "YES", "", Value::Null, ""),
        ])
    }

    /// Fail the n-th (1-based) INSERT/UPDATE/DELETE.
    pub fn fail_write(mut self, n: usize) -> Self {
        self.fail_write = Some(n);
        self
    }

    /// Rows for the next non-describe query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    /// Every statement except "describe columns", in order.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(sql, _)| !is_describe(sql))
            .cloned()
            .collect()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn describe_count(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(sql, _)| is_describe(sql))
            .count()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }

    fn count_write(&self, sql: &str) -> OrmResult<()> {
        if !is_write(sql) {
            return Ok(());
        }
        let mut writes = self.writes.lock().unwrap();
        *writes += 1;
        if self.fail_write == Some(*writes) {
            return Err(OrmError::Connection(format!("write {} failed", *writes)));
        }
        Ok(())
    }
}

fn is_describe(sql: &str) -> bool {
    sql.contains("information_schema.columns")
}

fn is_write(sql: &str) -> bool {
    ["INSERT", "UPDATE", "DELETE"]
        .iter()
        .any(|verb| sql.starts_with(verb))
}

impl Executor for MockConn {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.record(sql, params);
        if is_describe(sql) {
            return Ok(self.describe.clone());
        }
        self.count_write(sql)?;
        if sql.starts_with("INSERT") && sql.contains("RETURNING id") {
            let mut next = self.next_id.lock().unwrap();
            let id = *next;
            *next += 1;
            return Ok(vec![row(json!({ "id": id }))]);
        }
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.record(sql, params);
        self.count_write(sql)?;
        Ok(if is_write(sql) { 1 } else { 0 })
    }
}
