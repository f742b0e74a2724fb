use super::Model;
use crate::entity::Entity;
use crate::statement::Statement;
use crate::value::Value;

/// What one write operation did.
///
/// Every write returns one of these instead of leaving the last statement in shared state.
/// A write cancelled by a "before" event carries the statement it would have run, with
/// `applied() == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    statement: Statement,
    applied: bool,
    affected: u64,
    aborted: Option<String>,
}

impl Execution {
    pub(crate) fn done(statement: Statement, affected: u64) -> Self {
        Self {
            statement,
            applied: true,
            affected,
            aborted: None,
        }
    }

    pub(crate) fn cancelled(statement: Statement, reason: String) -> Self {
        Self {
            statement,
            applied: false,
            affected: 0,
            aborted: Some(reason),
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn params(&self) -> &[Value] {
        self.statement.params()
    }

    /// Whether the statement was executed.
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Rows reported by storage.
    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// The handler's reason, when a "before" event cancelled the write.
    pub fn abort_reason(&self) -> Option<&str> {
        self.aborted.as_deref()
    }
}

/// Loaded instances from one read, plus the statement that produced them.
pub struct Records<E: Entity> {
    records: Vec<Model<E>>,
    statement: Statement,
}

impl<E: Entity> Records<E> {
    pub(crate) fn new(records: Vec<Model<E>>, statement: Statement) -> Self {
        Self { records, statement }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn records(&self) -> &[Model<E>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Model<E>> {
        self.records
    }

    pub fn first(&self) -> Option<&Model<E>> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model<E>> {
        self.records.iter()
    }
}

impl<E: Entity> IntoIterator for Records<E> {
    type Item = Model<E>;
    type IntoIter = std::vec::IntoIter<Model<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, E: Entity> IntoIterator for &'a Records<E> {
    type Item = &'a Model<E>;
    type IntoIter = std::slice::Iter<'a, Model<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<E: Entity> std::fmt::Debug for Records<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("records", &self.records)
            .field("statement", &self.statement)
            .finish()
    }
}
