use super::descriptor::{DataType, SchemaDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::value::Row;

/// Ordered column descriptors for one table, keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    table: String,
    columns: Vec<SchemaDescriptor>,
}

impl TableSchema {
    /// Build a schema, rejecting empty or duplicate column names.
    pub fn new(table: impl Into<String>, columns: Vec<SchemaDescriptor>) -> OrmResult<Self> {
        let table = table.into();
        for (i, descriptor) in columns.iter().enumerate() {
            if descriptor.column().is_empty() {
                return Err(OrmError::precondition(format!(
                    "table {table}: column #{i} has an empty name"
                )));
            }
            if columns[..i].iter().any(|d| d.column() == descriptor.column()) {
                return Err(OrmError::precondition(format!(
                    "table {table}: duplicate column {}",
                    descriptor.column()
                )));
            }
        }
        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get(&self, column: &str) -> Option<&SchemaDescriptor> {
        self.columns.iter().find(|d| d.column() == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Descriptors in column order.
    pub fn columns(&self) -> &[SchemaDescriptor] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(SchemaDescriptor::column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Starting entries for a fresh record: each column's default literal, or `null`.
    pub fn defaults(&self) -> Row {
        self.columns
            .iter()
            .map(|d| (d.column().to_string(), d.default_entry()))
            .collect()
    }

    /// Columns an insert must supply.
    pub fn required_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|d| d.is_required())
            .map(SchemaDescriptor::column)
            .collect()
    }

    /// Declared type of the key column, if the column exists.
    pub fn primary_key_type(&self, primary_key: &str) -> Option<DataType> {
        self.get(primary_key).map(SchemaDescriptor::data_type)
    }
}
