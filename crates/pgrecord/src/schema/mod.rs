//! Column metadata: descriptors, per-table schemas and the introspector that builds them.

mod descriptor;
mod introspect;
mod table;

pub use descriptor::{DataType, DefaultValue, SchemaDescriptor};
pub use introspect::{
    RawColumn, build_schema, classify_native_type, describe_table, load_table_schema,
    required_columns,
};
pub use table::TableSchema;

#[cfg(test)]
mod tests;
