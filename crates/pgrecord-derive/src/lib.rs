//! Derive macros for pgrecord
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod entity;

/// Derive the `Entity` declaration, typed field handles and entry conversions for a struct.
///
/// # Example
///
/// ```ignore
/// use pgrecord::Entity;
///
/// #[derive(Entity)]
/// #[record(table = "users")]
/// struct User {
///     id: Option<i64>,
///     email: String,
///     #[record(column = "display_name")]
///     name: String,
///     #[record(skip)]
///     cached_rank: u32,
/// }
/// ```
///
/// # Generated
///
/// - `impl pgrecord::Entity` with `TYPE_NAME`, `TABLE`, `PRIMARY_KEY`, `CREATED_AT`,
///   `UPDATED_AT` and a `FIELDS` registration table
/// - `pub const NAME: pgrecord::Field<T>` for every field (upper snake case)
/// - `impl pgrecord::FromEntries` and `impl pgrecord::IntoEntries`
///
/// # Attributes
///
/// - `#[record(table = "name")]` - Table name (defaults to the pluralized snake case type name)
/// - `#[record(primary_key = "col")]` - Primary key column (defaults to `id`)
/// - `#[record(created_at = "col")]`, `#[record(updated_at = "col")]` - Timestamp columns
/// - `#[record(no_timestamps)]`, `#[record(no_created_at)]`, `#[record(no_updated_at)]`
/// - `#[record(on_event = "path::to::handler")]` - `fn(&ModelEvent) -> HookAction`
/// - `#[record(column = "name")]` - Map field to a different column name
/// - `#[record(skip)]` - Leave the field out; it is rebuilt with `Default::default()`
#[proc_macro_derive(Entity, attributes(record))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
