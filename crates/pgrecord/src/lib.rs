//! # pgrecord
//!
//! A schema-aware active-record layer for PostgreSQL.
//!
//! ## Features
//!
//! - **Introspected schemas**: column metadata becomes typed [`SchemaDescriptor`]s, built
//!   lazily and cached per instance
//! - **Checked entries**: every `set` is checked against the column's [`DataType`]
//! - **Dirty tracking**: instances produced by a read record what changed; only they can be
//!   updated
//! - **Payload rules**: declarative per-field transformations ([`Rules`]) applied by a pure
//!   [`Optimizer`] pass over validated [`Payload`]s
//! - **Lifecycle events**: cancellable `saving`/`updating`/`deleting` events around writes
//! - **Transactional batches**: multi-row inserts and updates are all-or-nothing
//! - **Safe defaults**: DELETE requires WHERE, UPDATE requires SET
//!
//! ## Example
//!
//! ```ignore
//! use pgrecord::{Condition, Entity, Model, Rules, Payload};
//!
//! #[derive(Entity, serde::Serialize, serde::Deserialize)]
//! #[record(table = "users")]
//! struct User {
//!     id: Option<i64>,
//!     email: String,
//!     name: String,
//! }
//!
//! let pool = pgrecord::create_pool(&database_url)?;
//! let conn = pool.get().await?;
//!
//! // INSERT
//! let mut user = Model::<User>::new();
//! user.set_field(&conn, User::EMAIL, "ann@example.com".to_string()).await?;
//! user.set_field(&conn, User::NAME, "Ann".to_string()).await?;
//! user.save(&conn).await?;
//!
//! // SELECT + UPDATE
//! let users = Model::<User>::new();
//! if let Some(mut ann) = users.find(&conn, 1).await? {
//!     ann.set(&conn, "name", "Annie".into()).await?;
//!     ann.update(&conn).await?;
//! }
//!
//! // Batch insert, cleaned by rules, in one transaction
//! let rules = Rules::new().trim("name").lowercase("email");
//! let payload = Payload::from_value(serde_json::json!([
//!     {"email": "A@B.C", "name": " a "},
//!     {"email": "D@E.F", "name": " d "},
//! ]))?;
//! Model::<User>::new().insert_many(&conn, payload, Some(&rules)).await?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod ident;
pub mod model;
pub mod naming;
pub mod row;
pub mod rules;
pub mod schema;
pub mod shape;
pub mod statement;
pub mod value;

pub use client::Executor;
pub use condition::Condition;
pub use config::RecordConfig;
pub use entity::{Entity, Field, FieldDef, FromEntries, IntoEntries, Table};
pub use error::{OrmError, OrmResult};
pub use event::{
    CompositeDispatcher, EventDispatcher, EventName, HookAction, ModelEvent, NoopDispatcher,
    TracingDispatcher,
};
pub use model::{Execution, Model, ModelState, Records};
pub use naming::default_table_name;
pub use rules::{Optimizer, Rule, Rules};
pub use schema::{
    DataType, DefaultValue, RawColumn, SchemaDescriptor, TableSchema, build_schema,
    describe_table, load_table_schema,
};
pub use shape::{Payload, ShapeError, ShapeErrors};
pub use statement::Statement;
pub use value::{Row, Value, ValueKind};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgrecord_derive::Entity;
