use super::*;
use crate::value::Value;
use serde_json::json;

fn users_raw() -> Vec<RawColumn> {
    vec![
        RawColumn::new("id", "int(11)")
            .not_null()
            .key("PRI")
            .extra("auto_increment"),
        RawColumn::new("email", "varchar(255)").not_null().extra("unique"),
        RawColumn::new("score", "decimal(10,2)").default_expr("0.00"),
        RawColumn::new("active", "boolean").not_null().default_expr("true"),
        RawColumn::new("tags", "json"),
        RawColumn::new("created_at", "timestamp").default_expr("CURRENT_TIMESTAMP"),
        RawColumn::new("nickname", "varchar(64)").default_expr("NULL"),
        RawColumn::new("mood", "enum('happy','sad')").not_null(),
        RawColumn::new("geom", "geometry"),
    ]
}

#[test]
fn one_descriptor_per_raw_column_in_order() {
    let raw = users_raw();
    let schema = build_schema(&raw);
    assert_eq!(schema.len(), raw.len());
    let names: Vec<_> = schema.iter().map(SchemaDescriptor::column).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "email",
            "score",
            "active",
            "tags",
            "created_at",
            "nickname",
            "mood",
            "geom"
        ]
    );
}

#[test]
fn native_types_map_to_generic_kinds() {
    let cases = [
        ("int(11)", DataType::Integer),
        ("BIGINT UNSIGNED", DataType::Integer),
        ("smallint", DataType::Integer),
        ("decimal(10,2)", DataType::Double),
        ("double precision", DataType::Double),
        ("float", DataType::Double),
        ("json", DataType::Array),
        ("jsonb", DataType::Array),
        ("boolean", DataType::Boolean),
        ("varchar(255)", DataType::String),
        ("character varying", DataType::String),
        ("timestamp without time zone", DataType::String),
        ("datetime", DataType::String),
        ("blob", DataType::String),
        ("enum('a','b')", DataType::String),
        ("geometry", DataType::String),
        ("", DataType::String),
    ];
    for (native, expected) in cases {
        assert_eq!(classify_native_type(native), expected, "native type {native:?}");
    }
}

#[test]
fn defaults_map_null_and_current_timestamp() {
    let schema = build_schema(&users_raw());
    let by_name = |name: &str| schema.iter().find(|d| d.column() == name).unwrap();

    assert_eq!(by_name("id").default_value(), &DefaultValue::Unset);
    assert_eq!(by_name("nickname").default_value(), &DefaultValue::Unset);
    assert_eq!(
        by_name("created_at").default_value(),
        &DefaultValue::CurrentTimestamp
    );
    assert_eq!(
        by_name("score").default_value(),
        &DefaultValue::Literal(json!("0.00"))
    );
}

#[test]
fn flags_follow_raw_metadata() {
    let schema = build_schema(&users_raw());
    let id = &schema[0];
    assert!(id.is_auto_increment());
    assert!(!id.is_nullable());
    assert!(!id.is_unique());

    let email = &schema[1];
    assert!(email.is_unique());
    assert!(!email.is_auto_increment());

    assert!(schema[2].is_nullable());

    let mut raw = RawColumn::new("x", "int");
    raw.null = "Yes".to_string();
    assert!(build_schema(&[raw])[0].is_nullable());
}

#[test]
fn required_columns_have_no_default_and_reject_null() {
    assert_eq!(required_columns(&users_raw()), vec!["email", "mood"]);

    let table = TableSchema::new("users", build_schema(&users_raw())).unwrap();
    assert_eq!(table.required_columns(), vec!["email", "mood"]);
}

#[test]
fn with_transforms_return_new_descriptors() {
    let base = SchemaDescriptor::new("age", DataType::Integer);
    let changed = base.with_nullable(false).with_unique(true);

    assert!(base.is_nullable());
    assert!(!base.is_unique());
    assert!(!changed.is_nullable());
    assert!(changed.is_unique());
    assert_eq!(changed.column(), "age");
    assert_eq!(base.with_column("years").column(), "years");
}

#[test]
fn to_map_is_flat_and_ordered() {
    let descriptor = SchemaDescriptor::new("created_at", DataType::String)
        .with_default_value(DefaultValue::CurrentTimestamp)
        .with_nullable(false);
    let map = descriptor.to_map();

    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "column",
            "data_type",
            "default",
            "nullable",
            "auto_increment",
            "unique"
        ]
    );
    assert_eq!(map["data_type"], json!("string"));
    assert_eq!(map["default"], json!("CURRENT_TIMESTAMP"));
    assert_eq!(map["nullable"], json!(false));
}

#[test]
fn table_schema_rejects_duplicate_and_empty_columns() {
    let dup = vec![
        SchemaDescriptor::new("a", DataType::String),
        SchemaDescriptor::new("a", DataType::Integer),
    ];
    assert!(TableSchema::new("t", dup).unwrap_err().is_precondition());

    let empty = vec![SchemaDescriptor::new("", DataType::String)];
    assert!(TableSchema::new("t", empty).is_err());
}

#[test]
fn table_defaults_seed_literals_and_nulls() {
    let table = TableSchema::new("users", build_schema(&users_raw())).unwrap();
    let defaults = table.defaults();
    assert_eq!(defaults["id"], Value::Null);
    assert_eq!(defaults["active"], json!(true));
    assert_eq!(defaults["score"], json!(0.0));
    assert_eq!(defaults["created_at"], Value::Null);
    assert_eq!(table.primary_key_type("id"), Some(DataType::Integer));
    assert_eq!(table.primary_key_type("missing"), None);
}

#[test]
fn data_type_accepts_matching_kinds() {
    assert!(DataType::Integer.accepts(&json!(3)));
    assert!(!DataType::Integer.accepts(&json!(3.5)));
    assert!(!DataType::Integer.accepts(&json!("3")));
    assert!(DataType::Double.accepts(&json!(3)));
    assert!(DataType::Array.accepts(&json!({"a": 1})));
    assert!(DataType::Boolean.accepts(&Value::Null));
    assert!(!DataType::String.accepts(&json!(true)));
}

#[test]
fn default_entries_unwrap_postgres_casts() {
    let status = SchemaDescriptor::new("status", DataType::String)
        .with_default_value(DefaultValue::Literal(json!("'draft'::character varying")));
    assert_eq!(status.default_entry(), json!("draft"));

    let count = SchemaDescriptor::new("count", DataType::Integer)
        .with_default_value(DefaultValue::Literal(json!("0")));
    assert_eq!(count.default_entry(), json!(0));

    let meta = SchemaDescriptor::new("meta", DataType::Array)
        .with_default_value(DefaultValue::Literal(json!("'{}'::jsonb")));
    assert_eq!(meta.default_entry(), json!({}));
}

#[test]
fn cast_null_defaults_are_unset() {
    let raw = vec![
        RawColumn::new("nickname", "character varying")
            .default_expr("NULL::character varying"),
        RawColumn::new("parent_id", "integer").default_expr("NULL::integer"),
        RawColumn::new("label", "text").default_expr("'NULL'::text"),
    ];
    let schema = build_schema(&raw);

    assert_eq!(schema[0].default_value(), &DefaultValue::Unset);
    assert!(schema[0].default_entry().is_null());
    assert_eq!(schema[1].default_value(), &DefaultValue::Unset);
    assert!(schema[1].default_entry().is_null());
    assert_eq!(
        schema[2].default_value(),
        &DefaultValue::Literal(json!("'NULL'::text"))
    );
}
