use super::*;
use serde_json::json;

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn select_renders_columns_conditions_and_paging() {
    let stmt = select("users")
        .columns(["id", "name"])
        .where_(Condition::eq("status", "active").unwrap())
        .order_by("id", true)
        .limit(10)
        .offset(20)
        .build()
        .unwrap();

    assert_eq!(
        stmt.sql(),
        "SELECT id, name FROM users WHERE status = $1 ORDER BY id DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(stmt.params(), &[json!("active")]);
}

#[test]
fn select_without_columns_uses_star() {
    let stmt = select("users").build().unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM users");

    let stmt = select("users").count().build().unwrap();
    assert_eq!(stmt.sql(), "SELECT COUNT(*) FROM users");
}

#[test]
fn insert_takes_columns_from_data() {
    let data = row(&[("name", json!("alice")), ("age", json!(30))]);
    let stmt = insert("users").data(&data).returning("id").build().unwrap();

    assert_eq!(
        stmt.sql(),
        "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id"
    );
    assert_eq!(
        stmt.param_map(),
        vec![
            ("$1".to_string(), json!("alice")),
            ("$2".to_string(), json!(30))
        ]
    );
}

#[test]
fn insert_without_data_uses_default_values() {
    let stmt = insert("users").build().unwrap();
    assert_eq!(stmt.sql(), "INSERT INTO users DEFAULT VALUES");
}

#[test]
fn insert_rejects_mismatched_columns_and_values() {
    let err = insert("users")
        .columns(["a", "b"])
        .values([json!(1)])
        .build()
        .unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn update_numbers_condition_after_assignments() {
    let data = row(&[("name", json!("bob"))]);
    let stmt = update("users")
        .data(&data)
        .where_(Condition::eq("id", 7).unwrap())
        .build()
        .unwrap();

    assert_eq!(stmt.sql(), "UPDATE users SET name = $1 WHERE id = $2");
    assert_eq!(stmt.params(), &[json!("bob"), json!(7)]);
}

#[test]
fn update_and_delete_require_where() {
    assert!(update("users").set("a", 1).build().unwrap_err().is_precondition());
    assert!(delete("users").build().unwrap_err().is_precondition());
    assert!(
        update("users")
            .where_(Condition::eq("id", 1).unwrap())
            .build()
            .unwrap_err()
            .is_precondition()
    );
}

#[test]
fn invalid_identifiers_surface_at_build() {
    let err = select("users").columns(["ok", "bad name"]).build().unwrap_err();
    assert!(err.to_string().contains("bad name"));
}

#[test]
fn truncate_validates_table() {
    assert_eq!(truncate("users").unwrap().sql(), "TRUNCATE TABLE users");
    assert!(truncate("users; --").is_err());
}
