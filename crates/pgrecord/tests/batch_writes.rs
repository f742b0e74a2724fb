mod common;

use common::MockConn;
use pgrecord::{Entity, Model, OrmError, OrmResult, Payload, Rules};
use serde_json::json;

#[derive(Entity)]
#[record(table = "users", no_created_at)]
struct Member {
    id: Option<i64>,
    email: String,
    name: Option<String>,
}

fn three_members() -> Payload {
    Payload::from_value(json!([
        {"email": "A@Example.com", "name": "  Ann "},
        {"email": "B@Example.com", "name": "Bob"},
        {"email": "C@Example.com", "name": "Cy"},
    ]))
    .expect("valid payload")
}

#[tokio::test]
async fn insert_many_runs_in_one_transaction() -> OrmResult<()> {
    let conn = MockConn::users();
    let rules = Rules::new().lowercase("email").trim("name");

    let results = Model::<Member>::new()
        .insert_many(&conn, three_members(), Some(&rules))
        .await?;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_applied()));
    assert_eq!(
        results[0].sql(),
        "INSERT INTO users (email, name, updated_at) VALUES ($1, $2, $3)"
    );
    assert_eq!(results[0].params()[0], json!("a@example.com"));
    assert_eq!(results[0].params()[1], json!("Ann"));

    let sql = conn.sql();
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(sql.iter().filter(|s| s.starts_with("INSERT")).count(), 3);
    Ok(())
}

#[tokio::test]
async fn insert_many_rolls_back_on_the_first_failure() {
    let conn = MockConn::users().fail_write(2);

    let err = Model::<Member>::new()
        .insert_many(&conn, three_members(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::Storage(_)));
    let sql = conn.sql();
    assert_eq!(sql.iter().filter(|s| s.starts_with("INSERT")).count(), 2);
    assert_eq!(sql.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!sql.iter().any(|s| s == "COMMIT"));
}

#[tokio::test]
async fn insert_many_checks_every_row_before_starting() {
    let conn = MockConn::users();
    let payload = Payload::from_value(json!([
        {"email": "a@example.com"},
        {"name": "no email"},
    ]))
    .expect("valid payload");

    let err = Model::<Member>::new()
        .insert_many(&conn, payload, None)
        .await
        .unwrap_err();

    match err {
        OrmError::Shape(errors) => assert_eq!(errors.items[0].location, "$[1].email"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(conn.sql().is_empty());
}

#[tokio::test]
async fn insert_many_rejects_values_of_the_wrong_type() {
    let conn = MockConn::users();
    let payload = Payload::from_value(json!({"email": 42})).expect("valid payload");

    let err = Model::<Member>::new()
        .insert_many(&conn, payload, None)
        .await
        .unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(conn.sql().is_empty());
}

#[tokio::test]
async fn update_many_keys_each_row_by_primary_key() -> OrmResult<()> {
    let conn = MockConn::users();
    let payload = Payload::from_value(json!([
        {"id": 1, "name": "Ann"},
        {"id": "2", "name": "Bob"},
    ]))
    .expect("valid payload");

    let results = Model::<Member>::new()
        .update_many(&conn, payload, Some(&Rules::new().coerce_integer("id")))
        .await?;

    assert_eq!(
        results[1].sql(),
        "UPDATE users SET name = $1, updated_at = $2 WHERE id = $3"
    );
    assert_eq!(results[1].params()[2], json!(2));

    let missing_key = Payload::from_value(json!([{"name": "Ann"}])).expect("valid payload");
    let err = Model::<Member>::new()
        .update_many(&conn, missing_key, None)
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    Ok(())
}
