use super::*;
use crate::shape::Payload;
use crate::value::Row;
use serde_json::json;

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not a mapping: {other}"),
    }
}

fn apply_one(rules: &Rules, value: Value) -> Row {
    Optimizer::apply_row(&row(value), rules)
}

#[test]
fn slugify_lowercases_and_joins_words() {
    assert_eq!(slugify("Hello World!", "-"), "hello-world");
    assert_eq!(slugify("  Rust & Postgres  2024 ", "_"), "rust_postgres_2024");

    let out = apply_one(&Rules::new().slugify("title", ""), json!({"title": "A B"}));
    assert_eq!(out["title"], json!("a-b"));
}

#[test]
fn coerce_string_is_idempotent() {
    let rules = Rules::new().coerce_string("v");
    let input = json!({"v": 12.5});
    let once = apply_one(&rules, input);
    let twice = Optimizer::apply_row(&once, &rules);
    assert_eq!(once["v"], json!("12.5"));
    assert_eq!(once, twice);
}

#[test]
fn rename_key_moves_value_and_drops_old_key() {
    let out = apply_one(&Rules::new().rename_key("a", "b"), json!({"a": 1}));
    assert_eq!(Value::Object(out), json!({"b": 1}));

    let out = apply_one(&Rules::new().rename_key("a", "a"), json!({"a": 1}));
    assert_eq!(Value::Object(out), json!({"a": 1}));
}

#[test]
fn numeric_coercions_only_touch_numeric_values() {
    let rules = Rules::new().coerce_integer("i").coerce_double("d");
    let out = apply_one(&rules, json!({"i": "42", "d": "2.5", "other": "x"}));
    assert_eq!(out["i"], json!(42));
    assert_eq!(out["d"], json!(2.5));

    let out = apply_one(&rules, json!({"i": 9.9, "d": "abc"}));
    assert_eq!(out["i"], json!(9));
    assert_eq!(out["d"], json!("abc"));
}

#[test]
fn decode_json_and_comma_join() {
    let rules = Rules::new().decode_json("meta").comma_join_list("tags");
    let out = apply_one(
        &rules,
        json!({"meta": "{\"a\": [1, 2]}", "tags": "[\"x\", 2, true]"}),
    );
    assert_eq!(out["meta"], json!({"a": [1, 2]}));
    assert_eq!(out["tags"], json!("x,2,true"));

    let out = apply_one(&rules, json!({"meta": "{broken", "tags": "plain"}));
    assert_eq!(out["meta"], json!("{broken"));
    assert_eq!(out["tags"], json!("plain"));
}

#[test]
fn reformat_date_passes_through_on_parse_failure() {
    let rules = Rules::new().reformat_date("born", "%d/%m/%Y", "%Y-%m-%d");
    assert_eq!(
        apply_one(&rules, json!({"born": "31/12/1999"}))["born"],
        json!("1999-12-31")
    );
    assert_eq!(
        apply_one(&rules, json!({"born": "yesterday"}))["born"],
        json!("yesterday")
    );

    let with_time = Rules::new().reformat_date("at", "%Y-%m-%d %H:%M:%S", "%H:%M");
    assert_eq!(
        apply_one(&with_time, json!({"at": "2024-05-01 08:30:00"}))["at"],
        json!("08:30")
    );
}

#[test]
fn strip_markup_keeps_allowed_tags() {
    let html = "<p>Hi <b>there</b><!-- note --> <script>x()</script></p>";
    assert_eq!(strip_markup(html, &[]), "Hi there x()");
    assert_eq!(strip_markup(html, &["b".to_string()]), "Hi <b>there</b> x()");

    let out = apply_one(&Rules::new().strip_markup("body", ["B"]), json!({"body": html}));
    assert_eq!(out["body"], json!("Hi <b>there</b> x()"));
}

#[test]
fn replacements() {
    let rules = Rules::new()
        .replace_with_constant("secret", "***")
        .replace_if_equals("status", "", "draft")
        .substring_replace("path", "\\", "/");
    let out = apply_one(
        &rules,
        json!({"secret": "hunter2", "status": "", "path": "a\\b\\c"}),
    );
    assert_eq!(out["secret"], json!("***"));
    assert_eq!(out["status"], json!("draft"));
    assert_eq!(out["path"], json!("a/b/c"));

    let out = apply_one(&rules, json!({"status": "live"}));
    assert_eq!(out["status"], json!("live"));
}

#[test]
fn string_case_and_boolean_rules() {
    let rules = Rules::new()
        .trim("name")
        .lowercase("email")
        .uppercase("code")
        .coerce_boolean("active");
    let out = apply_one(
        &rules,
        json!({"name": "  Ann ", "email": "A@B.C", "code": "ab", "active": "Yes"}),
    );
    assert_eq!(out["name"], json!("Ann"));
    assert_eq!(out["email"], json!("a@b.c"));
    assert_eq!(out["code"], json!("AB"));
    assert_eq!(out["active"], json!(true));
}

#[test]
fn reregistering_a_field_overwrites_in_place() {
    let rules = Rules::new()
        .trim("a")
        .lowercase("b")
        .coerce_integer("a");
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.get("a"), Some(&Rule::CoerceInteger));
    let fields: Vec<_> = rules.iter().map(|(f, _)| f).collect();
    assert_eq!(fields, vec!["a", "b"]);
}

#[test]
fn apply_preserves_row_count_and_order() {
    let payload = Payload::from_value(json!([
        {"n": "1", "keep": true},
        {"n": "2"},
        {"other": 3}
    ]))
    .unwrap();
    let out = Optimizer::apply(&payload, &Rules::new().coerce_integer("n"));

    let rows = out.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["n"], json!(1));
    assert_eq!(rows[0]["keep"], json!(true));
    assert_eq!(rows[1]["n"], json!(2));
    assert_eq!(rows[2]["other"], json!(3));

    // input untouched
    assert_eq!(payload.rows()[0]["n"], json!("1"));
}

#[test]
fn optimize_rejects_malformed_payloads() {
    let err = Optimizer::optimize(json!([{"a": 1}, 5]), &Rules::new()).unwrap_err();
    assert_eq!(err.len(), 1);
}

#[test]
fn rules_round_trip_through_serde() {
    let rules = Rules::new().slugify("title", "_").rename_key("a", "b");
    let json = serde_json::to_value(&rules).unwrap();
    assert_eq!(
        json,
        json!([
            ["title", {"rule": "slugify", "delimiter": "_"}],
            ["a", {"rule": "rename_key", "to": "b"}]
        ])
    );
    let back: Rules = serde_json::from_value(json).unwrap();
    assert_eq!(back, rules);
}
