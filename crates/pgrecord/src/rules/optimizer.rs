use super::{Rule, Rules};
use crate::shape::{Payload, ShapeErrors};
use crate::value::{Row, Value, value_to_text};
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Applies [`Rules`] to payload rows.
///
/// The pass is pure: input rows are never modified, and the output has the same row count and
/// row order as the input. Fields without a rule pass through unchanged. A rule whose
/// precondition does not hold (say, `decode_json` on text that is not JSON) leaves the value as
/// it was.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer;

impl Optimizer {
    /// Transform every row of an already validated payload.
    pub fn apply(payload: &Payload, rules: &Rules) -> Payload {
        match payload {
            Payload::Single(row) => Payload::Single(Self::apply_row(row, rules)),
            Payload::Multi(rows) => {
                Payload::Multi(rows.iter().map(|row| Self::apply_row(row, rules)).collect())
            }
        }
    }

    /// Validate a raw value as a payload, then transform it.
    pub fn optimize(value: Value, rules: &Rules) -> Result<Payload, ShapeErrors> {
        let payload = Payload::from_value(value)?;
        Ok(Self::apply(&payload, rules))
    }

    /// Transform one row.
    ///
    /// Each ruled field yields `(key, value, removed)`; `{key: value}` is merged into the row
    /// and `removed` (set only by renames) is deleted afterwards.
    pub fn apply_row(row: &Row, rules: &Rules) -> Row {
        if rules.is_empty() {
            return row.clone();
        }

        let mut out = row.clone();
        for (field, value) in row {
            let Some(rule) = rules.get(field) else {
                continue;
            };
            let (key, value, removed) = apply_rule(field, value, rule);
            out.insert(key, value);
            if let Some(removed) = removed {
                out.shift_remove(&removed);
            }
        }
        out
    }
}

/// Apply one rule to one field, returning the key to write, the value to write under it, and
/// the key to remove, if any.
pub fn apply_rule(field: &str, value: &Value, rule: &Rule) -> (String, Value, Option<String>) {
    let value = match rule {
        Rule::RenameKey { to } => {
            let removed = (to != field).then(|| field.to_string());
            return (to.clone(), value.clone(), removed);
        }
        Rule::DecodeJson => decode_json(value),
        Rule::CoerceInteger => coerce_integer(value),
        Rule::CoerceDouble => coerce_double(value),
        Rule::CoerceString => Value::String(value_to_text(value)),
        Rule::CoerceBoolean => coerce_boolean(value),
        Rule::Trim => map_str(value, |s| s.trim().to_string()),
        Rule::Lowercase => map_str(value, str::to_lowercase),
        Rule::Uppercase => map_str(value, str::to_uppercase),
        Rule::Slugify { delimiter } => Value::String(slugify(&value_to_text(value), delimiter)),
        Rule::CommaJoinList => comma_join(value),
        Rule::ReformatDate { from, to } => reformat_date(value, from, to),
        Rule::StripMarkup { allowed } => map_str(value, |s| strip_markup(s, allowed)),
        Rule::ReplaceWithConstant { value } => value.clone(),
        Rule::ReplaceIfEquals { default, new } => {
            if value == default {
                new.clone()
            } else {
                value.clone()
            }
        }
        Rule::SubstringReplace { search, replace } => {
            if search.is_empty() {
                value.clone()
            } else {
                map_str(value, |s| s.replace(search.as_str(), replace))
            }
        }
    };
    (field.to_string(), value, None)
}

fn map_str(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

fn decode_json(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn coerce_integer(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    parsed.map_or_else(|| value.clone(), Value::from)
}

fn coerce_double(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    parsed.map_or_else(|| value.clone(), Value::from)
}

fn coerce_boolean(value: &Value) -> Value {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
            "false" | "f" | "0" | "no" | "n" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.map_or_else(|| value.clone(), Value::Bool)
}

/// Lower-case, keep only alphanumerics and whitespace, and join the words with `delimiter`.
pub fn slugify(text: &str, delimiter: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(delimiter)
}

fn comma_join(value: &Value) -> Value {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            _ => return value.clone(),
        },
        _ => return value.clone(),
    };
    let joined: Vec<String> = items.iter().map(value_to_text).collect();
    Value::String(joined.join(","))
}

fn reformat_date(value: &Value, from: &str, to: &str) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };

    // Rendering into a String can fail when `to` asks for fields the parsed value lacks.
    let mut out = String::new();
    let rendered = if let Ok(dt) = NaiveDateTime::parse_from_str(text, from) {
        write!(out, "{}", dt.format(to))
    } else if let Ok(date) = NaiveDate::parse_from_str(text, from) {
        write!(out, "{}", date.format(to))
    } else {
        return value.clone();
    };

    match rendered {
        Ok(()) => Value::String(out),
        Err(_) => value.clone(),
    }
}

fn markup_regex() -> &'static Regex {
    static MARKUP_RE: OnceLock<Regex> = OnceLock::new();
    MARKUP_RE.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?-->|</?\s*([A-Za-z][A-Za-z0-9-]*)[^>]*>")
            .expect("invalid built-in markup regex")
    })
}

/// Remove tags whose (case-insensitive) name is not in `allowed`. Comments always go.
pub fn strip_markup(text: &str, allowed: &[String]) -> String {
    markup_regex()
        .replace_all(text, |caps: &Captures<'_>| match caps.get(1) {
            Some(name) if allowed.iter().any(|a| a.eq_ignore_ascii_case(name.as_str())) => {
                caps[0].to_string()
            }
            _ => String::new(),
        })
        .into_owned()
}
