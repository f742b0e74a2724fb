//! Default table names.

use heck::ToSnakeCase;

/// Snake-case a type name and pluralize its last word: `UserProfile` -> `user_profiles`.
///
/// Any module path prefix (`app::models::User`) is ignored.
pub fn default_table_name(type_name: &str) -> String {
    let base = type_name.rsplit("::").next().unwrap_or(type_name);
    let snake = base.to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&snake),
    }
}

/// English plural of a single lower-case word, by suffix.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }

    format!("{word}s")
}
