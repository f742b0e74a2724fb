//! Per-field transformation rules.
//!
//! [`Rules`] is an ordered list of `(field, Rule)` pairs; each [`Rule`] variant carries its own
//! configuration. The [`Optimizer`] folds the list over every row of a [`Payload`](crate::Payload)
//! and returns a new payload.
//!
//! ```ignore
//! use pgrecord::rules::{Optimizer, Rules};
//!
//! let rules = Rules::new()
//!     .slugify("title", "-")
//!     .coerce_integer("age")
//!     .rename_key("mail", "email");
//! let cleaned = Optimizer::apply(&payload, &rules);
//! ```

mod optimizer;

pub use optimizer::{Optimizer, apply_rule, slugify, strip_markup};

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Default slug delimiter.
pub const DEFAULT_SLUG_DELIMITER: &str = "-";

/// One field transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Parse a JSON string into its structure.
    DecodeJson,
    /// Numeric values (or numeric strings) to an integer, truncating.
    CoerceInteger,
    /// Numeric values (or numeric strings) to a double.
    CoerceDouble,
    /// Any value to its string form.
    CoerceString,
    /// `true/false`, `1/0`, `yes/no`, `on/off` to a boolean.
    CoerceBoolean,
    Trim,
    Lowercase,
    Uppercase,
    /// Lower-case, drop punctuation, join words with `delimiter`.
    Slugify { delimiter: String },
    /// A JSON array (or a string holding one) joined with commas.
    CommaJoinList,
    /// Re-render a date parsed with the `from` format using the `to` format (chrono syntax).
    ReformatDate { from: String, to: String },
    /// Remove markup tags except those in `allowed`.
    StripMarkup {
        #[serde(default)]
        allowed: Vec<String>,
    },
    ReplaceWithConstant { value: Value },
    /// Replace with `new` only when the value equals `default`.
    ReplaceIfEquals { default: Value, new: Value },
    SubstringReplace { search: String, replace: String },
    /// Move the value under `to` and drop the old key.
    RenameKey { to: String },
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DecodeJson => "decode_json",
            Self::CoerceInteger => "coerce_integer",
            Self::CoerceDouble => "coerce_double",
            Self::CoerceString => "coerce_string",
            Self::CoerceBoolean => "coerce_boolean",
            Self::Trim => "trim",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::Slugify { .. } => "slugify",
            Self::CommaJoinList => "comma_join_list",
            Self::ReformatDate { .. } => "reformat_date",
            Self::StripMarkup { .. } => "strip_markup",
            Self::ReplaceWithConstant { .. } => "replace_with_constant",
            Self::ReplaceIfEquals { .. } => "replace_if_equals",
            Self::SubstringReplace { .. } => "substring_replace",
            Self::RenameKey { .. } => "rename_key",
        }
    }
}

/// Ordered `field -> rule` registrations. Registering a field again replaces its rule in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rules {
    entries: Vec<(String, Rule)>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` for `field`.
    pub fn rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.insert(field, rule);
        self
    }

    /// In-place form of [`Rules::rule`].
    pub fn insert(&mut self, field: impl Into<String>, rule: Rule) {
        let field = field.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = rule,
            None => self.entries.push((field, rule)),
        }
    }

    pub fn decode_json(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::DecodeJson)
    }

    pub fn coerce_integer(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::CoerceInteger)
    }

    pub fn coerce_double(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::CoerceDouble)
    }

    pub fn coerce_string(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::CoerceString)
    }

    pub fn coerce_boolean(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::CoerceBoolean)
    }

    pub fn trim(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::Trim)
    }

    pub fn lowercase(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::Lowercase)
    }

    pub fn uppercase(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::Uppercase)
    }

    /// Slugify with `delimiter`; an empty delimiter falls back to `-`.
    pub fn slugify(self, field: impl Into<String>, delimiter: &str) -> Self {
        let delimiter = if delimiter.is_empty() {
            DEFAULT_SLUG_DELIMITER
        } else {
            delimiter
        };
        self.rule(
            field,
            Rule::Slugify {
                delimiter: delimiter.to_string(),
            },
        )
    }

    pub fn comma_join_list(self, field: impl Into<String>) -> Self {
        self.rule(field, Rule::CommaJoinList)
    }

    pub fn reformat_date(self, field: impl Into<String>, from: &str, to: &str) -> Self {
        self.rule(
            field,
            Rule::ReformatDate {
                from: from.to_string(),
                to: to.to_string(),
            },
        )
    }

    pub fn strip_markup<S: AsRef<str>>(
        self,
        field: impl Into<String>,
        allowed: impl IntoIterator<Item = S>,
    ) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|tag| tag.as_ref().to_ascii_lowercase())
            .collect();
        self.rule(field, Rule::StripMarkup { allowed })
    }

    pub fn replace_with_constant(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.rule(
            field,
            Rule::ReplaceWithConstant {
                value: value.into(),
            },
        )
    }

    pub fn replace_if_equals(
        self,
        field: impl Into<String>,
        default: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Self {
        self.rule(
            field,
            Rule::ReplaceIfEquals {
                default: default.into(),
                new: new.into(),
            },
        )
    }

    pub fn substring_replace(self, field: impl Into<String>, search: &str, replace: &str) -> Self {
        self.rule(
            field,
            Rule::SubstringReplace {
                search: search.to_string(),
                replace: replace.to_string(),
            },
        )
    }

    pub fn rename_key(self, field: impl Into<String>, to: impl Into<String>) -> Self {
        self.rule(field, Rule::RenameKey { to: to.into() })
    }

    pub fn get(&self, field: &str) -> Option<&Rule> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.entries.iter().map(|(f, r)| (f.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests;
