//! Table and column identifiers.
//!
//! Every name that ends up spliced into statement text goes through [`Ident`]:
//!
//! - bare parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - dotted names (`schema.table`) are split and checked per part
//! - quoted parts (`"Mixed Case"`) allow anything except NUL and get `"` doubled on output

use crate::error::{OrmError, OrmResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Bare(String),
    Quoted(String),
}

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<Part>,
}

impl Ident {
    /// Parse and validate an identifier.
    pub fn parse(input: &str) -> OrmResult<Self> {
        if input.is_empty() {
            return Err(OrmError::precondition("identifier cannot be empty"));
        }
        if input.contains('\0') {
            return Err(OrmError::precondition("identifier cannot contain NUL"));
        }

        let mut parts = Vec::new();
        let mut rest = input;
        loop {
            let (part, tail) = if let Some(quoted) = rest.strip_prefix('"') {
                split_quoted(quoted, input)?
            } else {
                split_bare(rest, input)?
            };
            parts.push(part);

            match tail.strip_prefix('.') {
                Some("") => {
                    return Err(OrmError::precondition(format!(
                        "trailing '.' in identifier {input:?}"
                    )));
                }
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(OrmError::precondition(format!(
                        "unexpected {tail:?} in identifier {input:?}"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// The last part of the name, unquoted (e.g. `users` for `public.users`).
    pub fn name(&self) -> &str {
        match self.parts.last() {
            Some(Part::Bare(s) | Part::Quoted(s)) => s,
            None => "",
        }
    }

    /// Render as SQL text.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                Part::Bare(s) => out.push_str(s),
                Part::Quoted(s) => {
                    out.push('"');
                    out.push_str(&s.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn split_bare<'a>(s: &'a str, whole: &str) -> OrmResult<(Part, &'a str)> {
    let end = s.find('.').unwrap_or(s.len());
    let name = &s[..end];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(OrmError::precondition(format!(
                "invalid identifier start {c:?} in {whole:?}"
            )));
        }
        None => {
            return Err(OrmError::precondition(format!(
                "empty identifier segment in {whole:?}"
            )));
        }
    }
    if let Some(c) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric())) {
        return Err(OrmError::precondition(format!(
            "invalid character {c:?} in identifier {whole:?}"
        )));
    }
    Ok((Part::Bare(name.to_string()), &s[end..]))
}

fn split_quoted<'a>(s: &'a str, whole: &str) -> OrmResult<(Part, &'a str)> {
    let mut name = String::new();
    let mut iter = s.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(iter.peek(), Some((_, '"'))) {
            iter.next();
            name.push('"');
            continue;
        }
        if name.is_empty() {
            return Err(OrmError::precondition(format!(
                "empty quoted identifier in {whole:?}"
            )));
        }
        return Ok((Part::Quoted(name), &s[i + 1..]));
    }
    Err(OrmError::precondition(format!(
        "unclosed quoted identifier in {whole:?}"
    )))
}
