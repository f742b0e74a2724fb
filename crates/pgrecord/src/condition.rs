//! WHERE-clause conditions.
//!
//! A [`Condition`] owns validated column identifiers and the values to bind; placeholders are
//! numbered only when the condition is rendered into a [`Statement`](crate::statement::Statement).
//!
//! # Example
//! ```ignore
//! use pgrecord::Condition;
//!
//! let cond = Condition::eq("status", "active")?
//!     .and(Condition::between("age", 18, 65)?);
//! ```

use crate::error::OrmResult;
use crate::ident::Ident;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Inner {
    /// Raw SQL fragment, spliced verbatim.
    Raw(String),
    Compare {
        column: Ident,
        operator: &'static str,
        value: Value,
    },
    Null {
        column: Ident,
        negated: bool,
    },
    List {
        column: Ident,
        negated: bool,
        values: Vec<Value>,
    },
    Between {
        column: Ident,
        low: Value,
        high: Value,
    },
    Group {
        joiner: &'static str,
        items: Vec<Condition>,
    },
}

/// A WHERE-clause condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(Inner);

impl Condition {
    fn compare(column: &str, operator: &'static str, value: impl Into<Value>) -> OrmResult<Self> {
        Ok(Self(Inner::Compare {
            column: Ident::parse(column)?,
            operator,
            value: value.into(),
        }))
    }

    /// `column = value`
    pub fn eq(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "=", value)
    }

    /// `column <> value`
    pub fn ne(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "<>", value)
    }

    /// `column > value`
    pub fn gt(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, ">", value)
    }

    /// `column >= value`
    pub fn gte(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, ">=", value)
    }

    /// `column < value`
    pub fn lt(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "<", value)
    }

    /// `column <= value`
    pub fn lte(column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "<=", value)
    }

    /// `column LIKE pattern`
    pub fn like(column: &str, pattern: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "LIKE", pattern)
    }

    /// `column ILIKE pattern`
    pub fn ilike(column: &str, pattern: impl Into<Value>) -> OrmResult<Self> {
        Self::compare(column, "ILIKE", pattern)
    }

    /// `column IS NULL`
    pub fn is_null(column: &str) -> OrmResult<Self> {
        Ok(Self(Inner::Null {
            column: Ident::parse(column)?,
            negated: false,
        }))
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: &str) -> OrmResult<Self> {
        Ok(Self(Inner::Null {
            column: Ident::parse(column)?,
            negated: true,
        }))
    }

    /// `column IN (...)`. An empty list matches nothing.
    pub fn in_list<V: Into<Value>>(
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> OrmResult<Self> {
        Ok(Self(Inner::List {
            column: Ident::parse(column)?,
            negated: false,
            values: values.into_iter().map(Into::into).collect(),
        }))
    }

    /// `column NOT IN (...)`. An empty list matches everything.
    pub fn not_in<V: Into<Value>>(
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> OrmResult<Self> {
        Ok(Self(Inner::List {
            column: Ident::parse(column)?,
            negated: true,
            values: values.into_iter().map(Into::into).collect(),
        }))
    }

    /// `column BETWEEN low AND high`
    pub fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> OrmResult<Self> {
        Ok(Self(Inner::Between {
            column: Ident::parse(column)?,
            low: low.into(),
            high: high.into(),
        }))
    }

    /// Raw SQL condition.
    ///
    /// The fragment is not escaped; never build it from user input.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self(Inner::Raw(sql.into()))
    }

    /// Combine every condition with AND.
    pub fn all(items: impl IntoIterator<Item = Condition>) -> Self {
        Self(Inner::Group {
            joiner: " AND ",
            items: items.into_iter().collect(),
        })
    }

    /// Combine every condition with OR.
    pub fn any(items: impl IntoIterator<Item = Condition>) -> Self {
        Self(Inner::Group {
            joiner: " OR ",
            items: items.into_iter().collect(),
        })
    }

    /// `self AND other`
    pub fn and(self, other: Condition) -> Self {
        Self::all([self, other])
    }

    /// `self OR other`
    pub fn or(self, other: Condition) -> Self {
        Self::any([self, other])
    }

    /// Append this condition to `sql`, pushing bound values to `params`.
    ///
    /// Placeholders continue from `params.len() + 1`.
    pub fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match &self.0 {
            Inner::Raw(raw) => sql.push_str(raw),
            Inner::Compare {
                column,
                operator,
                value,
            } => {
                sql.push_str(&column.to_sql());
                sql.push(' ');
                sql.push_str(operator);
                sql.push(' ');
                bind(sql, params, value);
            }
            Inner::Null { column, negated } => {
                sql.push_str(&column.to_sql());
                sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Inner::List {
                column,
                negated,
                values,
            } => {
                if values.is_empty() {
                    sql.push_str(if *negated { "TRUE" } else { "FALSE" });
                    return;
                }
                sql.push_str(&column.to_sql());
                sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    bind(sql, params, value);
                }
                sql.push(')');
            }
            Inner::Between { column, low, high } => {
                sql.push_str(&column.to_sql());
                sql.push_str(" BETWEEN ");
                bind(sql, params, low);
                sql.push_str(" AND ");
                bind(sql, params, high);
            }
            Inner::Group { joiner, items } => {
                if items.is_empty() {
                    sql.push_str("TRUE");
                    return;
                }
                if items.len() == 1 {
                    items[0].render(sql, params);
                    return;
                }
                sql.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(joiner);
                    }
                    item.render(sql, params);
                }
                sql.push(')');
            }
        }
    }
}

fn bind(sql: &mut String, params: &mut Vec<Value>, value: &Value) {
    params.push(value.clone());
    sql.push('$');
    sql.push_str(&params.len().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered(cond: &Condition) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        cond.render(&mut sql, &mut params);
        (sql, params)
    }

    #[test]
    fn compare_binds_one_placeholder() {
        let (sql, params) = rendered(&Condition::eq("id", 7).unwrap());
        assert_eq!(sql, "id = $1");
        assert_eq!(params, vec![json!(7)]);
    }

    #[test]
    fn groups_number_placeholders_in_order() {
        let cond = Condition::eq("status", "active")
            .unwrap()
            .and(Condition::between("age", 18, 65).unwrap());
        let (sql, params) = rendered(&cond);
        assert_eq!(sql, "(status = $1 AND age BETWEEN $2 AND $3)");
        assert_eq!(params, vec![json!("active"), json!(18), json!(65)]);
    }

    #[test]
    fn empty_lists_render_constant_truth() {
        let none: Vec<i64> = Vec::new();
        assert_eq!(rendered(&Condition::in_list("id", none.clone()).unwrap()).0, "FALSE");
        assert_eq!(rendered(&Condition::not_in("id", none).unwrap()).0, "TRUE");
    }

    #[test]
    fn rejects_unsafe_columns() {
        assert!(Condition::eq("id; --", 1).is_err());
    }
}
