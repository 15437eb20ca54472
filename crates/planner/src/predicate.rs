use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal carried by a predicate leaf.
///
/// The variant reflects how the caller typed the value; the skipper re-types it
/// against the column's declared type before comparing with statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Days since 1970-01-01.
    Date32(i32),
    Utf8(String),
    Boolean(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Date32(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for LiteralValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for LiteralValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        Self::Utf8(v.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        Self::Utf8(v)
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

/// Filter predicate over one table.
///
/// A request's predicate list is an implicit conjunction. Combinators are kept
/// as a tree; every consumer walks it recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Equals { column: String, value: LiteralValue },
    EqualsNullSafe { column: String, value: LiteralValue },
    NotEquals { column: String, value: LiteralValue },
    GreaterThan { column: String, value: LiteralValue },
    GreaterOrEqual { column: String, value: LiteralValue },
    LessThan { column: String, value: LiteralValue },
    LessOrEqual { column: String, value: LiteralValue },
    In { column: String, values: Vec<LiteralValue> },
    IsNull { column: String },
    IsNotNull { column: String },
    StartsWith { column: String, value: String },
    EndsWith { column: String, value: String },
    Contains { column: String, value: String },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn eq_null_safe(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::EqualsNullSafe {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_eq(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::NotEquals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::GreaterThan {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gt_eq(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::GreaterOrEqual {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::LessThan {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lt_eq(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::LessOrEqual {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn in_list<V: Into<LiteralValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull {
            column: column.into(),
        }
    }

    pub fn starts_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn ends_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EndsWith {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn and(left: Predicate, right: Predicate) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Column referenced by a leaf; `None` for combinators.
    pub fn leaf_column(&self) -> Option<&str> {
        match self {
            Self::Equals { column, .. }
            | Self::EqualsNullSafe { column, .. }
            | Self::NotEquals { column, .. }
            | Self::GreaterThan { column, .. }
            | Self::GreaterOrEqual { column, .. }
            | Self::LessThan { column, .. }
            | Self::LessOrEqual { column, .. }
            | Self::In { column, .. }
            | Self::IsNull { column }
            | Self::IsNotNull { column }
            | Self::StartsWith { column, .. }
            | Self::EndsWith { column, .. }
            | Self::Contains { column, .. } => Some(column),
            Self::And(..) | Self::Or(..) | Self::Not(_) => None,
        }
    }

    pub fn columns(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut HashSet<String>) {
        match self {
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            Self::Not(x) => x.collect_columns(out),
            leaf => {
                if let Some(c) = leaf.leaf_column() {
                    out.insert(c.to_string());
                }
            }
        }
    }

    /// True when every referenced column is in `columns`.
    pub fn references_only(&self, columns: &HashSet<String>) -> bool {
        match self {
            Self::And(a, b) | Self::Or(a, b) => {
                a.references_only(columns) && b.references_only(columns)
            }
            Self::Not(x) => x.references_only(columns),
            leaf => leaf
                .leaf_column()
                .is_some_and(|c| columns.contains(c)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { column, value } => write!(f, "{column} = {}", fmt_lit(value)),
            Self::EqualsNullSafe { column, value } => {
                write!(f, "{column} <=> {}", fmt_lit(value))
            }
            Self::NotEquals { column, value } => write!(f, "{column} != {}", fmt_lit(value)),
            Self::GreaterThan { column, value } => write!(f, "{column} > {}", fmt_lit(value)),
            Self::GreaterOrEqual { column, value } => write!(f, "{column} >= {}", fmt_lit(value)),
            Self::LessThan { column, value } => write!(f, "{column} < {}", fmt_lit(value)),
            Self::LessOrEqual { column, value } => write!(f, "{column} <= {}", fmt_lit(value)),
            Self::In { column, values } => {
                let items = values.iter().map(fmt_lit).collect::<Vec<_>>();
                write!(f, "{column} IN ({})", items.join(", "))
            }
            Self::IsNull { column } => write!(f, "{column} IS NULL"),
            Self::IsNotNull { column } => write!(f, "{column} IS NOT NULL"),
            Self::StartsWith { column, value } => write!(f, "{column} STARTS WITH '{value}'"),
            Self::EndsWith { column, value } => write!(f, "{column} ENDS WITH '{value}'"),
            Self::Contains { column, value } => write!(f, "{column} CONTAINS '{value}'"),
            Self::And(a, b) => write!(f, "({a} AND {b})"),
            Self::Or(a, b) => write!(f, "({a} OR {b})"),
            Self::Not(x) => write!(f, "NOT ({x})"),
        }
    }
}

fn fmt_lit(v: &LiteralValue) -> String {
    match v {
        LiteralValue::Utf8(s) => format!("'{s}'"),
        LiteralValue::Date32(d) => format!("DATE({d})"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_columns_through_combinators() {
        let p = Predicate::and(
            Predicate::eq("day", "2024-01-01"),
            Predicate::not(Predicate::or(
                Predicate::gt("score", 5_i64),
                Predicate::is_null("title"),
            )),
        );
        let mut cols = p.columns().into_iter().collect::<Vec<_>>();
        cols.sort();
        assert_eq!(cols, vec!["day", "score", "title"]);

        let partition: HashSet<String> = ["day".to_string()].into_iter().collect();
        assert!(!p.references_only(&partition));
        assert!(Predicate::not(Predicate::eq("day", "x")).references_only(&partition));
    }

    #[test]
    fn renders_sql_like_text() {
        let p = Predicate::or(
            Predicate::in_list("k", ["a", "b"]),
            Predicate::not(Predicate::lt_eq("n", 3_i32)),
        );
        assert_eq!(p.to_string(), "(k IN ('a', 'b') OR NOT (n <= 3))");
    }
}
