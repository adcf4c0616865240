//! Predicate items for dynamic queries.
//!
//! A [`QueryItem`] is a `(column, operator, value)` triple. The same type is used
//! for WHERE/HAVING predicates, where the [`Op`] matters, and for SET pairs,
//! where it is ignored.

use crate::error::OrmError;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Query operator for building conditions.
///
/// # Example
/// ```ignore
/// use myorm::{Op, QueryItem};
///
/// QueryItem::new("age", Op::Gte, 18);
/// QueryItem::new("id", Op::In, vec![1_i64, 2, 3]);
/// QueryItem::new("age", Op::Between, vec![10, 20]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Op {
    /// Equal: column = value
    #[default]
    Eq,
    /// Not equal: column != value
    Neq,
    /// Less than: column < value
    Lt,
    /// Less than or equal: column <= value
    Lte,
    /// Greater than: column > value
    Gt,
    /// Greater than or equal: column >= value
    Gte,
    /// IN (list)
    In,
    /// NOT IN (list)
    NotIn,
    /// LIKE pattern match
    Like,
    /// BETWEEN a AND b, value is a two-element list
    Between,
}

impl Op {
    /// SQL spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::In => "in",
            Op::NotIn => "not in",
            Op::Like => "like",
            Op::Between => "between",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "=" => Op::Eq,
            "!=" | "<>" => Op::Neq,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "in" => Op::In,
            "not in" => Op::NotIn,
            "like" => Op::Like,
            "between" => Op::Between,
            other => return Err(OrmError::validation(format!("unknown operator '{other}'"))),
        };
        Ok(op)
    }
}

/// A `(column, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryItem {
    pub name: String,
    pub op: Op,
    pub value: Value,
}

impl QueryItem {
    /// Create a predicate item.
    pub fn new(name: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }

    /// Create a `column = value` pair for SET clauses.
    pub fn pair(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Eq, value)
    }

    // ==================== Convenience constructors ====================

    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Eq, value)
    }

    pub fn neq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Neq, value)
    }

    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Lt, value)
    }

    pub fn lte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Lte, value)
    }

    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Gt, value)
    }

    pub fn gte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Op::Gte, value)
    }

    pub fn like(name: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(name, Op::Like, pattern)
    }

    /// Create an IN condition: column in (values...)
    pub fn in_list<T: Into<Value>>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(name, Op::In, values)
    }

    /// Create a NOT IN condition: column not in (values...)
    pub fn not_in<T: Into<Value>>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(name, Op::NotIn, values)
    }

    /// Create a BETWEEN condition: column between from and to
    pub fn between<T: Into<Value>>(name: impl Into<String>, from: T, to: T) -> Self {
        Self::new(name, Op::Between, Value::List(vec![from.into(), to.into()]))
    }
}
