// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Filter expression tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A boolean filter over row fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    /// A single `field op value` comparison.
    Cond { field: String, op: Op, value: Value },
    /// All clauses must match.
    And { clauses: Vec<Expr> },
    /// At least one clause must match.
    Or { clauses: Vec<Expr> },
}

impl Expr {
    pub fn cond(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Expr::Cond {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn and(clauses: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And {
            clauses: clauses.into_iter().collect(),
        }
    }

    pub fn or(clauses: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or {
            clauses: clauses.into_iter().collect(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Gt, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Lt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Ge, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(field, Op::Le, value)
    }

    /// Combines `self` with another expression under `And`.
    ///
    /// An existing `And` absorbs the new clause instead of nesting.
    pub fn and_also(self, other: Expr) -> Self {
        match self {
            Expr::And { mut clauses } => {
                clauses.push(other);
                Expr::And { clauses }
            }
            expr => Expr::and([expr, other]),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "regex")]
    Regex,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::In => "in",
            Op::NotIn => "notIn",
            Op::Regex => "regex",
        }
    }

    /// The find-document operator key, or `None` for plain equality.
    pub fn find_key(&self) -> Option<&'static str> {
        match self {
            Op::Eq => None,
            Op::Ne => Some("$ne"),
            Op::Gt => Some("$gt"),
            Op::Lt => Some("$lt"),
            Op::Ge => Some("$gte"),
            Op::Le => Some("$lte"),
            Op::In => Some("$in"),
            Op::NotIn => Some("$nin"),
            Op::Regex => Some("$regex"),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Op::Eq),
            "!=" => Ok(Op::Ne),
            ">" => Ok(Op::Gt),
            "<" => Ok(Op::Lt),
            ">=" => Ok(Op::Ge),
            "<=" => Ok(Op::Le),
            "in" => Ok(Op::In),
            "notIn" => Ok(Op::NotIn),
            "regex" => Ok(Op::Regex),
            _ => Err(Error::InvalidOperator(s.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
