// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for filter conditions.
//!
//! Parses conditions like `userId == "u1"` or `tags in ["a", "b"]` into
//! [`Expr::Cond`] values. The value is read as JSON; anything that is not
//! valid JSON is taken as a bare string, so `status == open` works too.

use serde_json::Value;

use crate::error::{Error, Result};

use super::expr::{Expr, Op};

/// Symbolic operators, longest first.
const SYMBOLS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

/// Word operators. They must be separated from field and value by whitespace.
const WORDS: [&str; 3] = ["notIn", "in", "regex"];

/// Parse a single condition from a string.
///
/// # Examples
///
/// ```ignore
/// let expr = parse_filter("userId == \"u1\"")?;
/// let expr = parse_filter("age >= 18")?;
/// let expr = parse_filter("status in [\"open\", \"blocked\"]")?;
/// ```
///
/// # Errors
///
/// Returns an error with a helpful message if the condition is invalid.
pub fn parse_filter(input: &str) -> Result<Expr> {
    let input = input.trim();

    if input.is_empty() {
        return Err(Error::InvalidInput("empty filter expression".to_string()));
    }

    let (field, rest) = split_field(input)?;

    let rest = rest.trim_start();
    let (op, rest) = parse_operator(rest)?;

    let value_str = rest.trim();
    if value_str.is_empty() {
        return Err(Error::InvalidFilter(format!(
            "missing value in \"{input}\""
        )));
    }
    let value = parse_value(value_str);

    if matches!(op, Op::In | Op::NotIn) && !value.is_array() {
        return Err(Error::InvalidFilter(format!(
            "'{op}' expects an array value in \"{input}\""
        )));
    }

    Ok(Expr::cond(field, op, value))
}

/// Parses several conditions and combines them with `And`.
///
/// Returns `None` when `inputs` is empty. A single condition is returned
/// unwrapped.
pub fn parse_filters<S: AsRef<str>>(inputs: &[S]) -> Result<Option<Expr>> {
    let mut clauses = inputs
        .iter()
        .map(|input| parse_filter(input.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Expr::and(clauses)),
    })
}

/// Split input into field name and rest.
fn split_field(input: &str) -> Result<(&str, &str)> {
    let end = input
        .find(|c: char| c.is_whitespace() || c == '<' || c == '>' || c == '=' || c == '!')
        .unwrap_or(input.len());

    if end == 0 {
        return Err(Error::InvalidFilter(format!(
            "missing field name in \"{input}\""
        )));
    }

    Ok((&input[..end], &input[end..]))
}

/// Parse an operator from the start of the string.
fn parse_operator(s: &str) -> Result<(Op, &str)> {
    for symbol in SYMBOLS {
        if let Some(rest) = s.strip_prefix(symbol) {
            // `===`, `<>` and friends are typos, not `==` followed by a value.
            if rest.starts_with(['=', '<', '>', '!']) {
                break;
            }
            return Ok((symbol.parse()?, rest));
        }
    }

    for word in WORDS {
        if let Some(rest) = s.strip_prefix(word) {
            if rest.starts_with(char::is_whitespace) {
                return Ok((word.parse()?, rest));
            }
        }
    }

    let op_end = s.find(char::is_whitespace).unwrap_or(s.len());
    let bad_op = if op_end > 0 { &s[..op_end] } else { "(none)" };
    Err(Error::InvalidOperator(bad_op.to_string()))
}

/// Parse a value as JSON, falling back to a bare string.
fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
