// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation of find documents against JSON rows.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use super::lower::is_operator_object;

/// Returns true if `doc` satisfies the find document.
///
/// A null or empty find document matches every row. Field names may be
/// dotted paths into nested objects. Unknown operators never match.
pub fn matches(find: &Value, doc: &Value) -> bool {
    match find {
        Value::Null => true,
        Value::Object(clauses) => clauses
            .iter()
            .all(|(key, clause)| matches_clause(key, clause, doc)),
        _ => false,
    }
}

fn matches_clause(key: &str, clause: &Value, doc: &Value) -> bool {
    match key {
        "$or" => as_list(clause).iter().any(|sub| matches(sub, doc)),
        "$and" => as_list(clause).iter().all(|sub| matches(sub, doc)),
        "$nor" => !as_list(clause).iter().any(|sub| matches(sub, doc)),
        _ => {
            let field = lookup(doc, key);
            match clause {
                Value::Object(ops) if is_operator_object(ops) => matches_operators(ops, field),
                expected => equals(field, expected),
            }
        }
    }
}

fn matches_operators(ops: &Map<String, Value>, field: Option<&Value>) -> bool {
    ops.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => equals(field, operand),
        "$ne" => !equals(field, operand),
        "$gt" => compare(field, operand) == Some(Ordering::Greater),
        "$gte" => matches!(
            compare(field, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "$lt" => compare(field, operand) == Some(Ordering::Less),
        "$lte" => matches!(
            compare(field, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        "$in" => as_list(operand)
            .iter()
            .any(|candidate| equals(field, candidate)),
        "$nin" => !as_list(operand)
            .iter()
            .any(|candidate| equals(field, candidate)),
        "$exists" => field.is_some() == operand.as_bool().unwrap_or(true),
        "$regex" => regex_matches(field, operand),
        _ => false,
    })
}

/// Resolves a dotted path inside `doc`.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Equality with array membership: an array field equals any of its elements.
fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(actual) if actual == expected => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(actual) => numbers_equal(actual, expected),
    }
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Orders two values of the same JSON type. Mixed types do not compare.
fn compare(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (field?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn regex_matches(field: Option<&Value>, pattern: &Value) -> bool {
    let (Some(Value::String(text)), Value::String(pattern)) = (field, pattern) else {
        return false;
    };
    Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn as_list(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        _ => &[],
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
