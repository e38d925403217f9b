// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lowering of filter trees to find documents.
//!
//! - `a == 1` becomes `{"a": 1}`
//! - `a > 1` becomes `{"a": {"$gt": 1}}`
//! - `And` merges its clauses into one document. Operator objects for the same
//!   field are merged, so `a > 1 && a < 5` becomes `{"a": {"$gt": 1, "$lt": 5}}`
//! - `Or` becomes `{"$or": [...]}`

use serde_json::{Map, Value};

use super::expr::Expr;

/// Lowers a filter tree to a find document.
pub fn lower(expr: &Expr) -> Value {
    match expr {
        Expr::Cond { field, op, value } => {
            let clause = match op.find_key() {
                None => value.clone(),
                Some(key) => operator_object(key, value.clone()),
            };
            let mut doc = Map::new();
            doc.insert(field.clone(), clause);
            Value::Object(doc)
        }
        Expr::And { clauses } => {
            let mut doc = Map::new();
            for clause in clauses {
                if let Value::Object(lowered) = lower(clause) {
                    for (key, value) in lowered {
                        merge_clause(&mut doc, key, value);
                    }
                }
            }
            Value::Object(doc)
        }
        Expr::Or { clauses } => {
            let mut doc = Map::new();
            doc.insert(
                "$or".to_string(),
                Value::Array(clauses.iter().map(lower).collect()),
            );
            Value::Object(doc)
        }
    }
}

fn operator_object(key: &str, value: Value) -> Value {
    let mut ops = Map::new();
    ops.insert(key.to_string(), value);
    Value::Object(ops)
}

/// Merges one `key: value` clause into an `And` document.
fn merge_clause(doc: &mut Map<String, Value>, key: String, value: Value) {
    let Some(existing) = doc.remove(&key) else {
        doc.insert(key, value);
        return;
    };

    if key.starts_with('$') {
        // Two `$or` groups at the same level must both hold.
        let mut both = Map::new();
        both.insert(key.clone(), existing);
        let mut other = Map::new();
        other.insert(key, value);
        let list = doc
            .entry("$and".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = list {
            list.push(Value::Object(both));
            list.push(Value::Object(other));
        }
        return;
    }

    let mut ops = as_operators(existing);
    for (op, operand) in as_operators(value) {
        ops.insert(op, operand);
    }
    doc.insert(key, Value::Object(ops));
}

/// Views a field clause as an operator object, wrapping equality as `$eq`.
fn as_operators(clause: Value) -> Map<String, Value> {
    match clause {
        Value::Object(map) if is_operator_object(&map) => map,
        value => {
            let mut ops = Map::new();
            ops.insert("$eq".to_string(), value);
            ops
        }
    }
}

/// Returns true if every key of `map` is an operator (`$`-prefixed).
pub(crate) fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

#[cfg(test)]
#[path = "lower_tests.rs"]
mod tests;
