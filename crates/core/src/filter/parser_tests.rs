// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

#[parameterized(
    eq = { "a == 1", Op::Eq },
    ne = { "a != 1", Op::Ne },
    gt = { "a > 1", Op::Gt },
    lt = { "a < 1", Op::Lt },
    ge = { "a >= 1", Op::Ge },
    le = { "a <= 1", Op::Le },
    no_spaces = { "a>=1", Op::Ge },
    in_ = { "a in [1]", Op::In },
    not_in = { "a notIn [1]", Op::NotIn },
    regex = { "a regex \"^x\"", Op::Regex },
)]
fn parse_operator_symbols(input: &str, expected: Op) {
    let Expr::Cond { op, .. } = parse_filter(input).unwrap() else {
        panic!("expected a condition");
    };
    assert_eq!(op, expected);
}

#[parameterized(
    single_equals = { "a = 1" },
    triple_equals = { "a === 1" },
    tilde = { "a ~ 1" },
    word_without_space = { "a in[1]" },
    unknown_word = { "a like \"x\"" },
)]
fn parse_operator_invalid(input: &str) {
    let err = parse_filter(input).unwrap_err();
    assert!(matches!(err, Error::InvalidOperator(_)), "{err}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

#[parameterized(
    quoted_string = { "userId == \"u1\"", json!("u1") },
    bare_string = { "status == open", json!("open") },
    bare_with_spaces = { "title == hello world", json!("hello world") },
    integer = { "age >= 18", json!(18) },
    negative = { "balance < -5", json!(-5) },
    float = { "score > 0.5", json!(0.5) },
    boolean = { "done == false", json!(false) },
    null = { "owner == null", Value::Null },
    array = { "tags in [\"a\", \"b\"]", json!(["a", "b"]) },
    regex_pattern = { "title regex ^fix", json!("^fix") },
)]
fn parse_value_as_json_or_string(input: &str, expected: Value) {
    let Expr::Cond { value, .. } = parse_filter(input).unwrap() else {
        panic!("expected a condition");
    };
    assert_eq!(value, expected);
}

#[test]
fn parse_field_with_dotted_path() {
    assert_eq!(
        parse_filter("author.name == ada").unwrap(),
        Expr::eq("author.name", "ada")
    );
}

#[test]
fn parse_trims_whitespace() {
    assert_eq!(parse_filter("  a   ==   1  ").unwrap(), Expr::eq("a", 1));
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parse_empty_input() {
    assert!(matches!(
        parse_filter("   ").unwrap_err(),
        Error::InvalidInput(_)
    ));
}

#[test]
fn parse_missing_field() {
    let msg = parse_filter("== 1").unwrap_err().to_string();
    assert!(msg.contains("missing field name"));
}

#[test]
fn parse_missing_value() {
    let msg = parse_filter("a ==").unwrap_err().to_string();
    assert!(msg.contains("missing value"));
}

#[test]
fn parse_missing_operator() {
    assert!(matches!(
        parse_filter("a").unwrap_err(),
        Error::InvalidOperator(_)
    ));
}

#[test]
fn parse_in_requires_array() {
    let msg = parse_filter("a in 1").unwrap_err().to_string();
    assert!(msg.contains("expects an array"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Multiple conditions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parse_filters_empty() {
    assert_eq!(parse_filters::<&str>(&[]).unwrap(), None);
}

#[test]
fn parse_filters_single_is_unwrapped() {
    assert_eq!(parse_filters(&["a == 1"]).unwrap(), Some(Expr::eq("a", 1)));
}

#[test]
fn parse_filters_many_become_and() {
    let expr = parse_filters(&["a == 1", "b > 2"]).unwrap().unwrap();
    assert_eq!(expr, Expr::and([Expr::eq("a", 1), Expr::gt("b", 2)]));
}

#[test]
fn parse_filters_stops_at_first_error() {
    assert!(parse_filters(&["a == 1", "b ? 2"]).is_err());
}
