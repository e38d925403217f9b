// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Filter expressions for live queries and monitors.
//!
//! A filter is a boolean tree of conditions:
//!
//! ```text
//! field op value
//! ```
//!
//! # Operators
//!
//! - `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - `in`, `notIn` (value is an array)
//! - `regex` (value is a pattern string)
//!
//! Trees are lowered to the backend's find-document dialect before they are
//! sent, and the same find documents can be evaluated locally against rows.
//!
//! # Examples
//!
//! ```text
//! userId == "u1"
//! age >= 18
//! status in ["open", "blocked"]
//! title regex "^fix"
//! ```

mod eval;
mod expr;
mod lower;
mod parser;

pub use eval::matches;
pub use expr::{Expr, Op};
pub use lower::lower;
pub use parser::{parse_filter, parse_filters};
