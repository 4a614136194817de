//! Symbolic expressions for NineML models
//!
//! This crate provides the expression capability that the model layer builds
//! on: reading expressions from text, printing them back, enumerating and
//! substituting free symbols, simplifying to a canonical form, testing two
//! expressions for symbolic equivalence and evaluating them numerically.
//!
//! # Examples
//!
//! ```
//! use nineml_expr::{Expr, equivalent};
//!
//! let a = Expr::parse("x + x").unwrap();
//! let b = Expr::parse("2*x").unwrap();
//! assert!(equivalent(&a, &b));
//! ```

mod canonical;
mod eval;
mod expr;
mod logic;
pub mod parser;

pub use eval::{BUILTIN_FUNCTIONS, EvalError, Value, is_builtin_function};
pub use expr::{BinaryOp, ComparisonOp, Expr, UnaryOp};
pub use parser::{Config, ExprParseError};

/// Identifiers with a fixed meaning in every component.
///
/// `t` is simulation time, `pi` and `e` are the mathematical constants.
/// Reserved identifiers are never namespace-qualified and may not be used as
/// element names.
pub const RESERVED_IDENTIFIERS: &[&str] = &["t", "pi", "e"];

/// Returns whether `name` is a reserved identifier
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(&name)
}

/// Returns whether two expressions are symbolically equivalent.
///
/// Numeric expressions are equivalent when `expand(a - b)` is zero. Boolean
/// expressions are compared by truth table over their canonicalised relational
/// sub-expressions. A numeric expression is never equivalent to a boolean one.
#[must_use]
pub fn equivalent(a: &Expr, b: &Expr) -> bool {
    match (canonical::to_polynomial(a), canonical::to_polynomial(b)) {
        (Some(a), Some(b)) => a.sub(&b).is_zero(),
        (None, None) => logic::equivalent(a, b),
        _ => false,
    }
}
