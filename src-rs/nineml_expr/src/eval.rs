//! Numeric evaluation of expressions.

use std::fmt;

use nineml_shared::error::AsNineMLError;

use crate::expr::{BinaryOp, ComparisonOp, Expr, UnaryOp};

/// Functions understood by the evaluator, with their arity.
pub const BUILTIN_FUNCTIONS: &[(&str, usize)] = &[
    ("exp", 1),
    ("log", 1),
    ("log10", 1),
    ("sqrt", 1),
    ("sin", 1),
    ("cos", 1),
    ("tan", 1),
    ("asin", 1),
    ("acos", 1),
    ("atan", 1),
    ("atan2", 2),
    ("sinh", 1),
    ("cosh", 1),
    ("tanh", 1),
    ("abs", 1),
    ("floor", 1),
    ("ceil", 1),
    ("pow", 2),
    ("min", 2),
    ("max", 2),
];

/// Returns whether `name` is a builtin function.
#[must_use]
pub fn is_builtin_function(name: &str) -> bool {
    BUILTIN_FUNCTIONS.iter().any(|(builtin, _)| *builtin == name)
}

fn builtin_arity(name: &str) -> Option<usize> {
    BUILTIN_FUNCTIONS
        .iter()
        .find_map(|(builtin, arity)| (*builtin == name).then_some(*arity))
}

/// Applies a builtin function, or returns `None` if `name` is unknown or the
/// argument count is wrong.
pub fn call_builtin(name: &str, args: &[f64]) -> Option<f64> {
    let value = match (name, args) {
        ("exp", [x]) => x.exp(),
        ("log", [x]) => x.ln(),
        ("log10", [x]) => x.log10(),
        ("sqrt", [x]) => x.sqrt(),
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("asin", [x]) => x.asin(),
        ("acos", [x]) => x.acos(),
        ("atan", [x]) => x.atan(),
        ("atan2", [y, x]) => y.atan2(*x),
        ("sinh", [x]) => x.sinh(),
        ("cosh", [x]) => x.cosh(),
        ("tanh", [x]) => x.tanh(),
        ("abs", [x]) => x.abs(),
        ("floor", [x]) => x.floor(),
        ("ceil", [x]) => x.ceil(),
        ("pow", [x, y]) => x.powf(*y),
        ("min", [x, y]) => x.min(*y),
        ("max", [x, y]) => x.max(*y),
        _ => return None,
    };
    Some(value)
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A real number
    Number(f64),
    /// A truth value
    Boolean(bool),
}

impl Value {
    /// Returns the numeric value, if this is a number
    #[must_use]
    pub const fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Boolean(_) => None,
        }
    }

    /// Returns the truth value, if this is a boolean
    #[must_use]
    pub const fn as_boolean(self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(value),
            Self::Number(_) => None,
        }
    }

    const fn type_name(self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// An error raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A symbol had no value
    UnknownSymbol(String),
    /// A function is not a builtin
    UnknownFunction(String),
    /// A builtin was called with the wrong number of arguments
    WrongArgCount {
        /// The function name
        name: String,
        /// The expected number of arguments
        expected: usize,
        /// The number of arguments given
        found: usize,
    },
    /// An operand had the wrong type
    TypeMismatch {
        /// The expected type
        expected: &'static str,
        /// The type found
        found: &'static str,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSymbol(name) => write!(f, "symbol `{name}` has no value"),
            Self::UnknownFunction(name) => write!(f, "unknown function `{name}`"),
            Self::WrongArgCount {
                name,
                expected,
                found,
            } => write!(
                f,
                "function `{name}` expects {expected} argument(s) but was given {found}"
            ),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected a {expected} but found a {found}")
            }
        }
    }
}

impl std::error::Error for EvalError {}

impl AsNineMLError for EvalError {
    fn message(&self) -> String {
        self.to_string()
    }
}

/// Evaluates `expr`, looking symbols up with `lookup`.
pub fn evaluate(expr: &Expr, lookup: &impl Fn(&str) -> Option<f64>) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(value) => Ok(Value::Number(*value)),
        Expr::Boolean(value) => Ok(Value::Boolean(*value)),
        Expr::Symbol(name) => lookup(name)
            .or_else(|| match name.as_str() {
                "pi" => Some(std::f64::consts::PI),
                "e" => Some(std::f64::consts::E),
                _ => None,
            })
            .map(Value::Number)
            .ok_or_else(|| EvalError::UnknownSymbol(name.clone())),
        Expr::UnaryOp { op, expr } => {
            let value = evaluate(expr, lookup)?;
            match op {
                UnaryOp::Neg => Ok(Value::Number(-expect_number(value)?)),
                UnaryOp::Not => Ok(Value::Boolean(!expect_boolean(value)?)),
            }
        }
        Expr::BinaryOp { op, left, right } => {
            let left = evaluate(left, lookup)?;
            match op {
                BinaryOp::And => {
                    if !expect_boolean(left)? {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(expect_boolean(evaluate(right, lookup)?)?))
                }
                BinaryOp::Or => {
                    if expect_boolean(left)? {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(expect_boolean(evaluate(right, lookup)?)?))
                }
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
                    let left = expect_number(left)?;
                    let right = expect_number(evaluate(right, lookup)?)?;
                    let value = match op {
                        BinaryOp::Add => left + right,
                        BinaryOp::Sub => left - right,
                        BinaryOp::Mul => left * right,
                        BinaryOp::Div => left / right,
                        BinaryOp::Pow | BinaryOp::And | BinaryOp::Or => left.powf(right),
                    };
                    Ok(Value::Number(value))
                }
            }
        }
        Expr::ComparisonOp { op, left, right } => {
            let left = expect_number(evaluate(left, lookup)?)?;
            let right = expect_number(evaluate(right, lookup)?)?;
            #[expect(
                clippy::float_cmp,
                reason = "comparison semantics follow the expression exactly"
            )]
            let result = match op {
                ComparisonOp::LessThan => left < right,
                ComparisonOp::LessThanEq => left <= right,
                ComparisonOp::GreaterThan => left > right,
                ComparisonOp::GreaterThanEq => left >= right,
                ComparisonOp::Eq => left == right,
                ComparisonOp::NotEq => left != right,
            };
            Ok(Value::Boolean(result))
        }
        Expr::FunctionCall { name, args } => {
            let expected =
                builtin_arity(name).ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
            if args.len() != expected {
                return Err(EvalError::WrongArgCount {
                    name: name.clone(),
                    expected,
                    found: args.len(),
                });
            }

            let values = args
                .iter()
                .map(|arg| evaluate(arg, lookup).and_then(expect_number))
                .collect::<Result<Vec<_>, _>>()?;

            call_builtin(name, &values)
                .map(Value::Number)
                .ok_or_else(|| EvalError::UnknownFunction(name.clone()))
        }
    }
}

fn expect_number(value: Value) -> Result<f64, EvalError> {
    value.as_number().ok_or(EvalError::TypeMismatch {
        expected: "number",
        found: value.type_name(),
    })
}

fn expect_boolean(value: Value) -> Result<bool, EvalError> {
    value.as_boolean().ok_or(EvalError::TypeMismatch {
        expected: "boolean",
        found: value.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn eval_with(source: &str, values: &[(&str, f64)]) -> Result<Value, EvalError> {
        let values: HashMap<&str, f64> = values.iter().copied().collect();
        Expr::parse(source)
            .expect("expression should parse")
            .evaluate(&|name| values.get(name).copied())
    }

    fn number(source: &str, values: &[(&str, f64)]) -> f64 {
        eval_with(source, values)
            .expect("evaluation should succeed")
            .as_number()
            .expect("value should be a number")
    }

    #[test]
    fn arithmetic() {
        assert_abs_diff_eq!(number("1 + 2 * 3", &[]), 7.0);
        assert_abs_diff_eq!(number("2^3^2", &[]), 512.0);
        assert_abs_diff_eq!(number("-x^2", &[("x", 3.0)]), -9.0);
        assert_abs_diff_eq!(number("(a + b) / 2", &[("a", 1.0), ("b", 2.0)]), 1.5);
    }

    #[test]
    fn constants_and_functions() {
        assert_abs_diff_eq!(number("2 * pi", &[]), std::f64::consts::TAU);
        assert_abs_diff_eq!(number("log(e)", &[]), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(number("exp(-t / tau)", &[("t", 0.0), ("tau", 20.0)]), 1.0);
        assert_abs_diff_eq!(number("max(a, 2)", &[("a", 5.0)]), 5.0);
    }

    #[test]
    fn lookup_overrides_constants() {
        assert_abs_diff_eq!(number("e", &[("e", 2.0)]), 2.0);
    }

    #[test]
    fn boolean_logic() {
        let value = eval_with("V > theta && !refractory", &[("V", 1.0), ("theta", 0.5)]);
        // `refractory` has no value
        assert!(value.is_err());

        let value = eval_with("V < theta || x > 0", &[("V", 0.0), ("theta", 0.5)])
            .expect("evaluation should succeed");
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn errors() {
        assert_eq!(
            eval_with("a + 1", &[]),
            Err(EvalError::UnknownSymbol("a".to_string()))
        );
        assert_eq!(
            eval_with("foo(1)", &[]),
            Err(EvalError::UnknownFunction("foo".to_string()))
        );
        assert_eq!(
            eval_with("exp(1, 2)", &[]),
            Err(EvalError::WrongArgCount {
                name: "exp".to_string(),
                expected: 1,
                found: 2,
            })
        );
        assert_eq!(
            eval_with("1 + (2 > 1)", &[]),
            Err(EvalError::TypeMismatch {
                expected: "number",
                found: "boolean",
            })
        );
    }

    #[test]
    fn builtins_are_listed() {
        assert!(is_builtin_function("atan2"));
        assert!(!is_builtin_function("foo"));
        for (name, arity) in BUILTIN_FUNCTIONS {
            let args = vec![0.5; *arity];
            assert!(call_builtin(name, &args).is_some(), "{name} is not callable");
        }
    }
}
