//! Expression tree for right-hand sides, triggers and conditions.

use std::{collections::HashMap, fmt, str::FromStr};

use indexmap::IndexSet;

use crate::{
    canonical,
    eval::{self, EvalError, Value},
    parser::{self, ExprParseError},
};

/// Abstract syntax tree for mathematical and logical expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Boolean literal.
    Boolean(bool),
    /// Free symbol.
    Symbol(String),
    /// Unary operation applied to a single expression.
    UnaryOp {
        /// The unary operator to apply.
        op: UnaryOp,
        /// The operand expression.
        expr: Box<Expr>,
    },
    /// Binary operation combining two expressions with an operator.
    BinaryOp {
        /// The binary operator to apply.
        op: BinaryOp,
        /// The left-hand operand.
        left: Box<Expr>,
        /// The right-hand operand.
        right: Box<Expr>,
    },
    /// Relational comparison of two numeric expressions.
    ComparisonOp {
        /// The comparison operator to apply.
        op: ComparisonOp,
        /// The left-hand operand.
        left: Box<Expr>,
        /// The right-hand operand.
        right: Box<Expr>,
    },
    /// Function call with a name and argument list.
    FunctionCall {
        /// The name of the function to call.
        name: String,
        /// The arguments to pass to the function.
        args: Vec<Expr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-x`)
    Neg,
    /// Logical negation (`!x`)
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// Division (`/`)
    Div,
    /// Exponentiation (`^`)
    Pow,
    /// Logical conjunction (`&&`)
    And,
    /// Logical disjunction (`||`)
    Or,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessThanEq,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterThanEq,
    /// Equal (`==`)
    Eq,
    /// Not equal (`!=`)
    NotEq,
}

impl Expr {
    /// Parses an expression from text.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprParseError`] describing the first offending position
    /// when the text is not a complete, well-formed expression.
    pub fn parse(source: &str) -> Result<Self, ExprParseError> {
        parser::parse_complete(source)
    }

    /// Creates a symbol reference.
    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Creates a unary operation expression.
    #[must_use]
    pub fn unary_op(op: UnaryOp, expr: Self) -> Self {
        Self::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }

    /// Creates a binary operation expression.
    #[must_use]
    pub fn binary_op(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a comparison expression.
    #[must_use]
    pub fn comparison_op(op: ComparisonOp, left: Self, right: Self) -> Self {
        Self::ComparisonOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a function call expression.
    #[must_use]
    pub fn function_call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Returns the sum of the given expressions, or `0` when there are none.
    #[must_use]
    pub fn sum(terms: impl IntoIterator<Item = Self>) -> Self {
        terms
            .into_iter()
            .reduce(|acc, term| Self::binary_op(BinaryOp::Add, acc, term))
            .unwrap_or(Self::Number(0.0))
    }

    /// Returns the free symbols of the expression in order of first
    /// appearance. Function names are not symbols.
    #[must_use]
    pub fn symbols(&self) -> IndexSet<&str> {
        let mut symbols = IndexSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols<'a>(&'a self, symbols: &mut IndexSet<&'a str>) {
        match self {
            Self::Number(_) | Self::Boolean(_) => {}
            Self::Symbol(name) => {
                symbols.insert(name.as_str());
            }
            Self::UnaryOp { expr, .. } => expr.collect_symbols(symbols),
            Self::BinaryOp { left, right, .. } | Self::ComparisonOp { left, right, .. } => {
                left.collect_symbols(symbols);
                right.collect_symbols(symbols);
            }
            Self::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_symbols(symbols);
                }
            }
        }
    }

    /// Returns whether the expression references the given symbol.
    #[must_use]
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols().contains(name)
    }

    /// Returns a new expression in which every symbol for which `replace`
    /// returns `Some` has been replaced by the returned expression.
    #[must_use]
    pub fn replace_symbols(&self, replace: &impl Fn(&str) -> Option<Self>) -> Self {
        match self {
            Self::Number(_) | Self::Boolean(_) => self.clone(),
            Self::Symbol(name) => replace(name).unwrap_or_else(|| self.clone()),
            Self::UnaryOp { op, expr } => Self::unary_op(*op, expr.replace_symbols(replace)),
            Self::BinaryOp { op, left, right } => Self::binary_op(
                *op,
                left.replace_symbols(replace),
                right.replace_symbols(replace),
            ),
            Self::ComparisonOp { op, left, right } => Self::comparison_op(
                *op,
                left.replace_symbols(replace),
                right.replace_symbols(replace),
            ),
            Self::FunctionCall { name, args } => Self::function_call(
                name.clone(),
                args.iter().map(|arg| arg.replace_symbols(replace)).collect(),
            ),
        }
    }

    /// Substitutes symbols by the expressions given in `substitutions`.
    #[must_use]
    pub fn substitute(&self, substitutions: &HashMap<String, Self>) -> Self {
        self.replace_symbols(&|name| substitutions.get(name).cloned())
    }

    /// Renames symbols, leaving those for which `rename` returns `None`.
    #[must_use]
    pub fn rename_symbols(&self, rename: &impl Fn(&str) -> Option<String>) -> Self {
        self.replace_symbols(&|name| rename(name).map(Self::Symbol))
    }

    /// Replaces every occurrence of the symbol `old` by `new`.
    #[must_use]
    pub fn subs(&self, old: &str, new: &Self) -> Self {
        self.replace_symbols(&|name| (name == old).then(|| new.clone()))
    }

    /// Returns the expression in canonical form.
    ///
    /// Numeric expressions are expanded into a sum of monomials with like
    /// terms collected and constant sub-expressions folded. Boolean
    /// expressions keep their logical structure with each relational operand
    /// simplified.
    #[must_use]
    pub fn simplify(&self) -> Self {
        canonical::simplify(self)
    }

    /// Returns the canonical form with every comparison written as
    /// `p <op> 0`, so that comparisons that differ only in how their sides
    /// are arranged (`V > th` and `th < V`) become identical.
    #[must_use]
    pub fn normalise(&self) -> Self {
        canonical::normalise(self)
    }

    /// Evaluates the expression.
    ///
    /// Symbols are looked up with `lookup`. When `lookup` has no value for
    /// `pi` or `e` the mathematical constant is used.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] when a symbol has no value, a function is
    /// unknown or misused, or an operand has the wrong type.
    pub fn evaluate(&self, lookup: &impl Fn(&str) -> Option<f64>) -> Result<Value, EvalError> {
        eval::evaluate(self, lookup)
    }

    /// Returns whether the expression produces a boolean value.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Boolean(_)
                | Self::ComparisonOp { .. }
                | Self::UnaryOp {
                    op: UnaryOp::Not,
                    ..
                }
                | Self::BinaryOp {
                    op: BinaryOp::And | BinaryOp::Or,
                    ..
                }
        )
    }

    /// Returns the binding strength used when printing.
    const fn precedence(&self) -> u8 {
        match self {
            Self::BinaryOp { op, .. } => op.precedence(),
            Self::ComparisonOp { .. } => 4,
            Self::UnaryOp { op: UnaryOp::Not, .. } => 3,
            Self::UnaryOp { op: UnaryOp::Neg, .. } => 7,
            Self::Number(value) if value.is_sign_negative() => 7,
            Self::Number(_) | Self::Boolean(_) | Self::Symbol(_) | Self::FunctionCall { .. } => 9,
        }
    }

    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        let needs_parens = self.precedence() < min_precedence;
        if needs_parens {
            write!(f, "(")?;
        }

        match self {
            // adding zero normalises negative zero
            Self::Number(value) => write!(f, "{}", value + 0.0)?,
            Self::Boolean(value) => write!(f, "{value}")?,
            Self::Symbol(name) => write!(f, "{name}")?,
            Self::UnaryOp { op, expr } => {
                let (symbol, operand_precedence) = match op {
                    UnaryOp::Neg => ("-", 7),
                    UnaryOp::Not => ("!", 3),
                };
                write!(f, "{symbol}")?;
                expr.fmt_with_precedence(f, operand_precedence)?;
            }
            Self::BinaryOp { op, left, right } => {
                let precedence = op.precedence();
                if *op == BinaryOp::Pow {
                    left.fmt_with_precedence(f, precedence + 1)?;
                    write!(f, "^")?;
                    right.fmt_with_precedence(f, 7)?;
                } else {
                    left.fmt_with_precedence(f, precedence)?;
                    write!(f, " {op} ")?;
                    right.fmt_with_precedence(f, precedence + 1)?;
                }
            }
            Self::ComparisonOp { op, left, right } => {
                left.fmt_with_precedence(f, 5)?;
                write!(f, " {op} ")?;
                right.fmt_with_precedence(f, 5)?;
            }
            Self::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_with_precedence(f, 0)?;
                }
                write!(f, ")")?;
            }
        }

        if needs_parens {
            write!(f, ")")?;
        }

        Ok(())
    }
}

impl BinaryOp {
    const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div => 6,
            Self::Pow => 8,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::And => "&&",
            Self::Or => "||",
        };
        write!(f, "{symbol}")
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::LessThan => "<",
            Self::LessThanEq => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEq => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
        };
        write!(f, "{symbol}")
    }
}

impl FromStr for Expr {
    type Err = ExprParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Expr {
        Expr::parse(source).expect("expression should parse")
    }

    #[test]
    fn display_comparison() {
        let expr = parse("P3 > 0");
        assert_eq!(expr.to_string(), "P3 > 0");
    }

    #[test]
    fn display_minimal_parentheses() {
        assert_eq!(parse("(a + b) * c").to_string(), "(a + b) * c");
        assert_eq!(parse("a + (b * c)").to_string(), "a + b * c");
        assert_eq!(parse("a - (b - c)").to_string(), "a - (b - c)");
        assert_eq!(parse("(a - b) - c").to_string(), "a - b - c");
        assert_eq!(parse("-(x^2)").to_string(), "-x^2");
        assert_eq!(parse("(-x)^2").to_string(), "(-x)^2");
        assert_eq!(parse("x^-1").to_string(), "x^-1");
        assert_eq!(parse("!(a && b) || c").to_string(), "!(a && b) || c");
    }

    #[test]
    fn display_numbers() {
        assert_eq!(Expr::Number(2.0).to_string(), "2");
        assert_eq!(Expr::Number(0.04).to_string(), "0.04");
        assert_eq!(Expr::Number(-0.0).to_string(), "0");
    }

    #[test]
    fn symbols_in_order_without_functions() {
        let expr = parse("exp(V / Vt) * g + V");

        let symbols: Vec<_> = expr.symbols().into_iter().collect();

        assert_eq!(symbols, vec!["V", "Vt", "g"]);
    }

    #[test]
    fn rename_symbols_leaves_unmatched() {
        let expr = parse("a + t");

        let renamed = expr.rename_symbols(&|name| (name != "t").then(|| format!("{name}_x")));

        assert_eq!(renamed.to_string(), "a_x + t");
        // the original is untouched
        assert_eq!(expr.to_string(), "a + t");
    }

    #[test]
    fn subs_replaces_symbol() {
        let expr = parse("a * b + a");

        let replaced = expr.subs("a", &parse("c + 1"));

        assert_eq!(replaced.to_string(), "(c + 1) * b + (c + 1)");
    }

    #[test]
    fn substitute_with_map() {
        let expr = parse("x + y");
        let substitutions = HashMap::from([("y".to_string(), Expr::Number(2.0))]);

        assert_eq!(expr.substitute(&substitutions).to_string(), "x + 2");
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        assert_eq!(Expr::sum([]), Expr::Number(0.0));
        assert_eq!(
            Expr::sum([Expr::symbol("a"), Expr::symbol("b")]).to_string(),
            "a + b"
        );
    }

    #[test]
    fn boolean_detection() {
        assert!(parse("a > b").is_boolean());
        assert!(parse("!(a > b)").is_boolean());
        assert!(!parse("a + b").is_boolean());
    }
}
