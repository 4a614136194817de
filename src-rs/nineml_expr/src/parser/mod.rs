//! Parsing of expression text.
//!
//! The grammar, from lowest to highest precedence:
//!
//! ```text
//! or_expr        := and_expr (("||" | "or") and_expr)*
//! and_expr       := not_expr (("&&" | "and") not_expr)*
//! not_expr       := ("!" | "not") not_expr | comparison_expr
//! comparison     := additive (("<" | "<=" | ">" | ">=" | "==" | "!=") additive)?
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/") unary)*
//! unary          := ("-" | "+") unary | power
//! power          := primary (("^" | "**") unary)?
//! primary        := number | "true" | "false" | call | identifier | "(" or_expr ")"
//! ```

use nom::{
    IResult, Parser as NomParser,
    branch::alt,
    combinator::{all_consuming, opt, value},
    multi::{many0, separated_list0},
};
use nom_locate::LocatedSpan;

use crate::expr::{BinaryOp, ComparisonOp, Expr, UnaryOp};

mod error;
mod parser_trait;
mod token;

pub use error::{ExprParseError, ExprParseErrorReason};
use error::ExprParseErrorReason as Reason;
use parser_trait::ErrorHandlingParser;

/// Configuration for the expression parser.
///
/// Carried inside every [`InputSpan`]; currently has no options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {}

impl Config {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

/// A span of expression text together with the parser configuration.
pub type InputSpan<'a> = LocatedSpan<&'a str, Config>;

/// A result type for parser operations.
pub type Result<'a, O> = IResult<InputSpan<'a>, O, ExprParseError>;

/// A parser over [`InputSpan`] that reports [`ExprParseError`]s.
pub trait Parser<'a, O>: NomParser<InputSpan<'a>, Output = O, Error = ExprParseError> {}

impl<'a, O, P> Parser<'a, O> for P where
    P: NomParser<InputSpan<'a>, Output = O, Error = ExprParseError>
{
}

/// Parses a complete expression, failing if any input remains.
///
/// # Errors
///
/// Returns the error at the first position that could not be parsed.
pub fn parse_complete(source: &str) -> std::result::Result<Expr, ExprParseError> {
    let input = InputSpan::new_extra(source, Config::new());

    let parsed = all_consuming(|input| {
        let (rest, _) = token::whitespace(input)?;
        expr(rest)
    })
    .parse(input);

    match parsed {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => Err(error),
        Err(nom::Err::Incomplete(_)) => Err(ExprParseError::new(source.len(), Reason::ExpectExpr)),
    }
}

fn left_associative_binary_op<'a>(
    mut operand: impl Parser<'a, Expr> + Copy,
    mut operator: impl Parser<'a, (BinaryOp, &'static str)>,
) -> impl Parser<'a, Expr> {
    move |input| {
        let (rest, first_operand) = operand.parse(input)?;
        let (rest, rest_operands) = many0(|input| {
            let (rest, (op, text)) = operator.parse(input)?;
            let (rest, operand) = operand
                .or_fail_with(ExprParseError::missing_operand(text))
                .parse(rest)?;
            Ok((rest, (op, operand)))
        })
        .parse(rest)?;

        let expr = rest_operands
            .into_iter()
            .fold(first_operand, |acc, (op, operand)| {
                Expr::binary_op(op, acc, operand)
            });

        Ok((rest, expr))
    }
}

/// Parses an expression
fn expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    or_expr
        .convert_error_to(ExprParseError::expect_expr)
        .parse(input)
}

/// Parses an OR expression (lowest precedence)
fn or_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let or = value((BinaryOp::Or, "||"), token::or);
    left_associative_binary_op(and_expr, or).parse(input)
}

/// Parses an AND expression
fn and_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let and = value((BinaryOp::And, "&&"), token::and);
    left_associative_binary_op(not_expr, and).parse(input)
}

/// Parses a NOT expression
fn not_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    alt((
        |input| {
            let (rest, _) = token::bang(input)?;
            let (rest, operand) = not_expr
                .or_fail_with(ExprParseError::missing_operand("!"))
                .parse(rest)?;
            Ok((rest, Expr::unary_op(UnaryOp::Not, operand)))
        },
        comparison_expr,
    ))
    .parse(input)
}

/// Parses a comparison expression
fn comparison_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let mut op = alt((
        value((ComparisonOp::LessThanEq, "<="), token::less_than_equals),
        value((ComparisonOp::GreaterThanEq, ">="), token::greater_than_equals),
        value((ComparisonOp::LessThan, "<"), token::less_than),
        value((ComparisonOp::GreaterThan, ">"), token::greater_than),
        value((ComparisonOp::Eq, "=="), token::equals_equals),
        value((ComparisonOp::NotEq, "!="), token::bang_equals),
    ));

    let (rest, first_operand) = additive_expr.parse(input)?;
    let (rest, second_operand) = opt(|input| {
        let (rest, (op, text)) = op.parse(input)?;
        let (rest, operand) = additive_expr
            .or_fail_with(ExprParseError::missing_operand(text))
            .parse(rest)?;
        Ok((rest, (op, operand)))
    })
    .parse(rest)?;

    let expr = match second_operand {
        Some((op, second_operand)) => Expr::comparison_op(op, first_operand, second_operand),
        None => first_operand,
    };

    Ok((rest, expr))
}

/// Parses an additive expression
fn additive_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let op = alt((
        value((BinaryOp::Add, "+"), token::plus),
        value((BinaryOp::Sub, "-"), token::minus),
    ));

    left_associative_binary_op(multiplicative_expr, op).parse(input)
}

/// Parses a multiplicative expression
fn multiplicative_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let op = alt((
        value((BinaryOp::Mul, "*"), token::star),
        value((BinaryOp::Div, "/"), token::slash),
    ));

    left_associative_binary_op(unary_expr, op).parse(input)
}

/// Parses a negation or unary plus
fn unary_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    alt((
        |input| {
            let (rest, _) = token::minus(input)?;
            let (rest, operand) = unary_expr
                .or_fail_with(ExprParseError::missing_operand("-"))
                .parse(rest)?;
            Ok((rest, Expr::unary_op(UnaryOp::Neg, operand)))
        },
        |input| {
            let (rest, _) = token::plus(input)?;
            unary_expr
                .or_fail_with(ExprParseError::missing_operand("+"))
                .parse(rest)
        },
        power_expr,
    ))
    .parse(input)
}

/// Parses an exponential expression (right associative)
fn power_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let (rest, base) = primary_expr.parse(input)?;
    let (rest, exponent) = opt(|input| {
        let (rest, _) = token::caret(input)?;
        unary_expr
            .or_fail_with(ExprParseError::missing_operand("^"))
            .parse(rest)
    })
    .parse(rest)?;

    let expr = match exponent {
        Some(exponent) => Expr::binary_op(BinaryOp::Pow, base, exponent),
        None => base,
    };

    Ok((rest, expr))
}

/// Parses a primary expression (literals, identifiers, function calls,
/// parenthesized expressions)
fn primary_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    alt((
        number_literal,
        value(Expr::Boolean(true), token::true_),
        value(Expr::Boolean(false), token::false_),
        function_call,
        |input| {
            let (rest, name) = token::identifier(input)?;
            Ok((rest, Expr::symbol(*name.fragment())))
        },
        parenthesized_expr,
    ))
    .parse(input)
}

fn number_literal(input: InputSpan<'_>) -> Result<'_, Expr> {
    let (rest, lexeme) = token::number(input)?;

    match lexeme.fragment().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok((rest, Expr::Number(number))),
        Ok(_) | Err(_) => Err(nom::Err::Failure(ExprParseError::new(
            lexeme.location_offset(),
            Reason::InvalidNumber,
        ))),
    }
}

/// Parses a function call
fn function_call(input: InputSpan<'_>) -> Result<'_, Expr> {
    let (rest, name) = token::identifier(input)?;
    let (rest, paren_left) = token::paren_left(rest)?;
    let (rest, args) = separated_list0(token::comma, expr).parse(rest)?;
    let (rest, _) = token::paren_right
        .or_fail_with(ExprParseError::unclosed_paren(paren_left.location_offset()))
        .parse(rest)?;

    Ok((rest, Expr::function_call(*name.fragment(), args)))
}

/// Parses a parenthesized expression
fn parenthesized_expr(input: InputSpan<'_>) -> Result<'_, Expr> {
    let (rest, paren_left) = token::paren_left(input)?;
    let (rest, expr) = expr.or_fail_with(|error| error).parse(rest)?;
    let (rest, _) = token::paren_right
        .or_fail_with(ExprParseError::unclosed_paren(paren_left.location_offset()))
        .parse(rest)?;

    Ok((rest, expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_number() {
        let expr = parse_complete("42").expect("should parse");
        assert_eq!(expr, Expr::Number(42.0));
    }

    #[test]
    fn precedence_of_arithmetic() {
        let expr = parse_complete("2 + 3 * 4").expect("should parse");

        assert_eq!(
            expr,
            Expr::binary_op(
                BinaryOp::Add,
                Expr::Number(2.0),
                Expr::binary_op(BinaryOp::Mul, Expr::Number(3.0), Expr::Number(4.0)),
            )
        );
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse_complete("a^b^c").expect("should parse");

        assert_eq!(
            expr,
            Expr::binary_op(
                BinaryOp::Pow,
                Expr::symbol("a"),
                Expr::binary_op(BinaryOp::Pow, Expr::symbol("b"), Expr::symbol("c")),
            )
        );
    }

    #[test]
    fn negation_binds_looser_than_power() {
        let expr = parse_complete("-x**2").expect("should parse");

        assert_eq!(
            expr,
            Expr::unary_op(
                UnaryOp::Neg,
                Expr::binary_op(BinaryOp::Pow, Expr::symbol("x"), Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn trigger_condition() {
        let expr = parse_complete("V > theta && t > t_spike + tau_refrac").expect("should parse");

        assert_eq!(expr.to_string(), "V > theta && t > t_spike + tau_refrac");
    }

    #[test]
    fn keywords_and_symbols_for_logic() {
        let words = parse_complete("not a and b or c").expect("should parse");
        let symbols = parse_complete("!a && b || c").expect("should parse");

        assert_eq!(words, symbols);
    }

    #[test]
    fn function_call_with_arguments() {
        let expr = parse_complete("atan2(y, x) + exp(-V)").expect("should parse");

        assert_eq!(expr.to_string(), "atan2(y, x) + exp(-V)");
    }

    #[test]
    fn leading_and_trailing_whitespace() {
        let expr = parse_complete("  a +\n b  ").expect("should parse");

        assert_eq!(expr.to_string(), "a + b");
    }

    #[test]
    fn missing_operand_is_reported() {
        let error = parse_complete("a + ").expect_err("should fail");

        assert_eq!(
            error.reason(),
            ExprParseErrorReason::MissingOperand { operator: "+" }
        );
        assert_eq!(error.offset(), 4);
    }

    #[test]
    fn unclosed_paren_is_reported() {
        let error = parse_complete("(a + b").expect_err("should fail");

        assert_eq!(
            error.reason(),
            ExprParseErrorReason::UnclosedParen { open_offset: 0 }
        );
    }

    #[test]
    fn trailing_input_is_reported() {
        let error = parse_complete("a b").expect_err("should fail");

        assert_eq!(error.reason(), ExprParseErrorReason::TrailingInput);
        assert_eq!(error.offset(), 2);
    }

    #[test]
    fn empty_input_expects_expression() {
        let error = parse_complete("").expect_err("should fail");

        assert_eq!(error.reason(), ExprParseErrorReason::ExpectExpr);
    }
}
