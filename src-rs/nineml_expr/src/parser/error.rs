//! Errors produced while reading expression text

use std::fmt;

use nineml_shared::error::{AsNineMLError, Context, ErrorLocation};
use nom::error::{ErrorKind, ParseError};

use super::InputSpan;

/// An error that occurred while parsing an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprParseError {
    /// The byte offset in the source where the error occurred
    offset: usize,
    /// The reason for the error
    reason: ExprParseErrorReason,
}

/// The reason an expression failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprParseErrorReason {
    /// An expression was expected
    ExpectExpr,
    /// An operator was not followed by its operand
    MissingOperand {
        /// The operator text
        operator: &'static str,
    },
    /// A parenthesis opened at the given offset was never closed
    UnclosedParen {
        /// Offset of the opening parenthesis
        open_offset: usize,
    },
    /// A numeric literal could not be represented
    InvalidNumber,
    /// Input remained after a complete expression
    TrailingInput,
    /// A low-level nom parsing error
    NomError(ErrorKind),
}

impl ExprParseError {
    pub(crate) const fn new(offset: usize, reason: ExprParseErrorReason) -> Self {
        Self { offset, reason }
    }

    /// Creates an error for an operator with no operand after it
    pub(crate) fn missing_operand(operator: &'static str) -> impl Fn(Self) -> Self {
        move |error| Self::new(error.offset, ExprParseErrorReason::MissingOperand { operator })
    }

    /// Creates an error for a parenthesis that is never closed
    pub(crate) fn unclosed_paren(open_offset: usize) -> impl Fn(Self) -> Self {
        move |error| Self::new(error.offset, ExprParseErrorReason::UnclosedParen { open_offset })
    }

    /// Converts a generic error into an "expected an expression" error
    pub(crate) const fn expect_expr(error: Self) -> Self {
        Self::new(error.offset, ExprParseErrorReason::ExpectExpr)
    }

    /// Returns the byte offset of the error
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the reason for the error
    #[must_use]
    pub const fn reason(&self) -> ExprParseErrorReason {
        self.reason
    }
}

impl<'a> ParseError<InputSpan<'a>> for ExprParseError {
    fn from_error_kind(input: InputSpan<'a>, kind: ErrorKind) -> Self {
        let reason = match kind {
            ErrorKind::Eof => ExprParseErrorReason::TrailingInput,
            other => ExprParseErrorReason::NomError(other),
        };
        Self::new(input.location_offset(), reason)
    }

    fn append(_input: InputSpan<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl fmt::Display for ExprParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ExprParseErrorReason::ExpectExpr => write!(f, "expected an expression"),
            ExprParseErrorReason::MissingOperand { operator } => {
                write!(f, "expected an operand after `{operator}`")
            }
            ExprParseErrorReason::UnclosedParen { .. } => write!(f, "unclosed parenthesis"),
            ExprParseErrorReason::InvalidNumber => write!(f, "invalid number literal"),
            ExprParseErrorReason::TrailingInput => {
                write!(f, "unexpected input after the end of the expression")
            }
            ExprParseErrorReason::NomError(kind) => {
                write!(f, "unexpected input ({})", kind.description())
            }
        }
    }
}

impl AsNineMLError for ExprParseError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn error_location(&self, source: &str) -> Option<ErrorLocation> {
        Some(ErrorLocation::from_source_and_offset(source, self.offset))
    }

    fn context_with_source(&self, source: &str) -> Vec<(Context, Option<ErrorLocation>)> {
        match self.reason {
            ExprParseErrorReason::UnclosedParen { open_offset } => vec![(
                Context::Note("parenthesis opened here".to_string()),
                Some(ErrorLocation::from_source_and_span(source, open_offset, 1)),
            )],
            ExprParseErrorReason::ExpectExpr
            | ExprParseErrorReason::MissingOperand { .. }
            | ExprParseErrorReason::InvalidNumber
            | ExprParseErrorReason::TrailingInput
            | ExprParseErrorReason::NomError(_) => vec![],
        }
    }
}
