use nom::{Parser, error::ParseError};

/// Error-conversion helpers for parsers.
///
/// Recoverable errors (`nom::Err::Error`) let an enclosing `alt` try another
/// branch; unrecoverable ones (`nom::Err::Failure`) abort the parse. These
/// methods convert between the two while preserving any failure that has
/// already been reported.
pub trait ErrorHandlingParser<I, O, E>: Parser<I, Output = O, Error = E>
where
    E: ParseError<I>,
{
    /// Converts recoverable errors using `convert_error`, passing failures
    /// through unchanged.
    fn convert_error_to<E2>(
        mut self,
        convert_error: impl Fn(E) -> E2,
    ) -> impl Parser<I, Output = O, Error = E2>
    where
        Self: Sized,
        E2: ParseError<I> + From<E>,
    {
        move |input| {
            self.parse(input).map_err(|e| match e {
                nom::Err::Error(e) => nom::Err::Error(convert_error(e)),
                nom::Err::Failure(e) => nom::Err::Failure(e.into()),
                nom::Err::Incomplete(e) => nom::Err::Incomplete(e),
            })
        }
    }

    /// Turns recoverable errors into failures built by `convert_error`.
    ///
    /// Used once a parser has committed, for example after an operator has
    /// been read and its operand is missing.
    fn or_fail_with<E2>(
        mut self,
        convert_error: impl Fn(E) -> E2,
    ) -> impl Parser<I, Output = O, Error = E2>
    where
        Self: Sized,
        E2: ParseError<I> + From<E>,
    {
        move |input| {
            self.parse(input).map_err(|e| match e {
                nom::Err::Error(e) => nom::Err::Failure(convert_error(e)),
                nom::Err::Failure(e) => nom::Err::Failure(e.into()),
                nom::Err::Incomplete(e) => nom::Err::Incomplete(e),
            })
        }
    }
}

impl<I, O, E, P> ErrorHandlingParser<I, O, E> for P
where
    P: Parser<I, Output = O, Error = E>,
    E: ParseError<I>,
{
}
