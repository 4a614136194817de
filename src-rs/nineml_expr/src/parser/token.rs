//! Tokens of the expression language.
//!
//! Every token parser consumes the whitespace that follows it, so grammar
//! rules never need to deal with whitespace themselves.

use nom::{
    Parser as _,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{not, opt, recognize, verify},
};

use super::{InputSpan, Parser, Result};

/// Words that cannot be used as identifiers.
pub const KEYWORDS: &[&str] = &["and", "or", "not", "true", "false"];

/// Consumes any amount of whitespace, including newlines.
pub fn whitespace(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    multispace0(input)
}

/// Wraps a parser so that it returns the recognized lexeme and consumes the
/// whitespace after it.
pub fn token<'a, O>(mut f: impl Parser<'a, O>) -> impl Parser<'a, InputSpan<'a>> {
    move |input| {
        let f = |input| (&mut f).parse(input);
        let (rest, lexeme) = recognize(f).parse(input)?;
        let (rest, _) = whitespace(rest)?;
        Ok((rest, lexeme))
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parses a keyword, making sure it is not the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl Parser<'a, InputSpan<'a>> {
    token((tag(word), not(satisfy(is_identifier_char))))
}

/// Parses an identifier (alphabetic or underscore, then alphanumeric or underscore).
pub fn identifier(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    verify(
        token((
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_identifier_char),
        )),
        |lexeme: &InputSpan<'_>| !KEYWORDS.contains(lexeme.fragment()),
    )
    .parse(input)
}

/// Parses a decimal number literal such as `3`, `0.04`, `.5` or `1e-3`.
pub fn number(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    let mantissa = alt((
        recognize((digit1, opt((char('.'), digit0)))),
        recognize((char('.'), digit1)),
    ));
    let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));

    token((mantissa, exponent)).parse(input)
}

/// Parses the `true` keyword.
pub fn true_(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    keyword("true").parse(input)
}

/// Parses the `false` keyword.
pub fn false_(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    keyword("false").parse(input)
}

/// Parses `&&` or the `and` keyword.
pub fn and(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    alt((token(tag("&&")), keyword("and"))).parse(input)
}

/// Parses `||` or the `or` keyword.
pub fn or(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    alt((token(tag("||")), keyword("or"))).parse(input)
}

/// Parses `!` (but not `!=`) or the `not` keyword.
pub fn bang(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    alt((token((char('!'), not(char('=')))), keyword("not"))).parse(input)
}

/// Parses the `+` symbol.
pub fn plus(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('+')).parse(input)
}

/// Parses the `-` symbol.
pub fn minus(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('-')).parse(input)
}

/// Parses the `*` symbol (but not `**`).
pub fn star(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token((char('*'), not(char('*')))).parse(input)
}

/// Parses the `/` symbol.
pub fn slash(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('/')).parse(input)
}

/// Parses the power operator, written `^` or `**`.
pub fn caret(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    alt((token(char('^')), token(tag("**")))).parse(input)
}

/// Parses the `<=` symbol.
pub fn less_than_equals(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(tag("<=")).parse(input)
}

/// Parses the `>=` symbol.
pub fn greater_than_equals(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(tag(">=")).parse(input)
}

/// Parses the `<` symbol.
pub fn less_than(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('<')).parse(input)
}

/// Parses the `>` symbol.
pub fn greater_than(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('>')).parse(input)
}

/// Parses the `==` symbol.
pub fn equals_equals(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(tag("==")).parse(input)
}

/// Parses the `!=` symbol.
pub fn bang_equals(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(tag("!=")).parse(input)
}

/// Parses the `(` symbol.
pub fn paren_left(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char('(')).parse(input)
}

/// Parses the `)` symbol.
pub fn paren_right(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char(')')).parse(input)
}

/// Parses the `,` symbol.
pub fn comma(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    token(char(',')).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Config;

    fn span(source: &str) -> InputSpan<'_> {
        InputSpan::new_extra(source, Config::default())
    }

    #[test]
    fn identifier_consumes_trailing_whitespace() {
        let (rest, lexeme) = identifier(span("V_cell  + 1")).expect("should parse identifier");

        assert_eq!(lexeme.fragment(), &"V_cell");
        assert_eq!(rest.fragment(), &"+ 1");
    }

    #[test]
    fn identifier_rejects_keyword() {
        assert!(identifier(span("and x")).is_err());
        // a keyword prefix is still an identifier
        let (_, lexeme) = identifier(span("android")).expect("should parse identifier");
        assert_eq!(lexeme.fragment(), &"android");
    }

    #[test]
    fn number_forms() {
        for source in ["3", "0.04", ".5", "1e-3", "2.5E+2"] {
            let (rest, lexeme) = number(span(source)).expect("should parse number");
            assert_eq!(lexeme.fragment(), &source);
            assert_eq!(rest.fragment(), &"");
        }
    }

    #[test]
    fn star_is_not_power() {
        assert!(star(span("** 2")).is_err());
        let (rest, _) = caret(span("** 2")).expect("should parse power");
        assert_eq!(rest.fragment(), &"2");
    }

    #[test]
    fn bang_is_not_not_equals() {
        assert!(bang(span("!= 2")).is_err());
        assert!(bang(span("!x")).is_ok());
    }
}
