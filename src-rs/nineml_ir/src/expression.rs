//! Expression-bearing elements and the traits shared with their
//! namespace-qualified views.

use std::{borrow::Cow, convert::Infallible, fmt};

use indexmap::IndexSet;
use nineml_expr::{Expr, ExprParseError};
use nineml_shared::error::{AsNineMLError, Context, ErrorLocation};

/// An element that carries a right-hand-side expression.
pub trait ExpressionElement {
    /// Returns the right-hand side.
    fn rhs(&self) -> Cow<'_, Expr>;

    /// Returns the free symbols of the right-hand side.
    fn rhs_symbols(&self) -> IndexSet<String> {
        self.rhs()
            .symbols()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// An expression element that also names the quantity it defines.
pub trait Assignment: ExpressionElement {
    /// Returns the name being defined (alias name or state variable).
    fn lhs(&self) -> Cow<'_, str>;
}

/// In-place editing of an expression element.
///
/// Plain elements never fail (`Error = Infallible`). Namespace-qualified
/// views always fail, leaving the underlying element untouched.
pub trait ExpressionEdit {
    /// The error returned when the element cannot be edited.
    type Error;

    /// Replaces the right-hand side.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the element is read-only.
    fn set_rhs(&mut self, rhs: Expr) -> Result<(), Self::Error>;

    /// Replaces every occurrence of `old` in the right-hand side by `new`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the element is read-only.
    fn subs(&mut self, old: &str, new: &Expr) -> Result<(), Self::Error>;

    /// Renames right-hand-side symbols for which `rename` returns a name.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the element is read-only.
    fn rhs_name_transform_inplace(
        &mut self,
        rename: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), Self::Error>;
}

/// In-place editing of the left-hand side of an assignment.
pub trait AssignmentEdit: ExpressionEdit {
    /// Replaces the left-hand side.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the element is read-only.
    fn set_lhs(&mut self, lhs: String) -> Result<(), Self::Error>;

    /// Renames the left-hand side if `rename` returns a name for it.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the element is read-only.
    fn lhs_name_transform_inplace(
        &mut self,
        rename: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), Self::Error>;
}

/// Expression text that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprTextError {
    source: String,
    error: ExprParseError,
}

impl ExprTextError {
    /// Returns the text that failed to parse.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source
    }

    /// Returns the parse error.
    #[must_use]
    pub const fn error(&self) -> &ExprParseError {
        &self.error
    }
}

impl fmt::Display for ExprTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid expression `{}`: {}", self.source, self.error)
    }
}

impl AsNineMLError for ExprTextError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn error_location(&self, source: &str) -> Option<ErrorLocation> {
        self.error.error_location(source)
    }

    fn context_with_source(&self, source: &str) -> Vec<(Context, Option<ErrorLocation>)> {
        self.error.context_with_source(source)
    }
}

/// Values accepted wherever an expression is expected: an [`Expr`] or its
/// textual form.
pub trait IntoExpr {
    /// Converts `self` into an expression.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprTextError`] for malformed expression text.
    fn into_expr(self) -> Result<Expr, ExprTextError>;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Result<Expr, ExprTextError> {
        Ok(self)
    }
}

impl IntoExpr for &str {
    fn into_expr(self) -> Result<Expr, ExprTextError> {
        Expr::parse(self).map_err(|error| ExprTextError {
            source: self.to_string(),
            error,
        })
    }
}

impl IntoExpr for &String {
    fn into_expr(self) -> Result<Expr, ExprTextError> {
        self.as_str().into_expr()
    }
}

impl IntoExpr for f64 {
    fn into_expr(self) -> Result<Expr, ExprTextError> {
        Ok(Expr::Number(self))
    }
}

macro_rules! impl_expression_element {
    ($ty:ty, $lhs:ident) => {
        impl ExpressionElement for $ty {
            fn rhs(&self) -> Cow<'_, Expr> {
                Cow::Borrowed(&self.rhs)
            }
        }

        impl Assignment for $ty {
            fn lhs(&self) -> Cow<'_, str> {
                Cow::Borrowed(&self.$lhs)
            }
        }

        impl ExpressionEdit for $ty {
            type Error = Infallible;

            fn set_rhs(&mut self, rhs: Expr) -> Result<(), Self::Error> {
                self.rhs = rhs;
                Ok(())
            }

            fn subs(&mut self, old: &str, new: &Expr) -> Result<(), Self::Error> {
                self.rhs = self.rhs.subs(old, new);
                Ok(())
            }

            fn rhs_name_transform_inplace(
                &mut self,
                rename: &dyn Fn(&str) -> Option<String>,
            ) -> Result<(), Self::Error> {
                self.rhs = self.rhs.rename_symbols(&rename);
                Ok(())
            }
        }

        impl AssignmentEdit for $ty {
            fn set_lhs(&mut self, lhs: String) -> Result<(), Self::Error> {
                self.$lhs = lhs;
                Ok(())
            }

            fn lhs_name_transform_inplace(
                &mut self,
                rename: &dyn Fn(&str) -> Option<String>,
            ) -> Result<(), Self::Error> {
                if let Some(renamed) = rename(&self.$lhs) {
                    self.$lhs = renamed;
                }
                Ok(())
            }
        }
    };
}

/// A named intermediate quantity, `name := rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    name: String,
    rhs: Expr,
}

impl Alias {
    /// Creates a new alias.
    #[must_use]
    pub fn new(name: impl Into<String>, rhs: Expr) -> Self {
        Self {
            name: name.into(),
            rhs,
        }
    }

    /// Returns the alias name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl_expression_element!(Alias, name);

/// The rate of change of a state variable, `d(variable)/dt = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDerivative {
    variable: String,
    rhs: Expr,
}

impl TimeDerivative {
    /// Creates a new time derivative.
    #[must_use]
    pub fn new(variable: impl Into<String>, rhs: Expr) -> Self {
        Self {
            variable: variable.into(),
            rhs,
        }
    }

    /// Returns the name of the state variable being differentiated.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl_expression_element!(TimeDerivative, variable);

/// An instantaneous update of a state variable during a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAssignment {
    variable: String,
    rhs: Expr,
}

impl StateAssignment {
    /// Creates a new state assignment.
    #[must_use]
    pub fn new(variable: impl Into<String>, rhs: Expr) -> Self {
        Self {
            variable: variable.into(),
            rhs,
        }
    }

    /// Returns the name of the state variable being assigned.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl_expression_element!(StateAssignment, variable);

/// The boolean condition of an on-condition transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    rhs: Expr,
}

impl Trigger {
    /// Creates a new trigger.
    #[must_use]
    pub const fn new(rhs: Expr) -> Self {
        Self { rhs }
    }
}

impl ExpressionElement for Trigger {
    fn rhs(&self) -> Cow<'_, Expr> {
        Cow::Borrowed(&self.rhs)
    }
}

impl ExpressionEdit for Trigger {
    type Error = Infallible;

    fn set_rhs(&mut self, rhs: Expr) -> Result<(), Self::Error> {
        self.rhs = rhs;
        Ok(())
    }

    fn subs(&mut self, old: &str, new: &Expr) -> Result<(), Self::Error> {
        self.rhs = self.rhs.subs(old, new);
        Ok(())
    }

    fn rhs_name_transform_inplace(
        &mut self,
        rename: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), Self::Error> {
        self.rhs = self.rhs.rename_symbols(&rename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        Expr::parse(source).expect("expression should parse")
    }

    #[test]
    fn alias_edits() {
        let mut alias = Alias::new("I", expr("g * (V - E)"));

        let Ok(()) = alias.subs("E", &expr("E_rev"));
        assert_eq!(alias.rhs().to_string(), "g * (V - E_rev)");

        let Ok(()) = alias.lhs_name_transform_inplace(&|name| Some(format!("{name}_syn")));
        assert_eq!(alias.lhs(), "I_syn");
        assert_eq!(alias.name(), "I_syn");
    }

    #[test]
    fn rhs_symbols_are_owned() {
        let derivative = TimeDerivative::new("V", expr("(I - V) / tau"));
        let symbols: Vec<_> = derivative.rhs_symbols().into_iter().collect();
        assert_eq!(symbols, ["I", "V", "tau"]);
    }

    #[test]
    fn text_into_expr() {
        assert_eq!("V > theta".into_expr(), Ok(expr("V > theta")));

        let error = "V >".into_expr().expect_err("text should not parse");
        assert_eq!(error.source_text(), "V >");
        assert_eq!(error.error().offset(), 3);
    }
}
