//! Errors for the NineML model crates

mod context;
mod location;
mod traits;

pub use context::Context;
pub use location::ErrorLocation;
pub use traits::AsNineMLError;

/// Unified error representation for NineML
///
/// This struct represents errors in a format suitable for display to users.
/// It records the element in which the error occurred (for example
/// `Dynamics('Izhikevich')>Regime('subthreshold')`), a human-readable message,
/// and optional source location information when the error came from
/// expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NineMLError {
    /// The element path where the error occurred
    element: String,
    /// Human-readable error message
    message: String,
    /// Optional source location information for precise error reporting
    location: Option<ErrorLocation>,
    /// Additional context information
    context: Vec<Context>,
    /// Additional context information with source location
    context_with_source: Vec<(Context, ErrorLocation)>,
}

impl NineMLError {
    /// Creates a new `NineMLError` from an error that implements `AsNineMLError`
    ///
    /// This constructor creates an error without source location information.
    /// Use `from_error_with_source` when the expression text is available.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nineml_shared::error::{AsNineMLError, NineMLError};
    ///
    /// struct SimpleError(String);
    ///
    /// impl AsNineMLError for SimpleError {
    ///     fn message(&self) -> String {
    ///         self.0.clone()
    ///     }
    /// }
    ///
    /// let error = SimpleError("Something went wrong".to_string());
    /// let nineml_error = NineMLError::from_error(&error, "Dynamics('A')");
    /// assert_eq!(nineml_error.message(), "Something went wrong");
    /// ```
    pub fn from_error(error: &impl AsNineMLError, element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            message: error.message(),
            location: None,
            context: error.context(),
            context_with_source: vec![],
        }
    }

    /// Creates a new `NineMLError` from an error with the source text used
    /// for location tracking
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nineml_shared::error::{AsNineMLError, ErrorLocation, NineMLError};
    ///
    /// struct PositionalError {
    ///     offset: usize,
    /// }
    ///
    /// impl AsNineMLError for PositionalError {
    ///     fn message(&self) -> String {
    ///         "unexpected token".to_string()
    ///     }
    ///
    ///     fn error_location(&self, source: &str) -> Option<ErrorLocation> {
    ///         Some(ErrorLocation::from_source_and_offset(source, self.offset))
    ///     }
    /// }
    ///
    /// let error = PositionalError { offset: 4 };
    /// let nineml_error = NineMLError::from_error_with_source(&error, "Alias('x')", "a + * b");
    /// assert_eq!(nineml_error.location().map(ErrorLocation::column), Some(5));
    /// ```
    pub fn from_error_with_source(
        error: &impl AsNineMLError,
        element: impl Into<String>,
        source: &str,
    ) -> Self {
        let mut context = error.context();
        let mut context_with_source = vec![];

        for (context_item, location) in error.context_with_source(source) {
            match location {
                Some(location) => context_with_source.push((context_item, location)),
                None => context.push(context_item),
            }
        }

        Self {
            element: element.into(),
            message: error.message(),
            location: error.error_location(source),
            context,
            context_with_source,
        }
    }

    /// Returns the element path where the error occurred
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Returns the human-readable error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the optional source location information
    #[must_use]
    pub const fn location(&self) -> Option<&ErrorLocation> {
        self.location.as_ref()
    }

    /// Returns the context information
    #[must_use]
    pub fn context(&self) -> &[Context] {
        &self.context
    }

    /// Returns the context information that carries a source location
    #[must_use]
    pub fn context_with_source(&self) -> &[(Context, ErrorLocation)] {
        &self.context_with_source
    }
}

impl std::fmt::Display for NineMLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.element, self.message)?;

        if let Some(location) = &self.location {
            write!(f, " (column {})", location.column())?;
        }

        for context in &self.context {
            write!(f, "\n  {context}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestError;

    impl AsNineMLError for TestError {
        fn message(&self) -> String {
            "symbol 'g' is not defined".to_string()
        }

        fn context(&self) -> Vec<Context> {
            vec![Context::Help("declare 'g' as a parameter".to_string())]
        }

        fn error_location(&self, source: &str) -> Option<ErrorLocation> {
            source
                .find('g')
                .map(|offset| ErrorLocation::from_source_and_span(source, offset, 1))
        }
    }

    #[test]
    fn from_error_has_no_location() {
        let error = NineMLError::from_error(&TestError, "Alias('I')");

        assert_eq!(error.element(), "Alias('I')");
        assert_eq!(error.message(), "symbol 'g' is not defined");
        assert!(error.location().is_none());
        assert_eq!(error.context().len(), 1);
    }

    #[test]
    fn from_error_with_source_locates_symbol() {
        let error = NineMLError::from_error_with_source(&TestError, "Alias('I')", "2 * g * V");

        let location = error.location().expect("location should be present");
        assert_eq!(location.offset(), 4);
        assert_eq!(location.column(), 5);
        assert_eq!(location.length(), 1);
    }

    #[test]
    fn display_includes_help() {
        let error = NineMLError::from_error(&TestError, "Alias('I')");

        let rendered = error.to_string();

        assert_eq!(
            rendered,
            "Alias('I'): symbol 'g' is not defined\n  help: declare 'g' as a parameter"
        );
    }
}
