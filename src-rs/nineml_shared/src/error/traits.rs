use crate::error::{Context, ErrorLocation};

/// Trait for types that can be converted to NineML error messages.
///
/// Every error type in the workspace implements this trait so that errors
/// from the expression parser, the component validators and the composite
/// builder can all be rendered through [`NineMLError`](super::NineMLError).
pub trait AsNineMLError {
    /// Returns the primary error message.
    fn message(&self) -> String;

    /// Returns additional context information about the error.
    ///
    /// Returns an empty vector if no context is available.
    fn context(&self) -> Vec<Context> {
        vec![]
    }

    /// Returns the location of the error in the given expression source.
    ///
    /// Only errors produced while reading expression text have a location.
    fn error_location(&self, source: &str) -> Option<ErrorLocation> {
        let _ = source;
        None
    }

    /// Returns context items that may point at a location in the source.
    fn context_with_source(&self, source: &str) -> Vec<(Context, Option<ErrorLocation>)> {
        let _ = source;
        vec![]
    }
}
