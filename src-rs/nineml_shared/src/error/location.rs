/// Location of an error inside a piece of expression text
///
/// Expressions are single-line, but the line number is still tracked so that
/// the same type can describe multi-line sources. Line and column numbers are
/// 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    offset: usize,
    line: usize,
    column: usize,
    length: Option<usize>,
    line_source: String,
}

impl ErrorLocation {
    fn new(source: &str, offset: usize, length: Option<usize>) -> Self {
        // clamp so that an offset just past the end still maps to a column
        let offset = offset.min(source.len());

        let line_start = source[..offset]
            .rfind('\n')
            .map_or(0, |newline_idx| newline_idx + 1);

        let line = source[..offset].matches('\n').count() + 1;
        let column = source[line_start..offset].chars().count() + 1;

        let line_source = source
            .lines()
            .nth(line - 1)
            .unwrap_or_default()
            .to_string();

        Self {
            offset,
            line,
            column,
            length,
            line_source,
        }
    }

    /// Creates a new error location from source content and offset
    #[must_use]
    pub fn from_source_and_offset(source: &str, offset: usize) -> Self {
        Self::new(source, offset, None)
    }

    /// Creates a new error location from source content and span
    #[must_use]
    pub fn from_source_and_span(source: &str, offset: usize, length: usize) -> Self {
        Self::new(source, offset, Some(length.max(1)))
    }

    /// Returns the byte offset from the beginning of the source
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the line number where the error occurred (1-indexed)
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns the column number where the error occurred (1-indexed)
    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// Returns the length of the error span in characters
    #[must_use]
    pub fn length(&self) -> usize {
        // a bare offset highlights a single character
        self.length.unwrap_or(1)
    }

    /// Returns the source line where the error occurred
    #[must_use]
    pub fn line_source(&self) -> &str {
        &self.line_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_at_start() {
        let location = ErrorLocation::from_source_and_offset("V + 1", 0);

        assert_eq!(location.line(), 1);
        assert_eq!(location.column(), 1);
        assert_eq!(location.line_source(), "V + 1");
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let location = ErrorLocation::from_source_and_offset("V +", 10);

        assert_eq!(location.offset(), 3);
        assert_eq!(location.column(), 4);
    }

    #[test]
    fn second_line() {
        let location = ErrorLocation::from_source_and_span("a\nb + c", 6, 1);

        assert_eq!(location.line(), 2);
        assert_eq!(location.column(), 5);
        assert_eq!(location.line_source(), "b + c");
    }
}
