use std::fmt;

/// Supplementary information attached to an error message.
///
/// # Examples
///
/// ```rust
/// use nineml_shared::error::Context;
///
/// let note = Context::Note("sub-component 'cell' declares port 'Isyn'".to_string());
/// let help = Context::Help("connect only one sender to an analog receive port".to_string());
///
/// assert_eq!(help.to_string(), "help: connect only one sender to an analog receive port");
/// # let _ = note;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Additional information about the error.
    Note(String),

    /// A suggestion for resolving the error.
    Help(String),
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note(note) => write!(f, "note: {note}"),
            Self::Help(help) => write!(f, "help: {help}"),
        }
    }
}
