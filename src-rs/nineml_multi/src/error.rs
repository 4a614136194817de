//! Errors raised while composing and inspecting composites.

use std::fmt;

use nineml_ir::{DocumentError, NameError, PortKind, ValidationErrors};
use nineml_shared::error::{AsNineMLError, Context};

/// A composite could not be built.
///
/// Construction stops at the first of these; a composite is never returned
/// in a partially valid state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiDynamicsError {
    /// Two sub-components share a name.
    DuplicateSubComponent {
        /// The shared name
        name: String,
        /// The composite name
        composite: String,
    },
    /// A connection or exposure names a sub-component that does not exist.
    UnknownSubComponent {
        /// The missing sub-component
        name: String,
        /// The composite name
        composite: String,
    },
    /// A connection or exposure names a port that does not exist.
    UnknownPort(NameError),
    /// A sub-component reference could not be resolved.
    Document(DocumentError),
    /// More than one writer targets a single-writer analog receive port.
    DuplicateTarget {
        /// The receive port name
        port: String,
        /// The sub-component owning the port
        sub_component: String,
        /// The composite name
        composite: String,
    },
    /// The two ports of a connection have no synthesis rule.
    UnsupportedConnectionKind {
        /// The sending sub-component and port, as `port` of `sub-component`
        sender: String,
        /// The kind of the sending port
        send_kind: PortKind,
        /// The receiving sub-component and port
        receiver: String,
        /// The kind of the receiving port
        receive_kind: PortKind,
    },
    /// Two port exposures share a name.
    DuplicateExposure {
        /// The shared name
        name: String,
        /// The composite name
        composite: String,
    },
    /// The cross product of the sub-component regimes is too large.
    TooManyRegimes {
        /// The composite name
        composite: String,
        /// The largest number of regimes allowed
        limit: usize,
    },
    /// The flattened composite failed validation.
    Invalid(ValidationErrors),
}

impl fmt::Display for MultiDynamicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSubComponent { name, composite } => write!(
                f,
                "sub-component '{name}' is defined more than once in '{composite}'"
            ),
            Self::UnknownSubComponent { name, composite } => {
                write!(f, "'{composite}' has no sub-component named '{name}'")
            }
            Self::UnknownPort(error) => write!(f, "{error}"),
            Self::Document(error) => write!(f, "{error}"),
            Self::DuplicateTarget {
                port,
                sub_component,
                composite,
            } => write!(
                f,
                "Multiple connections to receive port '{port}' in '{sub_component}' sub-component of '{composite}'"
            ),
            Self::UnsupportedConnectionKind {
                sender,
                send_kind,
                receiver,
                receive_kind,
            } => write!(
                f,
                "cannot connect {send_kind} {sender} to {receive_kind} {receiver}"
            ),
            Self::DuplicateExposure { name, composite } => write!(
                f,
                "port exposure '{name}' is defined more than once in '{composite}'"
            ),
            Self::TooManyRegimes { composite, limit } => write!(
                f,
                "'{composite}' would have more than {limit} composite regimes"
            ),
            Self::Invalid(errors) => write!(f, "{errors}"),
        }
    }
}

impl std::error::Error for MultiDynamicsError {}

impl AsNineMLError for MultiDynamicsError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        match self {
            Self::DuplicateTarget { .. } => vec![Context::Help(
                "connect several senders through an analog reduce port instead".to_string(),
            )],
            Self::UnsupportedConnectionKind { .. } => vec![Context::Note(
                "analog send ports connect to analog receive or reduce ports, event send ports to event receive ports"
                    .to_string(),
            )],
            Self::TooManyRegimes { .. } => vec![Context::Note(
                "a composite has one regime for every combination of sub-component regimes"
                    .to_string(),
            )],
            Self::Document(error) => error.context(),
            Self::DuplicateSubComponent { .. }
            | Self::UnknownSubComponent { .. }
            | Self::UnknownPort(_)
            | Self::DuplicateExposure { .. }
            | Self::Invalid(_) => vec![],
        }
    }
}

impl From<NameError> for MultiDynamicsError {
    fn from(error: NameError) -> Self {
        Self::UnknownPort(error)
    }
}

impl From<DocumentError> for MultiDynamicsError {
    fn from(error: DocumentError) -> Self {
        Self::Document(error)
    }
}

impl From<ValidationErrors> for MultiDynamicsError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid(errors)
    }
}

/// An edit was attempted through a namespace-qualified view.
///
/// Qualified expressions belong to the composite's global namespace and are
/// read-only; edits are made on the sub-component, after which the composite
/// is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableError {
    element: String,
    sub_component: String,
}

impl ImmutableError {
    /// Creates a new immutable-write error.
    #[must_use]
    pub fn new(element: impl Into<String>, sub_component: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            sub_component: sub_component.into(),
        }
    }

    /// Returns the qualified name of the element.
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }
}

impl fmt::Display for ImmutableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot change expression in global namespace: '{}' must be edited in sub-component '{}'",
            self.element, self.sub_component
        )
    }
}

impl std::error::Error for ImmutableError {}

impl AsNineMLError for ImmutableError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        vec![Context::Help(
            "edit the sub-component and rebuild the composite".to_string(),
        )]
    }
}

/// A port exposure was inspected before it was bound to its port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotBoundError {
    exposure: String,
}

impl NotBoundError {
    /// Creates a new not-bound error for the exposure called `exposure`.
    #[must_use]
    pub fn new(exposure: impl Into<String>) -> Self {
        Self {
            exposure: exposure.into(),
        }
    }
}

impl fmt::Display for NotBoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port exposure '{}' is not bound", self.exposure)
    }
}

impl std::error::Error for NotBoundError {}

impl AsNineMLError for NotBoundError {
    fn message(&self) -> String {
        self.to_string()
    }
}
