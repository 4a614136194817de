//! Errors raised while rebuilding elements from their parts.

use std::fmt;

use nineml_multi::MultiDynamicsError;
use nineml_shared::error::{AsNineMLError, Context};

use crate::ElementKind;

/// An element could not be rebuilt from its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildError {
    /// A declared attribute was not supplied.
    MissingAttribute {
        /// The kind being rebuilt
        kind: ElementKind,
        /// The attribute name
        attribute: &'static str,
    },
    /// An attribute was supplied with the wrong type of value.
    AttributeType {
        /// The kind being rebuilt
        kind: ElementKind,
        /// The attribute name
        attribute: &'static str,
    },
    /// A required singular child was not supplied.
    MissingChild {
        /// The kind being rebuilt
        kind: ElementKind,
        /// The child slot
        child: &'static str,
    },
    /// A child of the wrong kind was supplied.
    ChildKind {
        /// The kind being rebuilt
        kind: ElementKind,
        /// The child slot
        child: &'static str,
        /// The kind found in the slot
        found: ElementKind,
    },
    /// The result has a different kind than requested.
    UnexpectedKind {
        /// The requested kind
        expected: ElementKind,
        /// The kind produced
        found: ElementKind,
    },
    /// A composite could not be rebuilt from its sub-components.
    Composite(MultiDynamicsError),
}

impl fmt::Display for RebuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute { kind, attribute } => {
                write!(f, "{kind} is missing its '{attribute}' attribute")
            }
            Self::AttributeType { kind, attribute } => {
                write!(f, "'{attribute}' attribute of {kind} has the wrong type")
            }
            Self::MissingChild { kind, child } => {
                write!(f, "{kind} is missing its '{child}' child")
            }
            Self::ChildKind { kind, child, found } => {
                write!(f, "'{child}' child of {kind} cannot hold a {found}")
            }
            Self::UnexpectedKind { expected, found } => {
                write!(f, "expected a {expected}, found a {found}")
            }
            Self::Composite(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for RebuildError {}

impl AsNineMLError for RebuildError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        match self {
            Self::Composite(error) => error.context(),
            Self::MissingAttribute { kind, .. }
            | Self::AttributeType { kind, .. }
            | Self::MissingChild { kind, .. }
            | Self::ChildKind { kind, .. } => {
                let schema = kind.schema();
                vec![Context::Note(format!(
                    "{kind} declares the attributes {}",
                    schema.attributes().join(", ")
                ))]
            }
            Self::UnexpectedKind { .. } => vec![],
        }
    }
}

impl From<MultiDynamicsError> for RebuildError {
    fn from(error: MultiDynamicsError) -> Self {
        Self::Composite(error)
    }
}
