//! Component validators.
//!
//! Each validator inspects a built [`Dynamics`] and returns the problems it
//! finds. [`validate`] runs all of them and collects every problem before
//! failing, so that one pass reports everything wrong with a component.

mod aliases;
mod names;
mod ports;
mod symbols;

use std::{fmt, ops::Deref};

use nineml_shared::error::{AsNineMLError, Context, ErrorLocation};

use crate::{Dynamics, expression::ExprTextError, port::PortKind};

pub use aliases::{alias_dependencies, check_recursive_aliases};
pub use names::{MULTI_REGIME_SEPARATOR, check_duplicate_names, check_reserved_names};
pub use ports::check_send_ports;
pub use symbols::check_unresolved_symbols;

/// A problem with a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Expression text could not be parsed.
    InvalidExpression {
        /// Description of the element holding the expression
        element: String,
        /// The parse failure
        error: ExprTextError,
    },
    /// Two elements share a name.
    DuplicateName {
        /// The shared name
        name: String,
        /// The kind of the first element
        first: &'static str,
        /// The kind of the second element
        second: &'static str,
    },
    /// An element uses a reserved identifier as its name.
    ReservedName {
        /// The reserved name
        name: String,
        /// The kind of the element
        kind: &'static str,
    },
    /// An element other than a regime has the composite regime separator in
    /// its name.
    SeparatorInName {
        /// The name
        name: String,
        /// The kind of the element
        kind: &'static str,
    },
    /// A right-hand side refers to a name that is not defined.
    UnresolvedSymbol {
        /// The undefined name
        symbol: String,
        /// Description of the element referring to it
        element: String,
    },
    /// A transition refers to a port that does not exist.
    UndefinedPort {
        /// The port name
        port: String,
        /// The kind of port required
        expected: PortKind,
        /// Description of the element referring to it
        element: String,
    },
    /// A transition targets a regime that does not exist.
    UndefinedRegime {
        /// The target regime name
        target: String,
        /// The regime the transition leaves
        source_regime: String,
    },
    /// A time derivative or state assignment names something that is not a
    /// state variable.
    NotAStateVariable {
        /// The name used
        name: String,
        /// Description of the element
        element: String,
    },
    /// An analog send port has no alias or state variable of the same name.
    UnbackedSendPort {
        /// The port name
        port: String,
    },
    /// Aliases refer to each other in a cycle.
    RecursiveAlias {
        /// The aliases on the cycle, starting and ending with the same name
        cycle: Vec<String>,
    },
}

impl ValidationError {
    /// Creates a duplicate-name error.
    #[must_use]
    pub fn duplicate(name: &str, first: &'static str, second: &'static str) -> Self {
        Self::DuplicateName {
            name: name.to_string(),
            first,
            second,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExpression { element, error } => write!(f, "{element}: {error}"),
            Self::DuplicateName {
                name,
                first,
                second,
            } if first == second => write!(f, "{first} '{name}' is defined more than once"),
            Self::DuplicateName {
                name,
                first,
                second,
            } => write!(f, "'{name}' is defined both as a {first} and as a {second}"),
            Self::ReservedName { name, kind } => {
                write!(f, "{kind} '{name}' uses a reserved identifier as its name")
            }
            Self::SeparatorInName { name, kind } => write!(
                f,
                "{kind} '{name}' contains '{MULTI_REGIME_SEPARATOR}', which only composite regime names may contain"
            ),
            Self::UnresolvedSymbol { symbol, element } => {
                write!(f, "'{symbol}' in {element} is not defined")
            }
            Self::UndefinedPort {
                port,
                expected,
                element,
            } => write!(f, "{element} refers to undefined {expected} '{port}'"),
            Self::UndefinedRegime {
                target,
                source_regime,
            } => write!(
                f,
                "a transition of regime '{source_regime}' targets undefined regime '{target}'"
            ),
            Self::NotAStateVariable { name, element } => {
                write!(f, "{element} refers to '{name}', which is not a state variable")
            }
            Self::UnbackedSendPort { port } => write!(
                f,
                "analog send port '{port}' has no alias or state variable to send"
            ),
            Self::RecursiveAlias { cycle } => {
                write!(f, "aliases are defined recursively: {}", cycle.join(" -> "))
            }
        }
    }
}

impl AsNineMLError for ValidationError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        match self {
            Self::UnbackedSendPort { port } => vec![Context::Help(format!(
                "define an alias or state variable called '{port}'"
            ))],
            Self::ReservedName { .. } => vec![Context::Note(format!(
                "reserved identifiers are {}",
                nineml_expr::RESERVED_IDENTIFIERS.join(", ")
            ))],
            Self::InvalidExpression { .. }
            | Self::DuplicateName { .. }
            | Self::SeparatorInName { .. }
            | Self::UnresolvedSymbol { .. }
            | Self::UndefinedPort { .. }
            | Self::UndefinedRegime { .. }
            | Self::NotAStateVariable { .. }
            | Self::RecursiveAlias { .. } => vec![],
        }
    }

    fn error_location(&self, source: &str) -> Option<ErrorLocation> {
        match self {
            Self::InvalidExpression { error, .. } => error.error_location(source),
            Self::DuplicateName { .. }
            | Self::ReservedName { .. }
            | Self::SeparatorInName { .. }
            | Self::UnresolvedSymbol { .. }
            | Self::UndefinedPort { .. }
            | Self::UndefinedRegime { .. }
            | Self::NotAStateVariable { .. }
            | Self::UnbackedSendPort { .. }
            | Self::RecursiveAlias { .. } => None,
        }
    }
}

/// Every problem found with one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    component: String,
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates a new list of problems with `component`.
    #[must_use]
    pub const fn new(component: String, errors: Vec<ValidationError>) -> Self {
        Self { component, errors }
    }

    /// Returns the name of the component.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns the problems.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl Deref for ValidationErrors {
    type Target = [ValidationError];

    fn deref(&self) -> &Self::Target {
        &self.errors
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component '{}' is invalid:", self.component)?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Runs every component validator on `dynamics`.
///
/// # Errors
///
/// Returns every problem found if any validator fails.
pub fn validate(dynamics: &Dynamics) -> Result<(), ValidationErrors> {
    let errors: Vec<_> = check_duplicate_names(dynamics)
        .into_iter()
        .chain(check_reserved_names(dynamics))
        .chain(check_unresolved_symbols(dynamics))
        .chain(check_send_ports(dynamics))
        .chain(check_recursive_aliases(dynamics))
        .collect();

    if errors.is_empty() {
        log::trace!("component '{}' is valid", dynamics.name());
        Ok(())
    } else {
        log::debug!(
            "component '{}' has {} validation error(s)",
            dynamics.name(),
            errors.len()
        );
        Err(ValidationErrors::new(dynamics.name().to_string(), errors))
    }
}
