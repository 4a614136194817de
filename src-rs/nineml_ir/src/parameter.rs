//! Named quantities of a component: parameters, constants and state variables.

/// A value supplied to a component from outside, fixed during a simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
}

impl Parameter {
    /// Creates a new parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A named literal value, optionally labelled with its units.
///
/// Units are carried as an opaque label; no dimensional checking is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    name: String,
    value: f64,
    units: Option<String>,
}

impl Constant {
    /// Creates a new constant.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, units: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            units,
        }
    }

    /// Returns the constant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of the constant.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Returns the units label, if any.
    #[must_use]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }
}

/// A continuously evolving quantity of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    name: String,
}

impl StateVariable {
    /// Creates a new state variable.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the state variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
