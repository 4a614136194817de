//! Parameterisations of components.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use nineml_shared::error::{AsNineMLError, Context};

use crate::Dynamics;

/// A property or initial value that does not fit its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The definition has no parameter of this name.
    UnknownProperty {
        /// The property name
        property: String,
        /// The definition name
        definition: String,
    },
    /// The definition has no state variable of this name.
    UnknownInitialValue {
        /// The state variable name
        variable: String,
        /// The definition name
        definition: String,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty {
                property,
                definition,
            } => write!(
                f,
                "property '{property}' is not a parameter of '{definition}'"
            ),
            Self::UnknownInitialValue {
                variable,
                definition,
            } => write!(
                f,
                "initial value '{variable}' is not a state variable of '{definition}'"
            ),
        }
    }
}

impl std::error::Error for PropertyError {}

impl AsNineMLError for PropertyError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        vec![Context::Note(
            "properties and initial values must match the definition".to_string(),
        )]
    }
}

/// A component definition together with values for its parameters and the
/// initial values of its state variables.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsProperties {
    name: String,
    definition: Rc<Dynamics>,
    properties: IndexMap<String, f64>,
    initial_values: IndexMap<String, f64>,
}

impl DynamicsProperties {
    /// Creates a parameterisation of `definition`.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] if a property does not name a parameter of
    /// the definition, or an initial value does not name a state variable.
    pub fn new(
        name: impl Into<String>,
        definition: Rc<Dynamics>,
        properties: impl IntoIterator<Item = (String, f64)>,
        initial_values: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<Self, PropertyError> {
        let properties: IndexMap<_, _> = properties.into_iter().collect();
        let initial_values: IndexMap<_, _> = initial_values.into_iter().collect();

        if let Some(property) = properties
            .keys()
            .find(|property| definition.parameter(property).is_err())
        {
            return Err(PropertyError::UnknownProperty {
                property: property.clone(),
                definition: definition.name().to_string(),
            });
        }

        if let Some(variable) = initial_values
            .keys()
            .find(|variable| definition.state_variable(variable).is_err())
        {
            return Err(PropertyError::UnknownInitialValue {
                variable: variable.clone(),
                definition: definition.name().to_string(),
            });
        }

        Ok(Self {
            name: name.into(),
            definition,
            properties,
            initial_values,
        })
    }

    /// Returns the name of the parameterisation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the component definition.
    #[must_use]
    pub const fn definition(&self) -> &Rc<Dynamics> {
        &self.definition
    }

    /// Returns the property values keyed by parameter name.
    #[must_use]
    pub const fn properties(&self) -> &IndexMap<String, f64> {
        &self.properties
    }

    /// Returns the value given to `parameter`.
    #[must_use]
    pub fn property(&self, parameter: &str) -> Option<f64> {
        self.properties.get(parameter).copied()
    }

    /// Returns the initial values keyed by state variable name.
    #[must_use]
    pub const fn initial_values(&self) -> &IndexMap<String, f64> {
        &self.initial_values
    }

    /// Returns the parameters of the definition that have no value.
    pub fn unset_parameters(&self) -> impl Iterator<Item = &str> {
        self.definition
            .parameters()
            .keys()
            .filter(|name| !self.properties.contains_key(*name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Regime;

    fn definition() -> Rc<Dynamics> {
        let dynamics = Dynamics::builder("Leaky")
            .parameters(["tau", "v_rest"])
            .state_variable("V")
            .regime(Regime::builder("r").time_derivative("V", "(v_rest - V) / tau"))
            .build()
            .expect("definition should be valid");
        Rc::new(dynamics)
    }

    #[test]
    fn properties_name_parameters() {
        let properties = DynamicsProperties::new(
            "leaky_props",
            definition(),
            [("tau".to_string(), 20.0)],
            [("V".to_string(), -65.0)],
        )
        .expect("properties should match the definition");

        assert_eq!(properties.property("tau"), Some(20.0));
        assert_eq!(properties.unset_parameters().collect::<Vec<_>>(), ["v_rest"]);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let error = DynamicsProperties::new(
            "bad",
            definition(),
            [("g".to_string(), 1.0)],
            [],
        )
        .expect_err("'g' is not a parameter");
        assert_eq!(error.to_string(), "property 'g' is not a parameter of 'Leaky'");

        let error = DynamicsProperties::new("bad", definition(), [], [("tau".to_string(), 1.0)])
            .expect_err("'tau' is not a state variable");
        assert!(matches!(error, PropertyError::UnknownInitialValue { .. }));
    }
}
