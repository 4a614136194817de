//! Parameterisations of composites.

use std::rc::Rc;

use indexmap::IndexMap;
use nineml_ir::{DynamicsProperties, NameError, PropertyError};

use crate::{MultiDynamics, MultiDynamicsError, PortConnection, PortExposure, namespace::qualify};

/// Values for the parameters and state variables of a composite, gathered
/// from the parameterisations of its sub-components.
///
/// The composite definition is built from the sub-component definitions and
/// is called `<name>_Dynamics`. Property and initial value names are
/// qualified by their sub-component.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDynamicsProperties {
    name: String,
    definition: MultiDynamics,
    sub_components: IndexMap<String, DynamicsProperties>,
    properties: IndexMap<String, f64>,
    initial_values: IndexMap<String, f64>,
}

impl MultiDynamicsProperties {
    /// Combines the parameterisations `sub_components`, wired together by
    /// `port_exposures` and `port_connections`.
    ///
    /// # Errors
    ///
    /// Returns a [`MultiDynamicsError`] if the composite definition cannot be
    /// built.
    pub fn new(
        name: impl Into<String>,
        sub_components: impl IntoIterator<Item = (String, DynamicsProperties)>,
        port_exposures: impl IntoIterator<Item = PortExposure>,
        port_connections: impl IntoIterator<Item = PortConnection>,
    ) -> Result<Self, MultiDynamicsError> {
        let name = name.into();
        let sub_components: IndexMap<String, DynamicsProperties> =
            sub_components.into_iter().collect();

        let builder = sub_components.iter().fold(
            MultiDynamics::builder(format!("{name}_Dynamics")),
            |builder, (sub_name, properties)| {
                builder.sub_component(sub_name, Rc::clone(properties.definition()))
            },
        );
        let builder = port_exposures.into_iter().fold(builder, |builder, exposure| {
            builder.exposure(exposure)
        });
        let definition = port_connections
            .into_iter()
            .fold(builder, |builder, connection| builder.connection(connection))
            .build()?;

        let qualified = |values: fn(&DynamicsProperties) -> &IndexMap<String, f64>| {
            sub_components
                .iter()
                .flat_map(|(sub_name, properties)| {
                    values(properties)
                        .iter()
                        .map(move |(local, value)| (qualify(local, sub_name), *value))
                })
                .collect::<IndexMap<_, _>>()
        };
        let properties = qualified(DynamicsProperties::properties);
        let initial_values = qualified(DynamicsProperties::initial_values);

        log::debug!(
            "'{name}' sets {} propert(ies) across {} sub-component(s)",
            properties.len(),
            sub_components.len()
        );

        Ok(Self {
            name,
            definition,
            sub_components,
            properties,
            initial_values,
        })
    }

    /// Returns the name of the parameterisation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the composite definition.
    #[must_use]
    pub const fn definition(&self) -> &MultiDynamics {
        &self.definition
    }

    /// Returns the parameterisation of the sub-component `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such sub-component.
    pub fn sub_component(&self, name: &str) -> Result<&DynamicsProperties, NameError> {
        self.sub_components
            .get(name)
            .ok_or_else(|| NameError::new("sub-component", name, &self.name))
    }

    /// Returns the property values keyed by qualified parameter name.
    #[must_use]
    pub const fn properties(&self) -> &IndexMap<String, f64> {
        &self.properties
    }

    /// Returns the value given to the qualified parameter `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    /// Returns the initial values keyed by qualified state variable name.
    #[must_use]
    pub const fn initial_values(&self) -> &IndexMap<String, f64> {
        &self.initial_values
    }

    /// Returns the same values as properties of the flattened definition.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] if a value does not name an element of the
    /// flattened definition.
    pub fn to_dynamics_properties(&self) -> Result<DynamicsProperties, PropertyError> {
        DynamicsProperties::new(
            self.name.clone(),
            Rc::new(self.definition.flatten()),
            self.properties.clone(),
            self.initial_values.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::fixtures;

    use super::*;

    fn properties(definition: nineml_ir::Dynamics, values: &[(&str, f64)]) -> DynamicsProperties {
        DynamicsProperties::new(
            format!("{}_props", definition.name()),
            Rc::new(definition),
            values.iter().map(|(name, value)| ((*name).to_string(), *value)),
            [],
        )
        .expect("properties should match the definition")
    }

    #[test]
    fn property_names_are_qualified() {
        let combined = MultiDynamicsProperties::new(
            "Network",
            [
                (
                    "cell".to_string(),
                    properties(fixtures::leaky_integrate_and_fire(), &[("tau", 20.0)]),
                ),
                (
                    "syn".to_string(),
                    properties(fixtures::exponential_synapse(), &[("tau", 5.0)]),
                ),
            ],
            [],
            [
                PortConnection::new("cell", "V", "syn", "V"),
                PortConnection::new("syn", "Isyn", "cell", "Isyn"),
            ],
        )
        .expect("composite should be valid");

        assert_eq!(combined.definition().name(), "Network_Dynamics");
        assert_eq!(combined.property("tau_cell"), Some(20.0));
        assert_eq!(combined.property("tau_syn"), Some(5.0));
        assert_eq!(combined.property("tau"), None);
        assert!(combined.sub_component("syn").is_ok());

        let flat = combined
            .to_dynamics_properties()
            .expect("qualified names should exist");
        assert_eq!(flat.property("tau_syn"), Some(5.0));
        assert_eq!(flat.unset_parameters().count(), 6);
    }

    #[test]
    fn invalid_wiring_is_reported() {
        let error = MultiDynamicsProperties::new(
            "Open",
            [(
                "syn".to_string(),
                properties(fixtures::exponential_synapse(), &[]),
            )],
            [],
            [],
        )
        .expect_err("'V' of 'syn' is never written");
        assert!(matches!(error, MultiDynamicsError::Invalid(_)));
    }
}
