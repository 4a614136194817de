//! Port exposures: composite ports that stand for sub-component ports.
//!
//! An exposure starts as a descriptor naming a sub-component and one of its
//! ports, and becomes a [`BoundExposure`] once the composite resolves it.

use indexmap::IndexMap;
use nineml_ir::{Port, PortKind};

use crate::{MultiDynamicsError, NotBoundError, SubDynamics};

/// A port exposure that refers to its port by name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureDescriptor {
    name: String,
    sub_component: String,
    port: String,
}

impl ExposureDescriptor {
    /// Creates a descriptor exposing `port` of `sub_component` as `name`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sub_component: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sub_component: sub_component.into(),
            port: port.into(),
        }
    }

    /// Returns the name of the exposed port on the composite.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the sub-component.
    #[must_use]
    pub fn sub_component(&self) -> &str {
        &self.sub_component
    }

    /// Returns the name of the port within the sub-component.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Resolves the descriptor against the sub-components of `composite`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sub-component or the port does not exist.
    pub fn bind(
        &self,
        composite: &str,
        sub_components: &IndexMap<String, SubDynamics>,
    ) -> Result<BoundExposure, MultiDynamicsError> {
        let sub = sub_components.get(&self.sub_component).ok_or_else(|| {
            MultiDynamicsError::UnknownSubComponent {
                name: self.sub_component.clone(),
                composite: composite.to_string(),
            }
        })?;
        let port = sub.component().port(&self.port)?.to_port();

        Ok(BoundExposure {
            name: self.name.clone(),
            sub_component: self.sub_component.clone(),
            qualified_port_name: sub.append_namespace(&self.port),
            port,
        })
    }
}

/// A port exposure resolved to the port it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundExposure {
    name: String,
    sub_component: String,
    qualified_port_name: String,
    port: Port,
}

impl BoundExposure {
    /// Returns the name of the exposed port on the composite.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the sub-component.
    #[must_use]
    pub fn component_name(&self) -> &str {
        &self.sub_component
    }

    /// Returns the sub-component port.
    #[must_use]
    pub const fn port(&self) -> &Port {
        &self.port
    }

    /// Returns the name of the sub-component port.
    #[must_use]
    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Returns the name of the sub-component port as seen from the
    /// composite.
    #[must_use]
    pub fn qualified_port_name(&self) -> &str {
        &self.qualified_port_name
    }

    /// Returns the kind of the exposed port.
    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.port.kind()
    }

    /// Returns the port the composite presents.
    #[must_use]
    pub fn exposed_port(&self) -> Port {
        self.port.renamed(self.name.as_str())
    }

    /// Returns the descriptor the exposure was bound from.
    #[must_use]
    pub fn descriptor(&self) -> ExposureDescriptor {
        ExposureDescriptor::new(&self.name, &self.sub_component, self.port.name())
    }
}

/// A port exposure, either still a descriptor or bound to its port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortExposure {
    /// Not yet resolved.
    Unbound(ExposureDescriptor),
    /// Resolved to a sub-component port.
    Bound(BoundExposure),
}

impl PortExposure {
    /// Creates an unbound exposure of `port` of `sub_component` as `name`.
    #[must_use]
    pub fn unbound(
        name: impl Into<String>,
        sub_component: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::Unbound(ExposureDescriptor::new(name, sub_component, port))
    }

    /// Returns the name of the exposed port on the composite.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unbound(descriptor) => descriptor.name(),
            Self::Bound(exposure) => exposure.name(),
        }
    }

    /// Returns whether the exposure has been bound.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    fn bound(&self) -> Result<&BoundExposure, NotBoundError> {
        match self {
            Self::Bound(exposure) => Ok(exposure),
            Self::Unbound(descriptor) => Err(NotBoundError::new(descriptor.name())),
        }
    }

    /// Returns the name of the sub-component.
    ///
    /// # Errors
    ///
    /// Returns [`NotBoundError`] if the exposure is unbound.
    pub fn component_name(&self) -> Result<&str, NotBoundError> {
        self.bound().map(BoundExposure::component_name)
    }

    /// Returns the sub-component port.
    ///
    /// # Errors
    ///
    /// Returns [`NotBoundError`] if the exposure is unbound.
    pub fn port(&self) -> Result<&Port, NotBoundError> {
        self.bound().map(BoundExposure::port)
    }

    /// Returns the name of the sub-component port.
    ///
    /// # Errors
    ///
    /// Returns [`NotBoundError`] if the exposure is unbound.
    pub fn port_name(&self) -> Result<&str, NotBoundError> {
        self.bound().map(BoundExposure::port_name)
    }

    /// Binds the exposure, resolving it if it is still a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the sub-component or the port does not exist.
    pub fn bind(
        self,
        composite: &str,
        sub_components: &IndexMap<String, SubDynamics>,
    ) -> Result<BoundExposure, MultiDynamicsError> {
        match self {
            Self::Unbound(descriptor) => descriptor.bind(composite, sub_components),
            Self::Bound(exposure) => Ok(exposure),
        }
    }
}

impl From<ExposureDescriptor> for PortExposure {
    fn from(descriptor: ExposureDescriptor) -> Self {
        Self::Unbound(descriptor)
    }
}

impl From<BoundExposure> for PortExposure {
    fn from(exposure: BoundExposure) -> Self {
        Self::Bound(exposure)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use nineml_ir::fixtures;

    use super::*;

    fn sub_components() -> IndexMap<String, SubDynamics> {
        let cell = SubDynamics::new("cell", Rc::new(fixtures::leaky_integrate_and_fire()));
        IndexMap::from([("cell".to_string(), cell)])
    }

    #[test]
    fn unbound_exposures_refuse_access() {
        let exposure = PortExposure::unbound("spike", "cell", "spike_out");

        assert!(!exposure.is_bound());
        assert_eq!(exposure.name(), "spike");
        let error = exposure.port().expect_err("exposure is not bound");
        assert_eq!(error.to_string(), "Port exposure 'spike' is not bound");
        assert!(exposure.component_name().is_err());
        assert!(exposure.port_name().is_err());
    }

    #[test]
    fn binding_resolves_the_port() {
        let exposure = PortExposure::unbound("spike", "cell", "spike_out")
            .bind("Network", &sub_components())
            .expect("port should exist");

        assert_eq!(exposure.kind(), PortKind::EventSend);
        assert_eq!(exposure.qualified_port_name(), "spike_out_cell");
        assert_eq!(exposure.exposed_port().name(), "spike");

        let exposure = PortExposure::from(exposure);
        assert_eq!(exposure.component_name(), Ok("cell"));
        assert_eq!(exposure.port_name(), Ok("spike_out"));
    }

    #[test]
    fn binding_fails_for_missing_targets() {
        let subs = sub_components();

        assert!(matches!(
            PortExposure::unbound("x", "nope", "V").bind("Network", &subs),
            Err(MultiDynamicsError::UnknownSubComponent { .. })
        ));
        assert!(matches!(
            PortExposure::unbound("x", "cell", "nope").bind("Network", &subs),
            Err(MultiDynamicsError::UnknownPort(_))
        ));
    }
}
