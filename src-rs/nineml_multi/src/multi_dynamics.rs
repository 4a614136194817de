//! The composite component and its builder.

use std::{borrow::Cow, rc::Rc};

use indexmap::IndexMap;
use nineml_expr::Expr;
use nineml_ir::{
    Alias, Assignment, Constant, Document, DocumentContext, Dynamics, ExpressionElement,
    NameError, Parameter, PortKind, ReduceOp, Reference, StateVariable, ValidationError,
    ValidationErrors, validate,
};

use crate::{
    BoundExposure, ConnectionKind, MultiDynamicsError, PortConnection, PortExposure, SubDynamics,
    flatten,
    multi_regime::{self, MultiRegime, RegimeTuple},
    namespace::Namespaced,
};

/// An alias of a composite: either an alias of a sub-component seen through
/// its namespace, or one synthesized from a connection or exposure.
#[derive(Debug, Clone, Copy)]
pub enum MultiAlias<'a> {
    /// A sub-component alias
    Namespaced(Namespaced<'a, Alias>),
    /// An alias synthesized by the composite
    Local(&'a Alias),
}

impl MultiAlias<'_> {
    /// Returns the alias name as seen from the composite.
    #[must_use]
    pub fn name(&self) -> String {
        self.lhs().into_owned()
    }
}

impl ExpressionElement for MultiAlias<'_> {
    fn rhs(&self) -> Cow<'_, Expr> {
        match self {
            Self::Namespaced(alias) => alias.rhs(),
            Self::Local(alias) => alias.rhs(),
        }
    }
}

impl Assignment for MultiAlias<'_> {
    fn lhs(&self) -> Cow<'_, str> {
        match self {
            Self::Namespaced(alias) => alias.lhs(),
            Self::Local(alias) => alias.lhs(),
        }
    }
}

macro_rules! namespaced_lookup {
    ($(#[$doc:meta])* $many:ident, $one:ident, $num:ident, $ty:ty, $kind:literal) => {
        $(#[$doc])*
        pub fn $many(&self) -> impl Iterator<Item = Namespaced<'_, $ty>> {
            self.sub_components.values().flat_map(SubDynamics::$many)
        }

        /// Returns the element with the qualified name `name`.
        ///
        /// # Errors
        ///
        /// Returns a [`NameError`] if no sub-component has such an element.
        pub fn $one(&self, name: &str) -> Result<Namespaced<'_, $ty>, NameError> {
            self.sub_components
                .values()
                .find_map(|sub| sub.$one(name))
                .ok_or_else(|| NameError::new($kind, name, &self.name))
        }

        /// Returns the number of elements of this kind across every
        /// sub-component.
        #[must_use]
        pub fn $num(&self) -> usize {
            self.sub_components
                .values()
                .map(|sub| sub.component().$many().len())
                .sum()
        }
    };
}

macro_rules! exposure_lookup {
    ($(#[$doc:meta])* $many:ident, $one:ident, $num:ident, $kind:ident) => {
        $(#[$doc])*
        pub fn $many(&self) -> impl Iterator<Item = &BoundExposure> {
            self.port_exposures
                .values()
                .filter(|exposure| exposure.kind() == PortKind::$kind)
        }

        /// Returns the exposure called `name` if it has this kind.
        ///
        /// # Errors
        ///
        /// Returns a [`NameError`] if there is no such exposure.
        pub fn $one(&self, name: &str) -> Result<&BoundExposure, NameError> {
            self.port_exposures
                .get(name)
                .filter(|exposure| exposure.kind() == PortKind::$kind)
                .ok_or_else(|| NameError::new(PortKind::$kind.description(), name, &self.name))
        }

        /// Returns the number of exposures of this kind.
        #[must_use]
        pub fn $num(&self) -> usize {
            self.$many().count()
        }
    };
}

/// Senders connected to one receive port, keyed by qualified send port.
pub type FanIn = IndexMap<String, PortConnection>;

/// A component made of named sub-components wired together.
///
/// Every element of a sub-component is visible on the composite under its
/// qualified name `<name>_<sub-component>`. Regimes are the cross product of
/// the sub-component regimes, computed when the composite is built.
/// Composites are rebuilt, never patched, when their parts change.
///
/// # Examples
///
/// ```
/// use nineml_ir::fixtures;
/// use nineml_multi::MultiDynamics;
///
/// let network = MultiDynamics::builder("CellAndSynapse")
///     .sub_component("cell", fixtures::leaky_integrate_and_fire())
///     .sub_component("syn", fixtures::exponential_synapse())
///     .connect("cell", "V", "syn", "V")
///     .connect("syn", "Isyn", "cell", "Isyn")
///     .connect("cell", "spike_out", "syn", "spike")
///     .expose("spike", "cell", "spike_out")
///     .build()
///     .unwrap();
///
/// assert_eq!(network.num_regimes(), 2);
/// assert_eq!(network.parameter("tau_syn").unwrap().name(), "tau_syn");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDynamics {
    name: String,
    sub_components: IndexMap<String, SubDynamics>,
    port_exposures: IndexMap<String, BoundExposure>,
    port_connections: Vec<PortConnection>,
    analog_port_connections: IndexMap<String, PortConnection>,
    event_port_connections: IndexMap<String, FanIn>,
    reduce_port_connections: IndexMap<String, FanIn>,
    local_aliases: IndexMap<String, Alias>,
    regimes: IndexMap<String, RegimeTuple>,
}

impl MultiDynamics {
    /// Starts building a composite.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MultiDynamicsBuilder {
        MultiDynamicsBuilder::new(name)
    }

    /// Returns the composite name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sub-components in declaration order.
    pub fn sub_components(&self) -> impl Iterator<Item = &SubDynamics> {
        self.sub_components.values()
    }

    /// Returns the sub-component called `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such sub-component.
    pub fn sub_component(&self, name: &str) -> Result<&SubDynamics, NameError> {
        self.sub_components
            .get(name)
            .ok_or_else(|| NameError::new("sub-component", name, &self.name))
    }

    /// Returns the number of sub-components.
    #[must_use]
    pub fn num_sub_components(&self) -> usize {
        self.sub_components.len()
    }

    /// Returns every port exposure in declaration order.
    pub fn port_exposures(&self) -> impl Iterator<Item = &BoundExposure> {
        self.port_exposures.values()
    }

    /// Returns the port exposure called `name`, whatever its kind.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such exposure.
    pub fn port_exposure(&self, name: &str) -> Result<&BoundExposure, NameError> {
        self.port_exposures
            .get(name)
            .ok_or_else(|| NameError::new("port exposure", name, &self.name))
    }

    /// Returns the number of port exposures.
    #[must_use]
    pub fn num_port_exposures(&self) -> usize {
        self.port_exposures.len()
    }

    /// Returns the connections as they were declared.
    #[must_use]
    pub fn port_connections(&self) -> &[PortConnection] {
        &self.port_connections
    }

    /// Returns the analog connections keyed by qualified receive port.
    #[must_use]
    pub const fn analog_port_connections(&self) -> &IndexMap<String, PortConnection> {
        &self.analog_port_connections
    }

    /// Returns the senders of every event receive port, keyed by qualified
    /// receive port. Ports without senders have an empty entry.
    #[must_use]
    pub const fn event_port_connections(&self) -> &IndexMap<String, FanIn> {
        &self.event_port_connections
    }

    /// Returns the senders of every analog reduce port, keyed by qualified
    /// receive port. Ports without senders have an empty entry.
    #[must_use]
    pub const fn reduce_port_connections(&self) -> &IndexMap<String, FanIn> {
        &self.reduce_port_connections
    }

    /// Returns the aliases the composite synthesizes for its connections and
    /// exposures.
    #[must_use]
    pub const fn local_aliases(&self) -> &IndexMap<String, Alias> {
        &self.local_aliases
    }

    namespaced_lookup!(
        /// Returns the parameters of every sub-component, qualified.
        parameters, parameter, num_parameters, Parameter, "parameter"
    );
    namespaced_lookup!(
        /// Returns the constants of every sub-component, qualified.
        constants, constant, num_constants, Constant, "constant"
    );
    namespaced_lookup!(
        /// Returns the state variables of every sub-component, qualified.
        state_variables, state_variable, num_state_variables, StateVariable, "state variable"
    );

    /// Returns the top-level aliases of every sub-component, qualified, then
    /// the synthesized aliases.
    pub fn aliases(&self) -> impl Iterator<Item = MultiAlias<'_>> {
        self.sub_components
            .values()
            .flat_map(SubDynamics::aliases)
            .map(MultiAlias::Namespaced)
            .chain(self.local_aliases.values().map(MultiAlias::Local))
    }

    /// Returns the alias called `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such alias.
    pub fn alias(&self, name: &str) -> Result<MultiAlias<'_>, NameError> {
        if let Some(alias) = self.local_aliases.get(name) {
            return Ok(MultiAlias::Local(alias));
        }
        self.sub_components
            .values()
            .find_map(|sub| sub.alias(name))
            .map(MultiAlias::Namespaced)
            .ok_or_else(|| NameError::new("alias", name, &self.name))
    }

    /// Returns the number of aliases, synthesized ones included.
    #[must_use]
    pub fn num_aliases(&self) -> usize {
        self.aliases().count()
    }

    /// Returns the composite regimes.
    pub fn regimes(&self) -> impl Iterator<Item = MultiRegime<'_>> {
        self.regimes
            .iter()
            .map(|(name, tuple)| MultiRegime::new(name.as_str(), &self.sub_components, tuple))
    }

    /// Returns the composite regime called `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such regime.
    pub fn regime(&self, name: &str) -> Result<MultiRegime<'_>, NameError> {
        self.regimes
            .get_key_value(name)
            .map(|(name, tuple)| MultiRegime::new(name.as_str(), &self.sub_components, tuple))
            .ok_or_else(|| NameError::new("regime", name, &self.name))
    }

    /// Returns the number of composite regimes.
    #[must_use]
    pub fn num_regimes(&self) -> usize {
        self.regimes.len()
    }

    exposure_lookup!(
        /// Returns the exposed analog send ports.
        analog_send_ports, analog_send_port, num_analog_send_ports, AnalogSend
    );
    exposure_lookup!(
        /// Returns the exposed analog receive ports.
        analog_receive_ports, analog_receive_port, num_analog_receive_ports, AnalogReceive
    );
    exposure_lookup!(
        /// Returns the exposed analog reduce ports.
        analog_reduce_ports, analog_reduce_port, num_analog_reduce_ports, AnalogReduce
    );
    exposure_lookup!(
        /// Returns the exposed event send ports.
        event_send_ports, event_send_port, num_event_send_ports, EventSend
    );
    exposure_lookup!(
        /// Returns the exposed event receive ports.
        event_receive_ports, event_receive_port, num_event_receive_ports, EventReceive
    );

    /// Materialises the composite as a plain component.
    ///
    /// The component has every qualified element, the synthesized aliases,
    /// the exposed ports and one regime per composite regime. Events passed
    /// between sub-components are merged into the transition that emits
    /// them.
    #[must_use]
    pub fn flatten(&self) -> Dynamics {
        let (parts, _) = flatten::flatten(self);
        Dynamics::from_parts(parts)
    }

    /// Returns a builder holding the parts of this composite.
    #[must_use]
    pub fn to_builder(&self) -> MultiDynamicsBuilder {
        let builder = self
            .sub_components
            .values()
            .fold(Self::builder(&self.name), |builder, sub| {
                builder.sub_component(sub.name(), Rc::clone(sub.component()))
            });
        let builder = self
            .port_exposures
            .values()
            .fold(builder, |builder, exposure| {
                builder.exposure(exposure.descriptor().into())
            });
        self.port_connections
            .iter()
            .fold(builder, |builder, connection| builder.connection(connection.clone()))
    }
}

#[derive(Debug, Clone)]
enum SubComponentSource {
    Component(Rc<Dynamics>),
    Reference(Reference),
}

/// Builds a [`MultiDynamics`].
///
/// Sub-components, exposures and connections are collected as given; every
/// check runs in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct MultiDynamicsBuilder {
    name: String,
    sub_components: Vec<(String, SubComponentSource)>,
    port_exposures: Vec<PortExposure>,
    port_connections: Vec<PortConnection>,
}

impl MultiDynamicsBuilder {
    /// Starts a composite called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_components: Vec::new(),
            port_exposures: Vec::new(),
            port_connections: Vec::new(),
        }
    }

    /// Adds a sub-component.
    #[must_use]
    pub fn sub_component(mut self, name: &str, component: impl Into<Rc<Dynamics>>) -> Self {
        self.sub_components.push((
            name.to_string(),
            SubComponentSource::Component(component.into()),
        ));
        self
    }

    /// Adds a sub-component defined elsewhere, resolved when the composite
    /// is built.
    #[must_use]
    pub fn sub_component_reference(mut self, name: &str, reference: Reference) -> Self {
        self.sub_components
            .push((name.to_string(), SubComponentSource::Reference(reference)));
        self
    }

    /// Exposes `port` of `sub_component` as the composite port `name`.
    #[must_use]
    pub fn expose(self, name: &str, sub_component: &str, port: &str) -> Self {
        self.exposure(PortExposure::unbound(name, sub_component, port))
    }

    /// Adds a port exposure.
    #[must_use]
    pub fn exposure(mut self, exposure: PortExposure) -> Self {
        self.port_exposures.push(exposure);
        self
    }

    /// Connects `send_port` of `sender` to `receive_port` of `receiver`.
    #[must_use]
    pub fn connect(self, sender: &str, send_port: &str, receiver: &str, receive_port: &str) -> Self {
        self.connection(PortConnection::new(sender, send_port, receiver, receive_port))
    }

    /// Adds a port connection.
    #[must_use]
    pub fn connection(mut self, connection: PortConnection) -> Self {
        self.port_connections.push(connection);
        self
    }

    /// Builds the composite. Sub-component references are not resolved.
    ///
    /// # Errors
    ///
    /// See [`build_in`](Self::build_in).
    pub fn build(self) -> Result<MultiDynamics, MultiDynamicsError> {
        let no_documents: &[Document] = &[];
        self.build_in(no_documents)
    }

    /// Builds the composite, resolving sub-component references in
    /// `context`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a repeated or unknown
    /// sub-component, an unresolvable reference, an unknown port, a port
    /// written by more than one analog connection, a connection between
    /// incompatible ports, a repeated exposure, too many composite regimes,
    /// or a flattened composite that fails validation.
    pub fn build_in<C: DocumentContext + ?Sized>(
        self,
        context: &C,
    ) -> Result<MultiDynamics, MultiDynamicsError> {
        let Self {
            name,
            sub_components,
            port_exposures,
            port_connections,
        } = self;
        log::debug!(
            "building composite '{name}' from {} sub-component(s)",
            sub_components.len()
        );

        let sub_components = resolve_sub_components(&name, sub_components, context)?;
        let connections = classify_connections(&name, &sub_components, &port_connections)?;
        let port_exposures = bind_exposures(&name, &sub_components, port_exposures, &connections)?;
        let regimes = multi_regime::regime_product(&name, &sub_components)?;
        let local_aliases =
            synthesize_aliases(&name, &sub_components, &connections, &port_exposures)?;

        let Connections {
            analog,
            event,
            reduce,
        } = connections;
        let multi = MultiDynamics {
            name,
            sub_components,
            port_exposures,
            port_connections,
            analog_port_connections: analog,
            event_port_connections: event,
            reduce_port_connections: reduce,
            local_aliases,
            regimes,
        };

        let (parts, errors) = flatten::flatten(&multi);
        if !errors.is_empty() {
            return Err(ValidationErrors::new(multi.name.clone(), errors).into());
        }
        validate::validate(&Dynamics::from_parts(parts))?;

        log::debug!(
            "composite '{}' has {} regime(s)",
            multi.name,
            multi.num_regimes()
        );
        Ok(multi)
    }
}

fn resolve_sub_components<C: DocumentContext + ?Sized>(
    composite: &str,
    sources: Vec<(String, SubComponentSource)>,
    context: &C,
) -> Result<IndexMap<String, SubDynamics>, MultiDynamicsError> {
    let mut sub_components = IndexMap::new();
    for (name, source) in sources {
        if sub_components.contains_key(&name) {
            return Err(MultiDynamicsError::DuplicateSubComponent {
                name,
                composite: composite.to_string(),
            });
        }
        let component = match source {
            SubComponentSource::Component(component) => component,
            SubComponentSource::Reference(reference) => context.resolve(&reference)?,
        };
        sub_components.insert(name.clone(), SubDynamics::new(name, component));
    }
    Ok(sub_components)
}

fn port_kind(
    composite: &str,
    sub_components: &IndexMap<String, SubDynamics>,
    sub_component: &str,
    port: &str,
) -> Result<PortKind, MultiDynamicsError> {
    let sub = sub_components.get(sub_component).ok_or_else(|| {
        MultiDynamicsError::UnknownSubComponent {
            name: sub_component.to_string(),
            composite: composite.to_string(),
        }
    })?;
    Ok(sub.component().port(port)?.kind())
}

struct Connections {
    analog: IndexMap<String, PortConnection>,
    event: IndexMap<String, FanIn>,
    reduce: IndexMap<String, FanIn>,
}

fn classify_connections(
    composite: &str,
    sub_components: &IndexMap<String, SubDynamics>,
    port_connections: &[PortConnection],
) -> Result<Connections, MultiDynamicsError> {
    let mut connections = Connections {
        analog: IndexMap::new(),
        event: IndexMap::new(),
        reduce: IndexMap::new(),
    };

    // every event receive and reduce port has a bucket, even without senders
    for sub in sub_components.values() {
        for port in sub.component().event_receive_ports().keys() {
            connections
                .event
                .insert(sub.append_namespace(port), FanIn::new());
        }
        for port in sub.component().analog_reduce_ports().keys() {
            connections
                .reduce
                .insert(sub.append_namespace(port), FanIn::new());
        }
    }

    for connection in port_connections {
        let send_kind = port_kind(
            composite,
            sub_components,
            connection.sender(),
            connection.send_port(),
        )?;
        let receive_kind = port_kind(
            composite,
            sub_components,
            connection.receiver(),
            connection.receive_port(),
        )?;
        let kind = ConnectionKind::between(send_kind, receive_kind).ok_or_else(|| {
            MultiDynamicsError::UnsupportedConnectionKind {
                sender: format!("'{}' of '{}'", connection.send_port(), connection.sender()),
                send_kind,
                receiver: format!(
                    "'{}' of '{}'",
                    connection.receive_port(),
                    connection.receiver()
                ),
                receive_kind,
            }
        })?;
        log::trace!("{connection} is a {kind} connection");

        let receiver = connection.qualified_receive_port();
        let sender = connection.qualified_send_port();
        match kind {
            ConnectionKind::Analog => {
                if connections.analog.contains_key(&receiver) {
                    return Err(MultiDynamicsError::DuplicateTarget {
                        port: connection.receive_port().to_string(),
                        sub_component: connection.receiver().to_string(),
                        composite: composite.to_string(),
                    });
                }
                connections.analog.insert(receiver, connection.clone());
            }
            ConnectionKind::Event => {
                connections
                    .event
                    .entry(receiver)
                    .or_default()
                    .insert(sender, connection.clone());
            }
            ConnectionKind::Reduce => {
                connections
                    .reduce
                    .entry(receiver)
                    .or_default()
                    .insert(sender, connection.clone());
            }
        }
    }

    Ok(connections)
}

fn bind_exposures(
    composite: &str,
    sub_components: &IndexMap<String, SubDynamics>,
    port_exposures: Vec<PortExposure>,
    connections: &Connections,
) -> Result<IndexMap<String, BoundExposure>, MultiDynamicsError> {
    let mut bound: IndexMap<String, BoundExposure> = IndexMap::new();
    for exposure in port_exposures {
        let exposure = exposure.bind(composite, sub_components)?;
        if bound.contains_key(exposure.name()) {
            return Err(MultiDynamicsError::DuplicateExposure {
                name: exposure.name().to_string(),
                composite: composite.to_string(),
            });
        }

        // an exposed analog receive port is written from outside the composite
        let written_twice = exposure.kind() == PortKind::AnalogReceive
            && (connections
                .analog
                .contains_key(exposure.qualified_port_name())
                || bound.values().any(|other| {
                    other.qualified_port_name() == exposure.qualified_port_name()
                }));
        if written_twice {
            return Err(MultiDynamicsError::DuplicateTarget {
                port: exposure.port_name().to_string(),
                sub_component: exposure.component_name().to_string(),
                composite: composite.to_string(),
            });
        }

        bound.insert(exposure.name().to_string(), exposure);
    }
    Ok(bound)
}

fn synthesize_aliases(
    composite: &str,
    sub_components: &IndexMap<String, SubDynamics>,
    connections: &Connections,
    port_exposures: &IndexMap<String, BoundExposure>,
) -> Result<IndexMap<String, Alias>, MultiDynamicsError> {
    let mut aliases = Vec::new();

    for (receiver, connection) in &connections.analog {
        let sender = Expr::symbol(connection.qualified_send_port());
        aliases.push(Alias::new(receiver.as_str(), sender));
    }

    for sub in sub_components.values() {
        for port in sub.component().analog_reduce_ports().values() {
            let receiver = sub.append_namespace(port.name());
            let exposed = port_exposures
                .values()
                .filter(|exposure| exposure.qualified_port_name() == receiver);
            let senders = connections
                .reduce
                .get(&receiver)
                .into_iter()
                .flat_map(IndexMap::keys);

            let terms: Vec<_> = exposed
                .map(BoundExposure::name)
                .chain(senders.map(String::as_str))
                .filter(|term| *term != receiver)
                .map(Expr::symbol)
                .collect();
            let passes_through = terms.is_empty()
                && port_exposures
                    .values()
                    .any(|exposure| exposure.name() == receiver);
            if passes_through {
                continue;
            }

            let rhs = match port.operator() {
                ReduceOp::Sum => Expr::sum(terms),
            };
            aliases.push(Alias::new(receiver.as_str(), rhs));
        }
    }

    for exposure in port_exposures.values() {
        let qualified = exposure.qualified_port_name();
        if exposure.name() == qualified {
            continue;
        }
        match exposure.kind() {
            PortKind::AnalogSend => {
                aliases.push(Alias::new(exposure.name(), Expr::symbol(qualified)));
            }
            PortKind::AnalogReceive => {
                aliases.push(Alias::new(qualified, Expr::symbol(exposure.name())));
            }
            PortKind::AnalogReduce | PortKind::EventSend | PortKind::EventReceive => {}
        }
    }

    let mut synthesized = IndexMap::new();
    for alias in aliases {
        let name = alias.name().to_string();
        if synthesized.insert(name.clone(), alias).is_some() {
            let error = ValidationError::duplicate(&name, "alias", "alias");
            return Err(ValidationErrors::new(composite.to_string(), vec![error]).into());
        }
    }
    Ok(synthesized)
}

#[cfg(test)]
mod tests {
    use nineml_ir::{Regime, fixtures};

    use super::*;

    fn network() -> MultiDynamicsBuilder {
        MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .connect("cell", "spike_out", "syn", "spike")
    }

    #[test]
    fn elements_are_qualified() {
        let multi = network().build().expect("network should be valid");

        assert_eq!(multi.num_sub_components(), 2);
        assert_eq!(multi.num_parameters(), 8);
        assert_eq!(
            multi.parameter("tau_cell").map(|p| p.name()),
            Ok("tau_cell".to_string())
        );
        assert!(multi.parameter("tau").is_err());
        assert_eq!(multi.state_variable("g_syn").map(|sv| sv.name()), Ok("g_syn".to_string()));
    }

    #[test]
    fn connections_become_aliases() {
        let multi = network().build().expect("network should be valid");

        let analog = multi.alias("V_syn").expect("connection alias should exist");
        assert_eq!(analog.rhs().to_string(), "V_cell");

        let reduce = multi.alias("Isyn_cell").expect("reduce alias should exist");
        assert_eq!(reduce.rhs().to_string(), "Isyn_syn");

        let sub_alias = multi.alias("Isyn_syn").expect("sub-component alias should exist");
        assert_eq!(sub_alias.rhs().to_string(), "g_syn * (E_rev_syn - V_syn)");
    }

    #[test]
    fn reduce_ports_without_senders_are_zero() {
        let multi = MultiDynamics::builder("Alone")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .build()
            .expect("cell alone should be valid");

        assert_eq!(multi.reduce_port_connections()["Isyn_cell"].len(), 0);
        let alias = multi.alias("Isyn_cell").expect("reduce alias should exist");
        assert_eq!(alias.rhs().to_string(), "0");
    }

    #[test]
    fn two_writers_to_an_analog_receive_port_fail() {
        let error = MultiDynamics::builder("Twice")
            .sub_component("a", fixtures::leaky_integrate_and_fire())
            .sub_component("b", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("a", "V", "syn", "V")
            .connect("b", "V", "syn", "V")
            .build()
            .expect_err("'V' of 'syn' has two writers");

        assert_eq!(
            error.to_string(),
            "Multiple connections to receive port 'V' in 'syn' sub-component of 'Twice'"
        );
    }

    #[test]
    fn event_receive_ports_fan_in() {
        let multi = MultiDynamics::builder("FanIn")
            .sub_component("a", fixtures::spike_source())
            .sub_component("b", fixtures::spike_source())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("a", "spike_out", "syn", "spike")
            .connect("b", "spike_out", "syn", "spike")
            .expose("V", "syn", "V")
            .build()
            .expect("event fan-in should be allowed");

        let senders = &multi.event_port_connections()["spike_syn"];
        let keys: Vec<_> = senders.keys().map(String::as_str).collect();
        assert_eq!(keys, ["spike_out_a", "spike_out_b"]);
        assert_ne!(senders["spike_out_a"], senders["spike_out_b"]);
    }

    #[test]
    fn incompatible_ports_are_refused() {
        let error = MultiDynamics::builder("Mixed")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("cell", "spike_out", "syn", "V")
            .build()
            .expect_err("event ports cannot drive analog ports");
        assert!(matches!(
            error,
            MultiDynamicsError::UnsupportedConnectionKind {
                send_kind: PortKind::EventSend,
                receive_kind: PortKind::AnalogReceive,
                ..
            }
        ));

        let error = MultiDynamics::builder("Backwards")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("syn", "V", "cell", "V")
            .build()
            .expect_err("receive ports cannot send");
        assert!(matches!(error, MultiDynamicsError::UnsupportedConnectionKind { .. }));
    }

    #[test]
    fn unknown_names_are_refused() {
        let error = network()
            .connect("nope", "V", "syn", "V")
            .build()
            .expect_err("sub-component does not exist");
        assert!(matches!(error, MultiDynamicsError::UnknownSubComponent { .. }));

        let error = network()
            .expose("x", "cell", "nope")
            .build()
            .expect_err("port does not exist");
        assert!(matches!(error, MultiDynamicsError::UnknownPort(_)));

        let error = network()
            .sub_component("cell", fixtures::izhikevich())
            .build()
            .expect_err("sub-component names are unique");
        assert!(matches!(error, MultiDynamicsError::DuplicateSubComponent { .. }));
    }

    #[test]
    fn unresolved_inputs_fail_validation() {
        let error = MultiDynamics::builder("Open")
            .sub_component("syn", fixtures::exponential_synapse())
            .build()
            .expect_err("'V' of 'syn' is never written");
        let MultiDynamicsError::Invalid(errors) = error else {
            panic!("expected a validation failure, found {error}");
        };
        assert!(errors.iter().any(|error| matches!(
            error,
            ValidationError::UnresolvedSymbol { symbol, .. } if symbol == "V_syn"
        )));
    }

    #[test]
    fn exposures_by_kind() {
        let multi = network()
            .expose("spike", "cell", "spike_out")
            .expose("V", "cell", "V")
            .build()
            .expect("network should be valid");

        assert_eq!(multi.num_event_send_ports(), 1);
        assert_eq!(multi.num_analog_send_ports(), 1);
        assert!(multi.analog_send_port("spike").is_err());
        assert_eq!(
            multi.alias("V").map(|alias| alias.rhs().to_string()),
            Ok("V_cell".to_string())
        );
    }

    #[test]
    fn references_resolve_through_documents() {
        let mut document = Document::new(Some("cells.xml".to_string()));
        let cell = document
            .add(fixtures::leaky_integrate_and_fire())
            .expect("name should be free");

        let multi = MultiDynamics::builder("FromDocument")
            .sub_component_reference(
                "cell",
                Reference::with_url("LeakyIntegrateAndFire", "cells.xml"),
            )
            .build_in(&document)
            .expect("reference should resolve");
        let sub = multi.sub_component("cell").expect("sub-component should exist");
        assert!(Rc::ptr_eq(sub.component(), &cell));

        let error = MultiDynamics::builder("Unresolved")
            .sub_component_reference("cell", Reference::new("LeakyIntegrateAndFire"))
            .build()
            .expect_err("no document is available");
        assert!(matches!(error, MultiDynamicsError::Document(_)));
    }

    #[test]
    fn rebuilding_from_parts() {
        let multi = network()
            .expose("spike", "cell", "spike_out")
            .build()
            .expect("network should be valid");
        let rebuilt = multi.to_builder().build().expect("rebuild should succeed");
        assert_eq!(rebuilt, multi);
    }

    #[test]
    fn flattened_regimes_cover_the_product() {
        let multi = MultiDynamics::builder("Gated")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("chan", fixtures::three_state_channel())
            .connect("cell", "V", "chan", "V")
            .build()
            .expect("gated cell should be valid");

        assert_eq!(multi.num_regimes(), 6);
        let flat = multi.flatten();
        assert_eq!(flat.num_regimes(), 6);
        let regime: &Regime = flat
            .regime("subthreshold_cell___open_chan")
            .expect("regime should exist");
        assert_eq!(regime.time_derivatives().len(), 2);
    }
}
