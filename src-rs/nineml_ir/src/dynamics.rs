//! Dynamics components: hybrid automata over named quantities.

use std::fmt;

use indexmap::IndexMap;
use nineml_shared::error::AsNineMLError;

use crate::{
    annotations::Annotations,
    expression::{Alias, IntoExpr},
    parameter::{Constant, Parameter, StateVariable},
    port::{
        AnalogReceivePort, AnalogReducePort, AnalogSendPort, EventReceivePort, EventSendPort,
        PortRef, ReduceOp,
    },
    regime::{Regime, RegimeBuilder},
    validate::{self, ValidationError, ValidationErrors},
};

/// An element was looked up by a name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameError {
    kind: &'static str,
    name: String,
    container: String,
}

impl NameError {
    /// Creates a new name error for a `kind` element called `name` that is
    /// missing from `container`.
    #[must_use]
    pub fn new(kind: &'static str, name: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            container: container.into(),
        }
    }

    /// Returns the kind of element that was looked up.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the name that was looked up.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no {} named '{}' in '{}'",
            self.kind, self.name, self.container
        )
    }
}

impl std::error::Error for NameError {}

impl AsNineMLError for NameError {
    fn message(&self) -> String {
        self.to_string()
    }
}

/// The elements of a [`Dynamics`], used to construct or take one apart.
#[derive(Debug, Clone, Default)]
pub struct DynamicsParts {
    /// The component name
    pub name: String,
    /// Parameters keyed by name
    pub parameters: IndexMap<String, Parameter>,
    /// Constants keyed by name
    pub constants: IndexMap<String, Constant>,
    /// State variables keyed by name
    pub state_variables: IndexMap<String, StateVariable>,
    /// Top-level aliases keyed by name
    pub aliases: IndexMap<String, Alias>,
    /// Regimes keyed by name
    pub regimes: IndexMap<String, Regime>,
    /// Analog send ports keyed by name
    pub analog_send_ports: IndexMap<String, AnalogSendPort>,
    /// Analog receive ports keyed by name
    pub analog_receive_ports: IndexMap<String, AnalogReceivePort>,
    /// Analog reduce ports keyed by name
    pub analog_reduce_ports: IndexMap<String, AnalogReducePort>,
    /// Event send ports keyed by name
    pub event_send_ports: IndexMap<String, EventSendPort>,
    /// Event receive ports keyed by name
    pub event_receive_ports: IndexMap<String, EventReceivePort>,
    /// Annotations
    pub annotations: Annotations,
}

macro_rules! lookup {
    ($(#[$doc:meta])* $one:ident, $many:ident, $num:ident, $field:ident, $ty:ty, $kind:literal) => {
        $(#[$doc])*
        ///
        /// # Errors
        ///
        /// Returns a [`NameError`] if there is no such element.
        pub fn $one(&self, name: &str) -> Result<&$ty, NameError> {
            self.$field
                .get(name)
                .ok_or_else(|| NameError::new($kind, name, &self.name))
        }

        /// Returns every element of this kind, keyed by name.
        #[must_use]
        pub const fn $many(&self) -> &IndexMap<String, $ty> {
            &self.$field
        }

        /// Returns the number of elements of this kind.
        #[must_use]
        pub fn $num(&self) -> usize {
            self.$field.len()
        }
    };
}

/// A hybrid-dynamics component.
///
/// A component owns name-unique mappings of parameters, constants, state
/// variables, aliases, regimes and ports. Components are immutable once
/// built; transformations produce new components.
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamics {
    name: String,
    parameters: IndexMap<String, Parameter>,
    constants: IndexMap<String, Constant>,
    state_variables: IndexMap<String, StateVariable>,
    aliases: IndexMap<String, Alias>,
    regimes: IndexMap<String, Regime>,
    analog_send_ports: IndexMap<String, AnalogSendPort>,
    analog_receive_ports: IndexMap<String, AnalogReceivePort>,
    analog_reduce_ports: IndexMap<String, AnalogReducePort>,
    event_send_ports: IndexMap<String, EventSendPort>,
    event_receive_ports: IndexMap<String, EventReceivePort>,
    annotations: Annotations,
    document_url: Option<String>,
}

impl Dynamics {
    /// Creates a component from its parts without validating it.
    #[must_use]
    pub fn from_parts(parts: DynamicsParts) -> Self {
        let DynamicsParts {
            name,
            parameters,
            constants,
            state_variables,
            aliases,
            regimes,
            analog_send_ports,
            analog_receive_ports,
            analog_reduce_ports,
            event_send_ports,
            event_receive_ports,
            annotations,
        } = parts;

        Self {
            name,
            parameters,
            constants,
            state_variables,
            aliases,
            regimes,
            analog_send_ports,
            analog_receive_ports,
            analog_reduce_ports,
            event_send_ports,
            event_receive_ports,
            annotations,
            document_url: None,
        }
    }

    /// Splits the component into its parts.
    #[must_use]
    pub fn into_parts(self) -> DynamicsParts {
        DynamicsParts {
            name: self.name,
            parameters: self.parameters,
            constants: self.constants,
            state_variables: self.state_variables,
            aliases: self.aliases,
            regimes: self.regimes,
            analog_send_ports: self.analog_send_ports,
            analog_receive_ports: self.analog_receive_ports,
            analog_reduce_ports: self.analog_reduce_ports,
            event_send_ports: self.event_send_ports,
            event_receive_ports: self.event_receive_ports,
            annotations: self.annotations,
        }
    }

    /// Starts building a component.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DynamicsBuilder {
        DynamicsBuilder::new(name)
    }

    /// Returns the component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the URL of the document the component belongs to.
    #[must_use]
    pub fn document_url(&self) -> Option<&str> {
        self.document_url.as_deref()
    }

    /// Records the URL of the document the component belongs to.
    #[must_use]
    pub fn with_document_url(mut self, url: Option<String>) -> Self {
        self.document_url = url;
        self
    }

    /// Returns the annotations.
    #[must_use]
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    lookup!(
        /// Returns the parameter called `name`.
        parameter, parameters, num_parameters, parameters, Parameter, "parameter"
    );
    lookup!(
        /// Returns the constant called `name`.
        constant, constants, num_constants, constants, Constant, "constant"
    );
    lookup!(
        /// Returns the state variable called `name`.
        state_variable, state_variables, num_state_variables, state_variables, StateVariable, "state variable"
    );
    lookup!(
        /// Returns the top-level alias called `name`.
        alias, aliases, num_aliases, aliases, Alias, "alias"
    );
    lookup!(
        /// Returns the regime called `name`.
        regime, regimes, num_regimes, regimes, Regime, "regime"
    );
    lookup!(
        /// Returns the analog send port called `name`.
        analog_send_port, analog_send_ports, num_analog_send_ports, analog_send_ports, AnalogSendPort, "analog send port"
    );
    lookup!(
        /// Returns the analog receive port called `name`.
        analog_receive_port, analog_receive_ports, num_analog_receive_ports, analog_receive_ports, AnalogReceivePort, "analog receive port"
    );
    lookup!(
        /// Returns the analog reduce port called `name`.
        analog_reduce_port, analog_reduce_ports, num_analog_reduce_ports, analog_reduce_ports, AnalogReducePort, "analog reduce port"
    );
    lookup!(
        /// Returns the event send port called `name`.
        event_send_port, event_send_ports, num_event_send_ports, event_send_ports, EventSendPort, "event send port"
    );
    lookup!(
        /// Returns the event receive port called `name`.
        event_receive_port, event_receive_ports, num_event_receive_ports, event_receive_ports, EventReceivePort, "event receive port"
    );

    /// Returns every port, grouped by kind.
    pub fn ports(&self) -> impl Iterator<Item = PortRef<'_>> {
        let analog_send = self.analog_send_ports.values().map(PortRef::AnalogSend);
        let analog_receive = self
            .analog_receive_ports
            .values()
            .map(PortRef::AnalogReceive);
        let analog_reduce = self.analog_reduce_ports.values().map(PortRef::AnalogReduce);
        let event_send = self.event_send_ports.values().map(PortRef::EventSend);
        let event_receive = self.event_receive_ports.values().map(PortRef::EventReceive);

        analog_send
            .chain(analog_receive)
            .chain(analog_reduce)
            .chain(event_send)
            .chain(event_receive)
    }

    /// Returns the number of ports of every kind.
    #[must_use]
    pub fn num_ports(&self) -> usize {
        self.ports().count()
    }

    /// Returns the port called `name`, whatever its kind.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if there is no such port.
    pub fn port(&self, name: &str) -> Result<PortRef<'_>, NameError> {
        self.ports()
            .find(|port| port.name() == name)
            .ok_or_else(|| NameError::new("port", name, &self.name))
    }

    /// Returns the names a right-hand side may refer to without defining
    /// them: parameters, constants, receive and reduce ports.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .keys()
            .chain(self.constants.keys())
            .chain(self.analog_receive_ports.keys())
            .chain(self.analog_reduce_ports.keys())
            .map(String::as_str)
    }

    /// Returns the regime aliases of every regime, paired with the regime.
    pub fn regime_aliases(&self) -> impl Iterator<Item = (&Regime, &Alias)> {
        self.regimes
            .values()
            .flat_map(|regime| regime.aliases().values().map(move |alias| (regime, alias)))
    }
}

/// Builds a [`Dynamics`] component.
///
/// Malformed expressions and repeated names are collected as the builder is
/// used and reported together by [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use nineml_ir::{Dynamics, OnConditionBuilder, Regime};
///
/// let cell = Dynamics::builder("LeakyIntegrator")
///     .parameters(["tau", "theta"])
///     .state_variable("V")
///     .analog_receive_port("I")
///     .event_send_port("spike")
///     .regime(
///         Regime::builder("default")
///             .time_derivative("V", "(I - V) / tau")
///             .on_condition(
///                 OnConditionBuilder::new("V > theta").assign("V", "0").emit("spike"),
///             ),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(cell.num_regimes(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DynamicsBuilder {
    parts: DynamicsParts,
    errors: Vec<ValidationError>,
}

impl DynamicsBuilder {
    /// Starts a component called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: DynamicsParts {
                name: name.into(),
                ..DynamicsParts::default()
            },
            errors: Vec::new(),
        }
    }

    fn insert<T>(
        map: &mut IndexMap<String, T>,
        errors: &mut Vec<ValidationError>,
        kind: &'static str,
        name: &str,
        value: T,
    ) {
        if map.insert(name.to_string(), value).is_some() {
            errors.push(ValidationError::duplicate(name, kind, kind));
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn parameter(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.parameters,
            &mut self.errors,
            "parameter",
            name,
            Parameter::new(name),
        );
        self
    }

    /// Adds several parameters.
    #[must_use]
    pub fn parameters<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, Self::parameter)
    }

    /// Adds a constant.
    #[must_use]
    pub fn constant(mut self, name: &str, value: f64, units: Option<&str>) -> Self {
        let constant = Constant::new(name, value, units.map(str::to_string));
        Self::insert(
            &mut self.parts.constants,
            &mut self.errors,
            "constant",
            name,
            constant,
        );
        self
    }

    /// Adds a state variable.
    #[must_use]
    pub fn state_variable(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.state_variables,
            &mut self.errors,
            "state variable",
            name,
            StateVariable::new(name),
        );
        self
    }

    /// Adds several state variables.
    #[must_use]
    pub fn state_variables<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, Self::state_variable)
    }

    /// Adds a top-level alias.
    #[must_use]
    pub fn alias(mut self, name: &str, rhs: impl IntoExpr) -> Self {
        match rhs.into_expr() {
            Ok(rhs) => Self::insert(
                &mut self.parts.aliases,
                &mut self.errors,
                "alias",
                name,
                Alias::new(name, rhs),
            ),
            Err(error) => self.errors.push(ValidationError::InvalidExpression {
                element: format!("alias '{name}'"),
                error,
            }),
        }
        self
    }

    /// Adds a regime.
    #[must_use]
    pub fn regime(mut self, regime: RegimeBuilder) -> Self {
        let (regime, errors) = regime.finish();
        self.errors.extend(errors);
        let name = regime.name().to_string();
        Self::insert(
            &mut self.parts.regimes,
            &mut self.errors,
            "regime",
            &name,
            regime,
        );
        self
    }

    /// Adds an analog send port.
    #[must_use]
    pub fn analog_send_port(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.analog_send_ports,
            &mut self.errors,
            "analog send port",
            name,
            AnalogSendPort::new(name),
        );
        self
    }

    /// Adds an analog receive port.
    #[must_use]
    pub fn analog_receive_port(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.analog_receive_ports,
            &mut self.errors,
            "analog receive port",
            name,
            AnalogReceivePort::new(name),
        );
        self
    }

    /// Adds an analog reduce port.
    #[must_use]
    pub fn analog_reduce_port(mut self, name: &str, operator: ReduceOp) -> Self {
        Self::insert(
            &mut self.parts.analog_reduce_ports,
            &mut self.errors,
            "analog reduce port",
            name,
            AnalogReducePort::new(name, operator),
        );
        self
    }

    /// Adds an event send port.
    #[must_use]
    pub fn event_send_port(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.event_send_ports,
            &mut self.errors,
            "event send port",
            name,
            EventSendPort::new(name),
        );
        self
    }

    /// Adds an event receive port.
    #[must_use]
    pub fn event_receive_port(mut self, name: &str) -> Self {
        Self::insert(
            &mut self.parts.event_receive_ports,
            &mut self.errors,
            "event receive port",
            name,
            EventReceivePort::new(name),
        );
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotate(mut self, namespace: &str, key: &str, value: &str) -> Self {
        self.parts.annotations.set(namespace, key, value);
        self
    }

    /// Builds the component, then runs every component validator on it.
    ///
    /// # Errors
    ///
    /// Returns every problem found, whether reported while building or by a
    /// validator.
    pub fn build(self) -> Result<Dynamics, ValidationErrors> {
        let dynamics = self.build_unvalidated()?;
        validate::validate(&dynamics)?;
        Ok(dynamics)
    }

    /// Builds the component without running the validators.
    ///
    /// # Errors
    ///
    /// Returns the malformed expressions and repeated names found while
    /// building.
    pub fn build_unvalidated(self) -> Result<Dynamics, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(Dynamics::from_parts(self.parts))
        } else {
            Err(ValidationErrors::new(self.parts.name, self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortKind;

    fn cell() -> Dynamics {
        Dynamics::builder("Cell")
            .parameters(["tau", "theta"])
            .constant("gain", 2.0, Some("mV"))
            .state_variable("V")
            .alias("drive", "gain * I")
            .analog_receive_port("I")
            .analog_send_port("V")
            .event_send_port("spike")
            .regime(Regime::builder("default").time_derivative("V", "(drive - V) / tau"))
            .build()
            .expect("cell should be valid")
    }

    #[test]
    fn lookups() {
        let cell = cell();

        assert_eq!(cell.num_parameters(), 2);
        assert_eq!(cell.constant("gain").map(Constant::value), Ok(2.0));
        assert_eq!(cell.port("spike").map(PortRef::kind), Ok(PortKind::EventSend));
        assert_eq!(cell.num_ports(), 3);
    }

    #[test]
    fn missing_names_are_errors() {
        let cell = cell();

        let error = cell.parameter("nope").expect_err("parameter should not exist");
        assert_eq!(error.to_string(), "no parameter named 'nope' in 'Cell'");
        assert!(cell.regime("nope").is_err());
    }

    #[test]
    fn repeated_names_are_reported() {
        let errors = Dynamics::builder("Twice")
            .parameter("a")
            .parameter("a")
            .alias("b", "a +")
            .build_unvalidated()
            .expect_err("builder should report problems");

        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn parts_round_trip() {
        let cell = cell();
        let rebuilt = Dynamics::from_parts(cell.clone().into_parts());
        assert_eq!(rebuilt, cell);
    }
}
