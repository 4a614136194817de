//! Element kinds and the schema each kind declares.

use std::fmt;

/// The declared kind of an element.
///
/// Traversals dispatch on the kind rather than on the concrete type, so a
/// namespace-qualified view and the element behind it are the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A component with regimes
    Dynamics,
    /// A parameter
    Parameter,
    /// A named constant
    Constant,
    /// A state variable
    StateVariable,
    /// An alias
    Alias,
    /// A regime
    Regime,
    /// A time derivative
    TimeDerivative,
    /// An on-condition transition
    OnCondition,
    /// An on-event transition
    OnEvent,
    /// The trigger of an on-condition
    Trigger,
    /// A state assignment
    StateAssignment,
    /// An output event
    OutputEvent,
    /// An analog send port
    AnalogSendPort,
    /// An analog receive port
    AnalogReceivePort,
    /// An analog reduce port
    AnalogReducePort,
    /// An event send port
    EventSendPort,
    /// An event receive port
    EventReceivePort,
    /// Annotations of a component or regime
    Annotations,
    /// A composite component
    MultiDynamics,
    /// A sub-component of a composite
    SubDynamics,
    /// A port exposure of a composite
    PortExposure,
    /// A port connection of a composite
    PortConnection,
}

impl ElementKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 22] = [
        Self::Dynamics,
        Self::Parameter,
        Self::Constant,
        Self::StateVariable,
        Self::Alias,
        Self::Regime,
        Self::TimeDerivative,
        Self::OnCondition,
        Self::OnEvent,
        Self::Trigger,
        Self::StateAssignment,
        Self::OutputEvent,
        Self::AnalogSendPort,
        Self::AnalogReceivePort,
        Self::AnalogReducePort,
        Self::EventSendPort,
        Self::EventReceivePort,
        Self::Annotations,
        Self::MultiDynamics,
        Self::SubDynamics,
        Self::PortExposure,
        Self::PortConnection,
    ];

    /// Returns the kind name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dynamics => "Dynamics",
            Self::Parameter => "Parameter",
            Self::Constant => "Constant",
            Self::StateVariable => "StateVariable",
            Self::Alias => "Alias",
            Self::Regime => "Regime",
            Self::TimeDerivative => "TimeDerivative",
            Self::OnCondition => "OnCondition",
            Self::OnEvent => "OnEvent",
            Self::Trigger => "Trigger",
            Self::StateAssignment => "StateAssignment",
            Self::OutputEvent => "OutputEvent",
            Self::AnalogSendPort => "AnalogSendPort",
            Self::AnalogReceivePort => "AnalogReceivePort",
            Self::AnalogReducePort => "AnalogReducePort",
            Self::EventSendPort => "EventSendPort",
            Self::EventReceivePort => "EventReceivePort",
            Self::Annotations => "Annotations",
            Self::MultiDynamics => "MultiDynamics",
            Self::SubDynamics => "SubDynamics",
            Self::PortExposure => "PortExposure",
            Self::PortConnection => "PortConnection",
        }
    }

    /// Returns the schema of the kind.
    #[must_use]
    pub const fn schema(self) -> &'static KindSchema {
        match self {
            Self::Dynamics => &DYNAMICS,
            Self::Parameter
            | Self::StateVariable
            | Self::AnalogSendPort
            | Self::AnalogReceivePort
            | Self::EventSendPort
            | Self::EventReceivePort => &NAMED,
            Self::Constant => &CONSTANT,
            Self::Alias => &ALIAS,
            Self::Regime => &REGIME,
            Self::TimeDerivative | Self::StateAssignment => &ASSIGNMENT,
            Self::OnCondition => &ON_CONDITION,
            Self::OnEvent => &ON_EVENT,
            Self::Trigger => &TRIGGER,
            Self::OutputEvent => &OUTPUT_EVENT,
            Self::AnalogReducePort => &REDUCE_PORT,
            Self::Annotations => &ANNOTATIONS,
            Self::MultiDynamics => &MULTI_DYNAMICS,
            Self::SubDynamics => &SUB_DYNAMICS,
            Self::PortExposure => &PORT_EXPOSURE,
            Self::PortConnection => &PORT_CONNECTION,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The attributes and children a kind declares.
///
/// Attributes are scalar values. Singular children are optional nested
/// elements, plural children are keyed collections of nested elements. Each
/// child slot is tagged with the kind it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSchema {
    attributes: &'static [&'static str],
    children: &'static [(&'static str, ElementKind)],
    plural: &'static [(&'static str, ElementKind)],
}

impl KindSchema {
    const fn new(
        attributes: &'static [&'static str],
        children: &'static [(&'static str, ElementKind)],
        plural: &'static [(&'static str, ElementKind)],
    ) -> Self {
        Self {
            attributes,
            children,
            plural,
        }
    }

    /// Returns the attribute names.
    #[must_use]
    pub const fn attributes(&self) -> &'static [&'static str] {
        self.attributes
    }

    /// Returns the singular child slots.
    #[must_use]
    pub const fn children(&self) -> &'static [(&'static str, ElementKind)] {
        self.children
    }

    /// Returns the plural child slots.
    #[must_use]
    pub const fn plural(&self) -> &'static [(&'static str, ElementKind)] {
        self.plural
    }

    /// Returns the kind held by the child slot `name`, singular or plural.
    #[must_use]
    pub fn child_kind(&self, name: &str) -> Option<ElementKind> {
        self.children
            .iter()
            .chain(self.plural)
            .find(|(slot, _)| *slot == name)
            .map(|(_, kind)| *kind)
    }
}

const DYNAMICS: KindSchema = KindSchema::new(
    &["name", "document_url"],
    &[("annotations", ElementKind::Annotations)],
    &[
        ("parameters", ElementKind::Parameter),
        ("constants", ElementKind::Constant),
        ("state_variables", ElementKind::StateVariable),
        ("aliases", ElementKind::Alias),
        ("regimes", ElementKind::Regime),
        ("analog_send_ports", ElementKind::AnalogSendPort),
        ("analog_receive_ports", ElementKind::AnalogReceivePort),
        ("analog_reduce_ports", ElementKind::AnalogReducePort),
        ("event_send_ports", ElementKind::EventSendPort),
        ("event_receive_ports", ElementKind::EventReceivePort),
    ],
);

const NAMED: KindSchema = KindSchema::new(&["name"], &[], &[]);

const CONSTANT: KindSchema = KindSchema::new(&["name", "value", "units"], &[], &[]);

const ALIAS: KindSchema = KindSchema::new(&["name", "rhs"], &[], &[]);

const REGIME: KindSchema = KindSchema::new(
    &["name"],
    &[("annotations", ElementKind::Annotations)],
    &[
        ("time_derivatives", ElementKind::TimeDerivative),
        ("aliases", ElementKind::Alias),
        ("on_conditions", ElementKind::OnCondition),
        ("on_events", ElementKind::OnEvent),
    ],
);

const ASSIGNMENT: KindSchema = KindSchema::new(&["variable", "rhs"], &[], &[]);

const ON_CONDITION: KindSchema = KindSchema::new(
    &["target_regime"],
    &[("trigger", ElementKind::Trigger)],
    &[
        ("state_assignments", ElementKind::StateAssignment),
        ("output_events", ElementKind::OutputEvent),
    ],
);

const ON_EVENT: KindSchema = KindSchema::new(
    &["src_port", "target_regime"],
    &[],
    &[
        ("state_assignments", ElementKind::StateAssignment),
        ("output_events", ElementKind::OutputEvent),
    ],
);

const TRIGGER: KindSchema = KindSchema::new(&["rhs"], &[], &[]);

const OUTPUT_EVENT: KindSchema = KindSchema::new(&["port"], &[], &[]);

const REDUCE_PORT: KindSchema = KindSchema::new(&["name", "operator"], &[], &[]);

const ANNOTATIONS: KindSchema = KindSchema::new(&["entries"], &[], &[]);

const MULTI_DYNAMICS: KindSchema = KindSchema::new(
    &["name"],
    &[],
    &[
        ("sub_components", ElementKind::SubDynamics),
        ("port_exposures", ElementKind::PortExposure),
        ("port_connections", ElementKind::PortConnection),
    ],
);

const SUB_DYNAMICS: KindSchema =
    KindSchema::new(&["name"], &[("component", ElementKind::Dynamics)], &[]);

const PORT_EXPOSURE: KindSchema = KindSchema::new(&["name", "sub_component", "port"], &[], &[]);

const PORT_CONNECTION: KindSchema = KindSchema::new(
    &["sender", "send_port", "receiver", "receive_port"],
    &[],
    &[],
);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn slot_names_are_unique_per_kind() {
        for kind in ElementKind::ALL {
            let schema = kind.schema();
            let mut names = HashSet::new();
            let all = schema
                .attributes()
                .iter()
                .copied()
                .chain(schema.children().iter().map(|(name, _)| *name))
                .chain(schema.plural().iter().map(|(name, _)| *name));
            for name in all {
                assert!(names.insert(name), "'{name}' is declared twice by {kind}");
            }
        }
    }

    #[test]
    fn child_kinds() {
        let schema = ElementKind::Regime.schema();
        assert_eq!(schema.child_kind("on_events"), Some(ElementKind::OnEvent));
        assert_eq!(schema.child_kind("annotations"), Some(ElementKind::Annotations));
        assert_eq!(schema.child_kind("name"), None);
        assert_eq!(ElementKind::SubDynamics.to_string(), "SubDynamics");
    }
}
