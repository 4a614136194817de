//! Uniform access to the elements of a component graph.
//!
//! [`NodeRef`] borrows any element and exposes it through its kind's
//! [`KindSchema`](crate::KindSchema): scalar attributes, singular children and
//! plural children. [`Node`] owns an element, and [`Node::rebuild`] creates
//! one of any kind from [`Parts`].

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use nineml_expr::Expr;
use nineml_ir::{
    Alias, AnalogReceivePort, AnalogReducePort, AnalogSendPort, Annotations, Constant, Dynamics,
    DynamicsParts, EventReceivePort, EventSendPort, ExpressionElement, OnCondition, OnEvent,
    OutputEvent, Parameter, ReduceOp, Regime, RegimeParts, StateAssignment, StateVariable,
    TimeDerivative, Transition, TransitionBody, Trigger,
};
use nineml_multi::{BoundExposure, MultiDynamics, PortConnection, PortExposure, SubDynamics};

use crate::{ElementKind, RebuildError};

/// The value of a scalar attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A name or other text
    Text(String),
    /// Text that may be absent
    OptionalText(Option<String>),
    /// A number
    Number(f64),
    /// A symbolic expression
    Expr(Expr),
    /// Annotation entries as `(namespace, key, value)`
    Entries(Vec<(String, String, String)>),
}

impl AttrValue {
    fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    fn optional(text: Option<&str>) -> Self {
        Self::OptionalText(text.map(str::to_string))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::OptionalText(Some(text)) => write!(f, "{text}"),
            Self::OptionalText(None) => write!(f, "None"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Expr(expr) => write!(f, "{expr}"),
            Self::Entries(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(namespace, key, value)| format!("{namespace}:{key}={value}"))
                    .collect();
                write!(f, "{}", entries.join(", "))
            }
        }
    }
}

macro_rules! node_ref {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A borrowed element of any kind.
        #[derive(Debug, Clone, Copy)]
        pub enum NodeRef<'a> {
            $(
                #[doc = concat!("A borrowed `", stringify!($ty), "`")]
                $variant(&'a $ty),
            )*
        }

        impl NodeRef<'_> {
            /// Returns the kind of the element.
            #[must_use]
            pub const fn kind(self) -> ElementKind {
                match self {
                    $(Self::$variant(_) => ElementKind::$variant,)*
                }
            }

            /// Returns the address of the element, which identifies it for as
            /// long as the graph is not modified.
            #[must_use]
            pub fn address(self) -> usize {
                match self {
                    $(Self::$variant(element) => std::ptr::from_ref(element).cast::<()>().addr(),)*
                }
            }
        }

        $(
            impl<'a> From<&'a $ty> for NodeRef<'a> {
                fn from(element: &'a $ty) -> Self {
                    Self::$variant(element)
                }
            }
        )*
    };
}

node_ref!(
    Dynamics(Dynamics),
    Parameter(Parameter),
    Constant(Constant),
    StateVariable(StateVariable),
    Alias(Alias),
    Regime(Regime),
    TimeDerivative(TimeDerivative),
    OnCondition(OnCondition),
    OnEvent(OnEvent),
    Trigger(Trigger),
    StateAssignment(StateAssignment),
    OutputEvent(OutputEvent),
    AnalogSendPort(AnalogSendPort),
    AnalogReceivePort(AnalogReceivePort),
    AnalogReducePort(AnalogReducePort),
    EventSendPort(EventSendPort),
    EventReceivePort(EventReceivePort),
    Annotations(Annotations),
    MultiDynamics(MultiDynamics),
    SubDynamics(SubDynamics),
    PortExposure(BoundExposure),
    PortConnection(PortConnection),
);

fn rhs(element: &impl ExpressionElement) -> AttrValue {
    AttrValue::Expr(element.rhs().into_owned())
}

fn transition_children<'a>(transition: &'a impl Transition, name: &str) -> Vec<NodeRef<'a>> {
    match name {
        "state_assignments" => transition
            .state_assignments()
            .values()
            .map(NodeRef::StateAssignment)
            .collect(),
        "output_events" => transition
            .output_events()
            .values()
            .map(NodeRef::OutputEvent)
            .collect(),
        _ => Vec::new(),
    }
}

impl<'a> NodeRef<'a> {
    /// Returns the key that identifies the element among its siblings.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::Dynamics(dynamics) => dynamics.name().to_string(),
            Self::Parameter(parameter) => parameter.name().to_string(),
            Self::Constant(constant) => constant.name().to_string(),
            Self::StateVariable(state_variable) => state_variable.name().to_string(),
            Self::Alias(alias) => alias.name().to_string(),
            Self::Regime(regime) => regime.name().to_string(),
            Self::TimeDerivative(derivative) => derivative.variable().to_string(),
            Self::OnCondition(on_condition) => on_condition.key(),
            Self::OnEvent(on_event) => on_event.src_port_name().to_string(),
            Self::Trigger(trigger) => trigger.rhs().to_string(),
            Self::StateAssignment(assignment) => assignment.variable().to_string(),
            Self::OutputEvent(event) => event.port_name().to_string(),
            Self::AnalogSendPort(port) => port.name().to_string(),
            Self::AnalogReceivePort(port) => port.name().to_string(),
            Self::AnalogReducePort(port) => port.name().to_string(),
            Self::EventSendPort(port) => port.name().to_string(),
            Self::EventReceivePort(port) => port.name().to_string(),
            Self::Annotations(_) => "annotations".to_string(),
            Self::MultiDynamics(multi) => multi.name().to_string(),
            Self::SubDynamics(sub) => sub.name().to_string(),
            Self::PortExposure(exposure) => exposure.name().to_string(),
            Self::PortConnection(connection) => connection.to_string(),
        }
    }

    /// Returns the key under which the element is paired with its
    /// counterpart when two graphs are compared.
    ///
    /// This is [`key`](Self::key), except that on-conditions and triggers
    /// use the normalised trigger so that rearranged comparisons still pair.
    #[must_use]
    pub fn match_key(self) -> String {
        match self {
            Self::OnCondition(on_condition) => on_condition.trigger().rhs().normalise().to_string(),
            Self::Trigger(trigger) => trigger.rhs().normalise().to_string(),
            Self::Dynamics(_)
            | Self::Parameter(_)
            | Self::Constant(_)
            | Self::StateVariable(_)
            | Self::Alias(_)
            | Self::Regime(_)
            | Self::TimeDerivative(_)
            | Self::OnEvent(_)
            | Self::StateAssignment(_)
            | Self::OutputEvent(_)
            | Self::AnalogSendPort(_)
            | Self::AnalogReceivePort(_)
            | Self::AnalogReducePort(_)
            | Self::EventSendPort(_)
            | Self::EventReceivePort(_)
            | Self::Annotations(_)
            | Self::MultiDynamics(_)
            | Self::SubDynamics(_)
            | Self::PortExposure(_)
            | Self::PortConnection(_) => self.key(),
        }
    }

    /// Returns every attribute declared by the element's kind, in schema
    /// order.
    #[must_use]
    pub fn attributes(self) -> Vec<(&'static str, AttrValue)> {
        match self {
            Self::Dynamics(dynamics) => vec![
                ("name", AttrValue::text(dynamics.name())),
                ("document_url", AttrValue::optional(dynamics.document_url())),
            ],
            Self::Parameter(parameter) => vec![("name", AttrValue::text(parameter.name()))],
            Self::Constant(constant) => vec![
                ("name", AttrValue::text(constant.name())),
                ("value", AttrValue::Number(constant.value())),
                ("units", AttrValue::optional(constant.units())),
            ],
            Self::StateVariable(state_variable) => {
                vec![("name", AttrValue::text(state_variable.name()))]
            }
            Self::Alias(alias) => vec![("name", AttrValue::text(alias.name())), ("rhs", rhs(alias))],
            Self::Regime(regime) => vec![("name", AttrValue::text(regime.name()))],
            Self::TimeDerivative(derivative) => vec![
                ("variable", AttrValue::text(derivative.variable())),
                ("rhs", rhs(derivative)),
            ],
            Self::OnCondition(on_condition) => vec![(
                "target_regime",
                AttrValue::optional(on_condition.target_regime_name()),
            )],
            Self::OnEvent(on_event) => vec![
                ("src_port", AttrValue::text(on_event.src_port_name())),
                (
                    "target_regime",
                    AttrValue::optional(on_event.target_regime_name()),
                ),
            ],
            Self::Trigger(trigger) => vec![("rhs", rhs(trigger))],
            Self::StateAssignment(assignment) => vec![
                ("variable", AttrValue::text(assignment.variable())),
                ("rhs", rhs(assignment)),
            ],
            Self::OutputEvent(event) => vec![("port", AttrValue::text(event.port_name()))],
            Self::AnalogSendPort(port) => vec![("name", AttrValue::text(port.name()))],
            Self::AnalogReceivePort(port) => vec![("name", AttrValue::text(port.name()))],
            Self::AnalogReducePort(port) => vec![
                ("name", AttrValue::text(port.name())),
                ("operator", AttrValue::text(port.operator().symbol())),
            ],
            Self::EventSendPort(port) => vec![("name", AttrValue::text(port.name()))],
            Self::EventReceivePort(port) => vec![("name", AttrValue::text(port.name()))],
            Self::Annotations(annotations) => {
                let entries = annotations
                    .namespaces()
                    .flat_map(|namespace| {
                        annotations
                            .namespace(namespace)
                            .into_iter()
                            .flatten()
                            .map(move |(key, value)| {
                                (namespace.to_string(), key.clone(), value.clone())
                            })
                    })
                    .collect();
                vec![("entries", AttrValue::Entries(entries))]
            }
            Self::MultiDynamics(multi) => vec![("name", AttrValue::text(multi.name()))],
            Self::SubDynamics(sub) => vec![("name", AttrValue::text(sub.name()))],
            Self::PortExposure(exposure) => vec![
                ("name", AttrValue::text(exposure.name())),
                ("sub_component", AttrValue::text(exposure.component_name())),
                ("port", AttrValue::text(exposure.port_name())),
            ],
            Self::PortConnection(connection) => vec![
                ("sender", AttrValue::text(connection.sender())),
                ("send_port", AttrValue::text(connection.send_port())),
                ("receiver", AttrValue::text(connection.receiver())),
                ("receive_port", AttrValue::text(connection.receive_port())),
            ],
        }
    }

    /// Returns the attribute called `name`.
    #[must_use]
    pub fn attribute(self, name: &str) -> Option<AttrValue> {
        self.attributes()
            .into_iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, value)| value)
    }

    /// Returns the singular child in the slot `name`, if present.
    #[must_use]
    pub fn child(self, name: &str) -> Option<NodeRef<'a>> {
        match (self, name) {
            (Self::Dynamics(dynamics), "annotations") => {
                Some(NodeRef::Annotations(dynamics.annotations()))
            }
            (Self::Regime(regime), "annotations") => Some(NodeRef::Annotations(regime.annotations())),
            (Self::OnCondition(on_condition), "trigger") => {
                Some(NodeRef::Trigger(on_condition.trigger()))
            }
            (Self::SubDynamics(sub), "component") => {
                Some(NodeRef::Dynamics(sub.component().as_ref()))
            }
            _ => None,
        }
    }

    /// Returns the children in the plural slot `name`, in declaration order.
    #[must_use]
    pub fn children(self, name: &str) -> Vec<NodeRef<'a>> {
        match self {
            Self::Dynamics(dynamics) => match name {
                "parameters" => dynamics.parameters().values().map(NodeRef::Parameter).collect(),
                "constants" => dynamics.constants().values().map(NodeRef::Constant).collect(),
                "state_variables" => dynamics
                    .state_variables()
                    .values()
                    .map(NodeRef::StateVariable)
                    .collect(),
                "aliases" => dynamics.aliases().values().map(NodeRef::Alias).collect(),
                "regimes" => dynamics.regimes().values().map(NodeRef::Regime).collect(),
                "analog_send_ports" => dynamics
                    .analog_send_ports()
                    .values()
                    .map(NodeRef::AnalogSendPort)
                    .collect(),
                "analog_receive_ports" => dynamics
                    .analog_receive_ports()
                    .values()
                    .map(NodeRef::AnalogReceivePort)
                    .collect(),
                "analog_reduce_ports" => dynamics
                    .analog_reduce_ports()
                    .values()
                    .map(NodeRef::AnalogReducePort)
                    .collect(),
                "event_send_ports" => dynamics
                    .event_send_ports()
                    .values()
                    .map(NodeRef::EventSendPort)
                    .collect(),
                "event_receive_ports" => dynamics
                    .event_receive_ports()
                    .values()
                    .map(NodeRef::EventReceivePort)
                    .collect(),
                _ => Vec::new(),
            },
            Self::Regime(regime) => match name {
                "time_derivatives" => regime
                    .time_derivatives()
                    .values()
                    .map(NodeRef::TimeDerivative)
                    .collect(),
                "aliases" => regime.aliases().values().map(NodeRef::Alias).collect(),
                "on_conditions" => regime.on_conditions().iter().map(NodeRef::OnCondition).collect(),
                "on_events" => regime.on_events().values().map(NodeRef::OnEvent).collect(),
                _ => Vec::new(),
            },
            Self::OnCondition(on_condition) => transition_children(on_condition, name),
            Self::OnEvent(on_event) => transition_children(on_event, name),
            Self::MultiDynamics(multi) => match name {
                "sub_components" => multi.sub_components().map(NodeRef::SubDynamics).collect(),
                "port_exposures" => multi.port_exposures().map(NodeRef::PortExposure).collect(),
                "port_connections" => multi
                    .port_connections()
                    .iter()
                    .map(NodeRef::PortConnection)
                    .collect(),
                _ => Vec::new(),
            },
            Self::Parameter(_)
            | Self::Constant(_)
            | Self::StateVariable(_)
            | Self::Alias(_)
            | Self::TimeDerivative(_)
            | Self::Trigger(_)
            | Self::StateAssignment(_)
            | Self::OutputEvent(_)
            | Self::AnalogSendPort(_)
            | Self::AnalogReceivePort(_)
            | Self::AnalogReducePort(_)
            | Self::EventSendPort(_)
            | Self::EventReceivePort(_)
            | Self::Annotations(_)
            | Self::SubDynamics(_)
            | Self::PortExposure(_)
            | Self::PortConnection(_) => Vec::new(),
        }
    }
}

impl<'a> From<&'a Rc<Dynamics>> for NodeRef<'a> {
    fn from(dynamics: &'a Rc<Dynamics>) -> Self {
        Self::Dynamics(dynamics.as_ref())
    }
}

impl<'a> From<&'a Rc<MultiDynamics>> for NodeRef<'a> {
    fn from(multi: &'a Rc<MultiDynamics>) -> Self {
        Self::MultiDynamics(multi.as_ref())
    }
}

macro_rules! node {
    ($($variant:ident($ty:ty) => $into:ident),* $(,)?) => {
        /// An owned element of any kind.
        ///
        /// Components are held behind [`Rc`] so that a component shared by
        /// several owners stays shared.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Node {
            $(
                #[doc = concat!("An owned `", stringify!($ty), "`")]
                $variant($ty),
            )*
        }

        impl Node {
            /// Returns the kind of the element.
            #[must_use]
            pub const fn kind(&self) -> ElementKind {
                match self {
                    $(Self::$variant(_) => ElementKind::$variant,)*
                }
            }

            $(
                #[doc = concat!("Returns the `", stringify!($ty), "`, or `self` if the node is another kind.")]
                ///
                /// # Errors
                ///
                /// Returns the node unchanged if it has another kind.
                pub fn $into(self) -> Result<$ty, Self> {
                    if let Self::$variant(element) = self {
                        Ok(element)
                    } else {
                        Err(self)
                    }
                }
            )*
        }
    };
}

node!(
    Dynamics(Rc<Dynamics>) => into_dynamics,
    Parameter(Parameter) => into_parameter,
    Constant(Constant) => into_constant,
    StateVariable(StateVariable) => into_state_variable,
    Alias(Alias) => into_alias,
    Regime(Regime) => into_regime,
    TimeDerivative(TimeDerivative) => into_time_derivative,
    OnCondition(OnCondition) => into_on_condition,
    OnEvent(OnEvent) => into_on_event,
    Trigger(Trigger) => into_trigger,
    StateAssignment(StateAssignment) => into_state_assignment,
    OutputEvent(OutputEvent) => into_output_event,
    AnalogSendPort(AnalogSendPort) => into_analog_send_port,
    AnalogReceivePort(AnalogReceivePort) => into_analog_receive_port,
    AnalogReducePort(AnalogReducePort) => into_analog_reduce_port,
    EventSendPort(EventSendPort) => into_event_send_port,
    EventReceivePort(EventReceivePort) => into_event_receive_port,
    Annotations(Annotations) => into_annotations,
    MultiDynamics(Rc<MultiDynamics>) => into_multi_dynamics,
    SubDynamics(SubDynamics) => into_sub_dynamics,
    PortExposure(PortExposure) => into_port_exposure,
    PortConnection(PortConnection) => into_port_connection,
);

/// The processed attributes and children an element is rebuilt from.
#[derive(Debug, Clone, Default)]
pub struct Parts {
    attributes: IndexMap<&'static str, AttrValue>,
    children: IndexMap<&'static str, Node>,
    plural: IndexMap<&'static str, Vec<Node>>,
}

impl Parts {
    /// Creates empty parts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, name: &'static str, value: AttrValue) {
        self.attributes.insert(name, value);
    }

    /// Sets a singular child.
    pub fn set_child(&mut self, name: &'static str, node: Node) {
        self.children.insert(name, node);
    }

    /// Sets the children of a plural slot.
    pub fn set_plural(&mut self, name: &'static str, nodes: Vec<Node>) {
        self.plural.insert(name, nodes);
    }

    fn attribute(&mut self, kind: ElementKind, name: &'static str) -> Result<AttrValue, RebuildError> {
        self.attributes
            .shift_remove(name)
            .ok_or(RebuildError::MissingAttribute {
                kind,
                attribute: name,
            })
    }

    fn text(&mut self, kind: ElementKind, name: &'static str) -> Result<String, RebuildError> {
        match self.attribute(kind, name)? {
            AttrValue::Text(text) => Ok(text),
            AttrValue::OptionalText(_)
            | AttrValue::Number(_)
            | AttrValue::Expr(_)
            | AttrValue::Entries(_) => Err(RebuildError::AttributeType {
                kind,
                attribute: name,
            }),
        }
    }

    fn optional_text(
        &mut self,
        kind: ElementKind,
        name: &'static str,
    ) -> Result<Option<String>, RebuildError> {
        match self.attribute(kind, name)? {
            AttrValue::OptionalText(text) => Ok(text),
            AttrValue::Text(_) | AttrValue::Number(_) | AttrValue::Expr(_) | AttrValue::Entries(_) => {
                Err(RebuildError::AttributeType {
                    kind,
                    attribute: name,
                })
            }
        }
    }

    fn number(&mut self, kind: ElementKind, name: &'static str) -> Result<f64, RebuildError> {
        match self.attribute(kind, name)? {
            AttrValue::Number(number) => Ok(number),
            AttrValue::Text(_)
            | AttrValue::OptionalText(_)
            | AttrValue::Expr(_)
            | AttrValue::Entries(_) => Err(RebuildError::AttributeType {
                kind,
                attribute: name,
            }),
        }
    }

    fn expr(&mut self, kind: ElementKind, name: &'static str) -> Result<Expr, RebuildError> {
        match self.attribute(kind, name)? {
            AttrValue::Expr(expr) => Ok(expr),
            AttrValue::Text(_)
            | AttrValue::OptionalText(_)
            | AttrValue::Number(_)
            | AttrValue::Entries(_) => Err(RebuildError::AttributeType {
                kind,
                attribute: name,
            }),
        }
    }

    fn entries(
        &mut self,
        kind: ElementKind,
        name: &'static str,
    ) -> Result<Vec<(String, String, String)>, RebuildError> {
        match self.attribute(kind, name)? {
            AttrValue::Entries(entries) => Ok(entries),
            AttrValue::Text(_)
            | AttrValue::OptionalText(_)
            | AttrValue::Number(_)
            | AttrValue::Expr(_) => Err(RebuildError::AttributeType {
                kind,
                attribute: name,
            }),
        }
    }

    fn optional_child<T>(
        &mut self,
        kind: ElementKind,
        name: &'static str,
        extract: fn(Node) -> Result<T, Node>,
    ) -> Result<Option<T>, RebuildError> {
        self.children
            .shift_remove(name)
            .map(|node| {
                extract(node).map_err(|node| RebuildError::ChildKind {
                    kind,
                    child: name,
                    found: node.kind(),
                })
            })
            .transpose()
    }

    fn child<T>(
        &mut self,
        kind: ElementKind,
        name: &'static str,
        extract: fn(Node) -> Result<T, Node>,
    ) -> Result<T, RebuildError> {
        self.optional_child(kind, name, extract)?
            .ok_or(RebuildError::MissingChild { kind, child: name })
    }

    fn plural<T>(
        &mut self,
        kind: ElementKind,
        name: &'static str,
        extract: fn(Node) -> Result<T, Node>,
    ) -> Result<Vec<T>, RebuildError> {
        self.plural
            .shift_remove(name)
            .unwrap_or_default()
            .into_iter()
            .map(|node| {
                extract(node).map_err(|node| RebuildError::ChildKind {
                    kind,
                    child: name,
                    found: node.kind(),
                })
            })
            .collect()
    }

    fn keyed<T>(
        &mut self,
        kind: ElementKind,
        name: &'static str,
        extract: fn(Node) -> Result<T, Node>,
        key: fn(&T) -> &str,
    ) -> Result<IndexMap<String, T>, RebuildError> {
        Ok(self
            .plural(kind, name, extract)?
            .into_iter()
            .map(|element| (key(&element).to_string(), element))
            .collect())
    }

    fn body(&mut self, kind: ElementKind) -> Result<TransitionBody, RebuildError> {
        Ok(TransitionBody::new(
            self.plural(kind, "state_assignments", Node::into_state_assignment)?,
            self.plural(kind, "output_events", Node::into_output_event)?,
            self.optional_text(kind, "target_regime")?,
        ))
    }
}

impl Node {
    /// Builds an element of `kind` from `parts`.
    ///
    /// Composites are rebuilt through [`MultiDynamics::builder`], so their
    /// regimes and synthesized aliases are recomputed.
    ///
    /// # Errors
    ///
    /// Returns a [`RebuildError`] if an attribute or required child is
    /// missing or has the wrong type, or if a composite fails to build.
    pub fn rebuild(kind: ElementKind, mut parts: Parts) -> Result<Self, RebuildError> {
        let parts = &mut parts;
        let node = match kind {
            ElementKind::Dynamics => {
                let dynamics = Dynamics::from_parts(DynamicsParts {
                    name: parts.text(kind, "name")?,
                    parameters: parts.keyed(kind, "parameters", Self::into_parameter, Parameter::name)?,
                    constants: parts.keyed(kind, "constants", Self::into_constant, Constant::name)?,
                    state_variables: parts.keyed(
                        kind,
                        "state_variables",
                        Self::into_state_variable,
                        StateVariable::name,
                    )?,
                    aliases: parts.keyed(kind, "aliases", Self::into_alias, Alias::name)?,
                    regimes: parts.keyed(kind, "regimes", Self::into_regime, Regime::name)?,
                    analog_send_ports: parts.keyed(
                        kind,
                        "analog_send_ports",
                        Self::into_analog_send_port,
                        AnalogSendPort::name,
                    )?,
                    analog_receive_ports: parts.keyed(
                        kind,
                        "analog_receive_ports",
                        Self::into_analog_receive_port,
                        AnalogReceivePort::name,
                    )?,
                    analog_reduce_ports: parts.keyed(
                        kind,
                        "analog_reduce_ports",
                        Self::into_analog_reduce_port,
                        AnalogReducePort::name,
                    )?,
                    event_send_ports: parts.keyed(
                        kind,
                        "event_send_ports",
                        Self::into_event_send_port,
                        EventSendPort::name,
                    )?,
                    event_receive_ports: parts.keyed(
                        kind,
                        "event_receive_ports",
                        Self::into_event_receive_port,
                        EventReceivePort::name,
                    )?,
                    annotations: parts
                        .optional_child(kind, "annotations", Self::into_annotations)?
                        .unwrap_or_default(),
                })
                .with_document_url(parts.optional_text(kind, "document_url")?);
                Self::Dynamics(Rc::new(dynamics))
            }
            ElementKind::Parameter => Self::Parameter(Parameter::new(parts.text(kind, "name")?)),
            ElementKind::Constant => Self::Constant(Constant::new(
                parts.text(kind, "name")?,
                parts.number(kind, "value")?,
                parts.optional_text(kind, "units")?,
            )),
            ElementKind::StateVariable => {
                Self::StateVariable(StateVariable::new(parts.text(kind, "name")?))
            }
            ElementKind::Alias => Self::Alias(Alias::new(
                parts.text(kind, "name")?,
                parts.expr(kind, "rhs")?,
            )),
            ElementKind::Regime => Self::Regime(Regime::from_parts(RegimeParts {
                name: parts.text(kind, "name")?,
                time_derivatives: parts.keyed(
                    kind,
                    "time_derivatives",
                    Self::into_time_derivative,
                    TimeDerivative::variable,
                )?,
                aliases: parts.keyed(kind, "aliases", Self::into_alias, Alias::name)?,
                on_conditions: parts.plural(kind, "on_conditions", Self::into_on_condition)?,
                on_events: parts.keyed(
                    kind,
                    "on_events",
                    Self::into_on_event,
                    OnEvent::src_port_name,
                )?,
                annotations: parts
                    .optional_child(kind, "annotations", Self::into_annotations)?
                    .unwrap_or_default(),
            })),
            ElementKind::TimeDerivative => Self::TimeDerivative(TimeDerivative::new(
                parts.text(kind, "variable")?,
                parts.expr(kind, "rhs")?,
            )),
            ElementKind::OnCondition => {
                let trigger = parts.child(kind, "trigger", Self::into_trigger)?;
                Self::OnCondition(OnCondition::new(trigger, parts.body(kind)?))
            }
            ElementKind::OnEvent => {
                let src_port = parts.text(kind, "src_port")?;
                Self::OnEvent(OnEvent::new(src_port, parts.body(kind)?))
            }
            ElementKind::Trigger => Self::Trigger(Trigger::new(parts.expr(kind, "rhs")?)),
            ElementKind::StateAssignment => Self::StateAssignment(StateAssignment::new(
                parts.text(kind, "variable")?,
                parts.expr(kind, "rhs")?,
            )),
            ElementKind::OutputEvent => Self::OutputEvent(OutputEvent::new(parts.text(kind, "port")?)),
            ElementKind::AnalogSendPort => {
                Self::AnalogSendPort(AnalogSendPort::new(parts.text(kind, "name")?))
            }
            ElementKind::AnalogReceivePort => {
                Self::AnalogReceivePort(AnalogReceivePort::new(parts.text(kind, "name")?))
            }
            ElementKind::AnalogReducePort => {
                let name = parts.text(kind, "name")?;
                let operator = match parts.text(kind, "operator")?.as_str() {
                    "+" => ReduceOp::Sum,
                    _ => {
                        return Err(RebuildError::AttributeType {
                            kind,
                            attribute: "operator",
                        });
                    }
                };
                Self::AnalogReducePort(AnalogReducePort::new(name, operator))
            }
            ElementKind::EventSendPort => {
                Self::EventSendPort(EventSendPort::new(parts.text(kind, "name")?))
            }
            ElementKind::EventReceivePort => {
                Self::EventReceivePort(EventReceivePort::new(parts.text(kind, "name")?))
            }
            ElementKind::Annotations => {
                let mut annotations = Annotations::new();
                for (namespace, key, value) in parts.entries(kind, "entries")? {
                    annotations.set(namespace, key, value);
                }
                Self::Annotations(annotations)
            }
            ElementKind::MultiDynamics => {
                let name = parts.text(kind, "name")?;
                let builder = parts
                    .plural(kind, "sub_components", Self::into_sub_dynamics)?
                    .into_iter()
                    .fold(MultiDynamics::builder(name), |builder, sub| {
                        builder.sub_component(sub.name(), Rc::clone(sub.component()))
                    });
                let builder = parts
                    .plural(kind, "port_exposures", Self::into_port_exposure)?
                    .into_iter()
                    .fold(builder, |builder, exposure| builder.exposure(exposure));
                let multi = parts
                    .plural(kind, "port_connections", Self::into_port_connection)?
                    .into_iter()
                    .fold(builder, |builder, connection| builder.connection(connection))
                    .build()?;
                Self::MultiDynamics(Rc::new(multi))
            }
            ElementKind::SubDynamics => {
                let name = parts.text(kind, "name")?;
                let component = parts.child(kind, "component", Self::into_dynamics)?;
                Self::SubDynamics(SubDynamics::new(name, component))
            }
            ElementKind::PortExposure => Self::PortExposure(PortExposure::unbound(
                parts.text(kind, "name")?,
                parts.text(kind, "sub_component")?,
                parts.text(kind, "port")?,
            )),
            ElementKind::PortConnection => Self::PortConnection(PortConnection::new(
                parts.text(kind, "sender")?,
                parts.text(kind, "send_port")?,
                parts.text(kind, "receiver")?,
                parts.text(kind, "receive_port")?,
            )),
        };
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::fixtures;

    use super::*;

    #[test]
    fn attributes_follow_the_schema() {
        let dynamics = fixtures::leaky_integrate_and_fire();
        for regime in dynamics.regimes().values() {
            for on_condition in regime.on_conditions() {
                let node = NodeRef::from(on_condition);
                let names: Vec<_> = node.attributes().into_iter().map(|(name, _)| name).collect();
                assert_eq!(names, node.kind().schema().attributes());
            }
        }

        let node = NodeRef::from(&dynamics);
        assert_eq!(node.key(), "LeakyIntegrateAndFire");
        assert_eq!(node.children("parameters").len(), 5);
        assert_eq!(node.children("nope").len(), 0);
        assert!(node.child("annotations").is_some());
        assert_eq!(
            node.attribute("document_url"),
            Some(AttrValue::OptionalText(None))
        );
    }

    #[test]
    fn rebuilding_a_leaf() {
        let mut parts = Parts::new();
        parts.set_attribute("name", AttrValue::Text("tau".to_string()));
        parts.set_attribute("value", AttrValue::Number(20.0));
        parts.set_attribute("units", AttrValue::OptionalText(Some("ms".to_string())));

        let node = Node::rebuild(ElementKind::Constant, parts).expect("parts are complete");
        assert_eq!(
            node.into_constant(),
            Ok(Constant::new("tau", 20.0, Some("ms".to_string())))
        );
    }

    #[test]
    fn rebuilding_reports_bad_parts() {
        let error = Node::rebuild(ElementKind::Parameter, Parts::new())
            .expect_err("the name is missing");
        assert_eq!(error.to_string(), "Parameter is missing its 'name' attribute");

        let mut parts = Parts::new();
        parts.set_attribute("target_regime", AttrValue::OptionalText(None));
        let error = Node::rebuild(ElementKind::OnCondition, parts).expect_err("no trigger");
        assert!(matches!(error, RebuildError::MissingChild { child: "trigger", .. }));

        let mut parts = Parts::new();
        parts.set_attribute("name", AttrValue::Number(1.0));
        let error = Node::rebuild(ElementKind::StateVariable, parts).expect_err("wrong type");
        assert!(matches!(error, RebuildError::AttributeType { .. }));
    }
}
