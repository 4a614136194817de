//! Inferring a component's interface from the way its elements are used.

use std::convert::Infallible;

use indexmap::IndexSet;
use nineml_expr::is_reserved;
use nineml_ir::{
    Dynamics, DynamicsBuilder, ExpressionElement, Parameter, ValidationErrors, validate,
};
use nineml_visitor::{Crumb, NodeRef, Results, Visitor, walk};

/// The interface of a component as implied by its expressions and
/// transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredInterface {
    parameters: IndexSet<String>,
    state_variables: IndexSet<String>,
    event_send_ports: IndexSet<String>,
    event_receive_ports: IndexSet<String>,
}

impl InferredInterface {
    /// Returns the symbols that are used but not defined by anything else,
    /// in order of first use.
    #[must_use]
    pub const fn parameters(&self) -> &IndexSet<String> {
        &self.parameters
    }

    /// Returns the variables that have a time derivative or are assigned by
    /// a transition.
    #[must_use]
    pub const fn state_variables(&self) -> &IndexSet<String> {
        &self.state_variables
    }

    /// Returns the ports that output events are emitted on.
    #[must_use]
    pub const fn event_send_ports(&self) -> &IndexSet<String> {
        &self.event_send_ports
    }

    /// Returns the ports that on-events listen to.
    #[must_use]
    pub const fn event_receive_ports(&self) -> &IndexSet<String> {
        &self.event_receive_ports
    }
}

/// Collects, in one walk, every symbol used on a right-hand side or in a
/// trigger and every name that defines one.
///
/// State variables, aliases, constants and analog receive and reduce ports
/// define symbols. Declared parameters do not: a used symbol that nothing
/// else defines is inferred to be a parameter.
#[derive(Debug, Default)]
pub struct InterfaceInferer {
    declared: IndexSet<String>,
    atoms: IndexSet<String>,
    interface: InferredInterface,
}

impl InterfaceInferer {
    /// Infers the interface of `dynamics`.
    #[must_use]
    pub fn infer(dynamics: &Dynamics) -> InferredInterface {
        let mut inferer = Self::default();
        let Ok(()) = walk(&mut inferer, NodeRef::from(dynamics));
        inferer.finish()
    }

    fn finish(mut self) -> InferredInterface {
        self.interface.parameters = self
            .atoms
            .into_iter()
            .filter(|atom| !self.declared.contains(atom) && !is_reserved(atom))
            .collect();
        self.interface
    }

    fn uses(&mut self, element: &impl ExpressionElement) {
        self.atoms.extend(element.rhs_symbols());
    }

    fn defines(&mut self, name: &str) {
        self.declared.insert(name.to_string());
    }

    fn defines_state_variable(&mut self, name: &str) {
        self.defines(name);
        self.interface.state_variables.insert(name.to_string());
    }
}

impl Visitor for InterfaceInferer {
    type Output = ();
    type Error = Infallible;

    fn post_visit(
        &mut self,
        node: NodeRef<'_>,
        _results: Results<()>,
        _path: &[Crumb],
    ) -> Result<(), Infallible> {
        match node {
            NodeRef::StateVariable(state_variable) => self.defines(state_variable.name()),
            NodeRef::Constant(constant) => self.defines(constant.name()),
            NodeRef::AnalogReceivePort(port) => self.defines(port.name()),
            NodeRef::AnalogReducePort(port) => self.defines(port.name()),
            NodeRef::Alias(alias) => {
                self.defines(alias.name());
                self.uses(alias);
            }
            NodeRef::TimeDerivative(derivative) => {
                self.defines_state_variable(derivative.variable());
                self.uses(derivative);
            }
            NodeRef::StateAssignment(assignment) => {
                self.defines_state_variable(assignment.variable());
                self.uses(assignment);
            }
            NodeRef::Trigger(trigger) => self.uses(trigger),
            NodeRef::OutputEvent(event) => {
                self.interface
                    .event_send_ports
                    .insert(event.port_name().to_string());
            }
            NodeRef::OnEvent(on_event) => {
                self.interface
                    .event_receive_ports
                    .insert(on_event.src_port_name().to_string());
            }
            NodeRef::Dynamics(_)
            | NodeRef::Parameter(_)
            | NodeRef::Regime(_)
            | NodeRef::OnCondition(_)
            | NodeRef::AnalogSendPort(_)
            | NodeRef::EventSendPort(_)
            | NodeRef::EventReceivePort(_)
            | NodeRef::Annotations(_)
            | NodeRef::MultiDynamics(_)
            | NodeRef::SubDynamics(_)
            | NodeRef::PortExposure(_)
            | NodeRef::PortConnection(_) => {}
        }
        Ok(())
    }
}

/// Builds a component, declaring every inferred parameter that `builder`
/// does not already declare.
///
/// # Errors
///
/// Returns every problem found with the completed component.
pub fn build_with_inferred_parameters(
    builder: DynamicsBuilder,
) -> Result<Dynamics, ValidationErrors> {
    let dynamics = builder.build_unvalidated()?;
    let interface = InterfaceInferer::infer(&dynamics);

    let mut parts = dynamics.into_parts();
    for name in interface.parameters() {
        if !parts.parameters.contains_key(name) {
            log::debug!("inferred parameter '{name}' of '{}'", parts.name);
            parts
                .parameters
                .insert(name.clone(), Parameter::new(name.as_str()));
        }
    }

    let dynamics = Dynamics::from_parts(parts);
    validate::validate(&dynamics)?;
    Ok(dynamics)
}

#[cfg(test)]
mod tests {
    use nineml_ir::{OnConditionBuilder, OnEventBuilder, Regime, fixtures};

    use super::*;

    fn sorted(names: &IndexSet<String>) -> Vec<&str> {
        let mut names: Vec<_> = names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn infers_the_interface_of_a_cell() {
        let interface = InterfaceInferer::infer(&fixtures::leaky_integrate_and_fire());

        assert_eq!(
            sorted(interface.parameters()),
            ["R", "t_ref", "tau", "v_reset", "v_threshold"]
        );
        assert_eq!(sorted(interface.state_variables()), ["V", "t_rpend"]);
        assert_eq!(sorted(interface.event_send_ports()), ["spike_out"]);
        assert!(interface.event_receive_ports().is_empty());
    }

    #[test]
    fn aliases_and_ports_are_not_parameters() {
        let interface = InterfaceInferer::infer(&fixtures::exponential_synapse());

        assert_eq!(sorted(interface.parameters()), ["E_rev", "tau", "weight"]);
        assert_eq!(sorted(interface.event_receive_ports()), ["spike"]);
    }

    #[test]
    fn missing_parameters_are_declared() {
        let builder = Dynamics::builder("Leaky")
            .parameter("tau")
            .state_variable("V")
            .analog_receive_port("I")
            .event_send_port("spike")
            .regime(
                Regime::builder("default")
                    .time_derivative("V", "(I - V) / tau")
                    .on_condition(
                        OnConditionBuilder::new("V > theta")
                            .assign("V", "v_reset")
                            .emit("spike"),
                    ),
            );

        assert!(builder.clone().build().is_err());

        let dynamics = build_with_inferred_parameters(builder).expect("parameters are inferred");
        let names: Vec<_> = dynamics.parameters().keys().map(String::as_str).collect();
        assert_eq!(names, ["tau", "theta", "v_reset"]);
    }

    #[test]
    fn inference_does_not_hide_other_problems() {
        let builder = Dynamics::builder("Broken")
            .state_variable("x")
            .event_receive_port("input")
            .regime(
                Regime::builder("default")
                    .time_derivative("x", "-x / tau")
                    .on_event(OnEventBuilder::new("input").assign("y", "1")),
            );

        let errors = build_with_inferred_parameters(builder).expect_err("y is not a state variable");
        assert_eq!(errors.len(), 1);
    }
}
