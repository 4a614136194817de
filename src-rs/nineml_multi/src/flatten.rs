//! Flattening a composite into a plain component.
//!
//! Every composite regime becomes one regime. An event that a sub-component
//! emits and another consumes never leaves the composite: the receiving
//! on-event is merged into the transition that emitted the event, following
//! chains of such events until no new receiver is reached.

use std::collections::HashSet;

use indexmap::IndexMap;
use nineml_ir::{
    Alias, Assignment, Constant, DynamicsParts, ExpressionElement, OnCondition, OnEvent,
    OutputEvent, Parameter, Port, Regime, RegimeParts, StateAssignment, StateVariable,
    TimeDerivative, Transition, TransitionBody, Trigger, ValidationError,
};

use crate::{
    MultiDynamics, PortConnection,
    multi_regime::{MultiRegime, multi_regime_name},
    namespace::Namespaced,
};

/// Flattens `multi`, returning the parts of the flat component and any
/// names that collided on the way.
pub fn flatten(multi: &MultiDynamics) -> (DynamicsParts, Vec<ValidationError>) {
    let mut flattener = Flattener::new(multi);
    flattener.top_level();
    flattener.ports();
    flattener.regimes();
    (flattener.parts, flattener.errors)
}

fn insert<T>(
    map: &mut IndexMap<String, T>,
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    name: String,
    value: T,
) {
    if map.contains_key(&name) {
        errors.push(ValidationError::duplicate(&name, kind, kind));
    } else {
        map.insert(name, value);
    }
}

struct Flattener<'a> {
    multi: &'a MultiDynamics,
    parts: DynamicsParts,
    errors: Vec<ValidationError>,
    // exposure names of each event send port, by qualified port name
    event_send_exposures: IndexMap<String, Vec<&'a str>>,
    // internal connections leaving each event send port, by qualified port name
    event_targets: IndexMap<String, Vec<&'a PortConnection>>,
}

/// The effects of one transition and every event chain it sets off.
struct Firing {
    targets: Vec<String>,
    assignments: IndexMap<String, StateAssignment>,
    outputs: IndexMap<String, OutputEvent>,
    visited: HashSet<(usize, String)>,
    errors: Vec<ValidationError>,
}

impl<'a> Flattener<'a> {
    fn new(multi: &'a MultiDynamics) -> Self {
        let mut event_send_exposures: IndexMap<String, Vec<&'a str>> = IndexMap::new();
        for exposure in multi.event_send_ports() {
            event_send_exposures
                .entry(exposure.qualified_port_name().to_string())
                .or_default()
                .push(exposure.name());
        }

        let mut event_targets: IndexMap<String, Vec<&'a PortConnection>> = IndexMap::new();
        for connection in multi.event_port_connections().values().flat_map(IndexMap::values) {
            event_targets
                .entry(connection.qualified_send_port())
                .or_default()
                .push(connection);
        }

        Self {
            multi,
            parts: DynamicsParts {
                name: multi.name().to_string(),
                ..DynamicsParts::default()
            },
            errors: Vec::new(),
            event_send_exposures,
            event_targets,
        }
    }

    fn top_level(&mut self) {
        let parts = &mut self.parts;
        let errors = &mut self.errors;

        for parameter in self.multi.parameters() {
            let name = parameter.name();
            insert(&mut parts.parameters, errors, "parameter", name.clone(), Parameter::new(name));
        }
        for constant in self.multi.constants() {
            let name = constant.name();
            let flat = Constant::new(
                name.as_str(),
                constant.element().value(),
                constant.element().units().map(str::to_string),
            );
            insert(&mut parts.constants, errors, "constant", name, flat);
        }
        for state_variable in self.multi.state_variables() {
            let name = state_variable.name();
            let flat = StateVariable::new(name.as_str());
            insert(&mut parts.state_variables, errors, "state variable", name, flat);
        }
        for alias in self.multi.aliases() {
            let name = alias.name();
            let flat = Alias::new(name.as_str(), alias.rhs().into_owned());
            insert(&mut parts.aliases, errors, "alias", name, flat);
        }
    }

    fn ports(&mut self) {
        let parts = &mut self.parts;
        let errors = &mut self.errors;

        for exposure in self.multi.port_exposures() {
            let name = exposure.name().to_string();
            match exposure.exposed_port() {
                Port::AnalogSend(port) => {
                    insert(&mut parts.analog_send_ports, errors, "port", name, port);
                }
                Port::AnalogReceive(port) => {
                    insert(&mut parts.analog_receive_ports, errors, "port", name, port);
                }
                Port::AnalogReduce(port) => {
                    insert(&mut parts.analog_reduce_ports, errors, "port", name, port);
                }
                Port::EventSend(port) => {
                    insert(&mut parts.event_send_ports, errors, "port", name, port);
                }
                Port::EventReceive(port) => {
                    insert(&mut parts.event_receive_ports, errors, "port", name, port);
                }
            }
        }
    }

    fn regimes(&mut self) {
        for regime in self.multi.regimes() {
            let (flat, errors) = self.regime(&regime);
            self.errors.extend(errors);
            let name = flat.name().to_string();
            insert(&mut self.parts.regimes, &mut self.errors, "regime", name, flat);
        }
    }

    fn regime(&self, regime: &MultiRegime<'a>) -> (Regime, Vec<ValidationError>) {
        let mut errors = Vec::new();
        let mut parts = RegimeParts {
            name: regime.name().to_string(),
            ..RegimeParts::default()
        };

        for derivative in regime.time_derivatives() {
            let variable = derivative.lhs().into_owned();
            let flat = TimeDerivative::new(variable.as_str(), derivative.rhs().into_owned());
            insert(&mut parts.time_derivatives, &mut errors, "time derivative", variable, flat);
        }
        for alias in regime.aliases() {
            let name = alias.lhs().into_owned();
            let flat = Alias::new(name.as_str(), alias.rhs().into_owned());
            insert(&mut parts.aliases, &mut errors, "alias", name, flat);
        }

        for (slot, sub_regime) in regime.sub_regimes().iter().enumerate() {
            for on_condition in sub_regime.on_conditions() {
                let trigger = on_condition.trigger();
                let (body, body_errors) = self.fire_from(regime, slot, on_condition.element(), None);
                errors.extend(body_errors);
                parts.on_conditions.push(OnCondition::new(
                    Trigger::new(trigger.rhs().into_owned()),
                    body,
                ));
            }
        }

        for exposure in self.multi.event_receive_ports() {
            let Some(slot) = regime
                .sub_regimes()
                .iter()
                .position(|sub_regime| sub_regime.sub_component().name() == exposure.component_name())
            else {
                continue;
            };
            let sub_regime = regime.sub_regimes()[slot];
            let Some(on_event) = sub_regime.element().on_event(exposure.port_name()) else {
                continue;
            };
            let (body, body_errors) =
                self.fire_from(regime, slot, on_event, Some(exposure.port_name()));
            errors.extend(body_errors);
            let name = exposure.name().to_string();
            let flat = OnEvent::new(name.as_str(), body);
            insert(&mut parts.on_events, &mut errors, "on-event", name, flat);
        }

        (Regime::from_parts(parts), errors)
    }

    fn fire_from(
        &self,
        regime: &MultiRegime<'a>,
        slot: usize,
        transition: &dyn Transition,
        received: Option<&str>,
    ) -> (TransitionBody, Vec<ValidationError>) {
        let mut firing = Firing {
            targets: regime
                .sub_regimes()
                .iter()
                .map(|sub_regime| sub_regime.element().name().to_string())
                .collect(),
            assignments: IndexMap::new(),
            outputs: IndexMap::new(),
            visited: HashSet::new(),
            errors: Vec::new(),
        };
        if let Some(port) = received {
            firing.visited.insert((slot, port.to_string()));
        }

        self.fire(regime, slot, transition, &mut firing);

        let targets: Vec<String> = regime
            .sub_regimes()
            .iter()
            .zip(&firing.targets)
            .map(|(sub_regime, target)| sub_regime.sub_component().append_namespace(target))
            .collect();
        let body = TransitionBody::new(
            firing.assignments.into_values(),
            firing.outputs.into_values(),
            Some(multi_regime_name(&targets)),
        );
        (body, firing.errors)
    }

    fn fire(
        &self,
        regime: &MultiRegime<'a>,
        slot: usize,
        transition: &dyn Transition,
        firing: &mut Firing,
    ) {
        let sub_regime = regime.sub_regimes()[slot];
        let sub = sub_regime.sub_component();

        if let Some(target) = transition.target_regime_name() {
            firing.targets[slot] = target.to_string();
        }

        for assignment in transition.state_assignments().values() {
            let view = Namespaced::in_regime(sub, sub_regime.element().name(), assignment);
            let variable = view.lhs().into_owned();
            let flat = StateAssignment::new(variable.as_str(), view.rhs().into_owned());
            insert(
                &mut firing.assignments,
                &mut firing.errors,
                "state assignment",
                variable,
                flat,
            );
        }

        for port in transition.output_events().keys() {
            let qualified = sub.append_namespace(port);

            for exposure in self.event_send_exposures.get(&qualified).into_iter().flatten() {
                firing
                    .outputs
                    .insert((*exposure).to_string(), OutputEvent::new(*exposure));
            }

            for connection in self.event_targets.get(&qualified).into_iter().flatten() {
                let Some(receiver) = regime
                    .sub_regimes()
                    .iter()
                    .position(|sub_regime| sub_regime.sub_component().name() == connection.receiver())
                else {
                    continue;
                };
                if !firing
                    .visited
                    .insert((receiver, connection.receive_port().to_string()))
                {
                    continue;
                }
                log::trace!("merging {connection} into '{}'", regime.name());

                // the receiver reacts in the regime it was in before the transition
                let receiving = regime.sub_regimes()[receiver].element();
                if let Some(on_event) = receiving.on_event(connection.receive_port()) {
                    self.fire(regime, receiver, on_event, firing);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::{Dynamics, fixtures, validate};

    use super::*;

    fn network() -> MultiDynamics {
        MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .connect("cell", "spike_out", "syn", "spike")
            .expose("spike", "cell", "spike_out")
            .build()
            .expect("network should be valid")
    }

    #[test]
    fn internal_events_merge_into_the_emitting_transition() {
        let flat = network().flatten();
        let regime = flat
            .regime("subthreshold_cell___default_syn")
            .expect("regime should exist");

        let [on_condition] = regime.on_conditions() else {
            panic!("expected exactly one on-condition");
        };
        assert_eq!(on_condition.trigger().rhs().to_string(), "V_cell > v_threshold_cell");

        let assigned: Vec<_> = on_condition
            .state_assignments()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(assigned, ["V_cell", "t_rpend_cell", "g_syn"]);
        assert_eq!(
            on_condition.state_assignments()["g_syn"].rhs().to_string(),
            "g_syn + weight_syn"
        );

        let emitted: Vec<_> = on_condition.output_events().keys().map(String::as_str).collect();
        assert_eq!(emitted, ["spike"]);
        assert_eq!(
            on_condition.target_regime_name(),
            Some("refractory_cell___default_syn")
        );
    }

    #[test]
    fn unexposed_event_receive_ports_are_dropped() {
        let flat = network().flatten();
        assert_eq!(flat.num_event_receive_ports(), 0);
        for regime in flat.regimes().values() {
            assert!(regime.on_events().is_empty());
        }
    }

    #[test]
    fn exposed_event_receive_ports_keep_their_on_events() {
        let multi = MultiDynamics::builder("Driven")
            .sub_component("syn", fixtures::exponential_synapse())
            .expose("V", "syn", "V")
            .expose("input", "syn", "spike")
            .build()
            .expect("synapse should be valid");

        let flat = multi.flatten();
        let regime = flat.regime("default_syn").expect("regime should exist");
        let on_event = regime.on_event("input").expect("on-event should be kept");
        assert_eq!(on_event.src_port_name(), "input");
        assert!(on_event.state_assignments().contains_key("g_syn"));
        assert_eq!(on_event.target_regime_name(), Some("default_syn"));
    }

    #[test]
    fn flat_components_validate_and_nest() {
        let inner = network().flatten();
        validate::validate(&inner).expect("flattened network should be valid");

        let outer = MultiDynamics::builder("Outer")
            .sub_component("net", inner)
            .sub_component("src", fixtures::spike_source())
            .build()
            .expect("nested composite should be valid");

        assert!(outer.parameter("tau_cell_net").is_ok());
        assert_eq!(outer.num_regimes(), 2);
        // composite regime names are already unique and keep their spelling
        let flat: Dynamics = outer.flatten();
        assert!(
            flat.regimes()
                .contains_key("subthreshold_cell___default_syn___default_src")
        );
    }

    #[test]
    fn event_cycles_terminate() {
        let echo = Dynamics::builder("Echo")
            .state_variable("n")
            .event_send_port("out")
            .event_receive_port("in")
            .regime(
                Regime::builder("default")
                    .time_derivative("n", "0")
                    .on_condition(nineml_ir::OnConditionBuilder::new("n > 1").emit("out"))
                    .on_event(
                        nineml_ir::OnEventBuilder::new("in")
                            .assign("n", "n + 1")
                            .emit("out"),
                    ),
            )
            .build()
            .expect("echo should be valid");

        let multi = MultiDynamics::builder("Ring")
            .sub_component("a", echo.clone())
            .sub_component("b", echo)
            .connect("a", "out", "b", "in")
            .connect("b", "out", "a", "in")
            .build()
            .expect("ring should be valid");

        let flat = multi.flatten();
        let regime = flat
            .regime("default_a___default_b")
            .expect("regime should exist");
        let first = &regime.on_conditions()[0];
        let assigned: Vec<_> = first.state_assignments().keys().map(String::as_str).collect();
        assert_eq!(assigned, ["n_b", "n_a"]);
    }
}
