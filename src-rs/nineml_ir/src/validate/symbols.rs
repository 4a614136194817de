use std::collections::HashSet;

use nineml_expr::is_reserved;

use crate::{
    Dynamics,
    expression::ExpressionElement,
    port::PortKind,
    regime::{Regime, Transition},
};

use super::ValidationError;

struct Scope<'a> {
    dynamics: &'a Dynamics,
    top_level: HashSet<&'a str>,
}

impl<'a> Scope<'a> {
    fn new(dynamics: &'a Dynamics) -> Self {
        let top_level = dynamics
            .input_names()
            .chain(dynamics.state_variables().keys().map(String::as_str))
            .chain(dynamics.aliases().keys().map(String::as_str))
            .collect();
        Self {
            dynamics,
            top_level,
        }
    }

    fn resolves(&self, symbol: &str, regime: Option<&Regime>) -> bool {
        is_reserved(symbol)
            || self.top_level.contains(symbol)
            || regime.is_some_and(|regime| regime.aliases().contains_key(symbol))
    }

    fn check_rhs(
        &self,
        element: &dyn ExpressionElement,
        regime: Option<&Regime>,
        description: impl Fn() -> String,
        errors: &mut Vec<ValidationError>,
    ) {
        for symbol in element.rhs_symbols() {
            if !self.resolves(&symbol, regime) {
                errors.push(ValidationError::UnresolvedSymbol {
                    symbol,
                    element: description(),
                });
            }
        }
    }

    fn check_state_variable(
        &self,
        name: &str,
        description: impl Fn() -> String,
        errors: &mut Vec<ValidationError>,
    ) {
        if !self.dynamics.state_variables().contains_key(name) {
            errors.push(ValidationError::NotAStateVariable {
                name: name.to_string(),
                element: description(),
            });
        }
    }

    fn check_transition(
        &self,
        regime: &Regime,
        transition: &dyn Transition,
        description: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        for (variable, assignment) in transition.state_assignments() {
            let describe = || format!("state assignment of '{variable}' in {description}");
            self.check_state_variable(variable, describe, errors);
            self.check_rhs(assignment, Some(regime), describe, errors);
        }

        for port in transition.output_events().keys() {
            if self.dynamics.event_send_port(port).is_err() {
                errors.push(ValidationError::UndefinedPort {
                    port: port.clone(),
                    expected: PortKind::EventSend,
                    element: format!("output event of {description}"),
                });
            }
        }

        if let Some(target) = transition.target_regime_name()
            && self.dynamics.regime(target).is_err()
        {
            errors.push(ValidationError::UndefinedRegime {
                target: target.to_string(),
                source_regime: regime.name().to_string(),
            });
        }
    }
}

/// Reports references to names that are not defined.
///
/// Right-hand sides may refer to parameters, constants, state variables,
/// top-level aliases, analog receive and reduce ports, reserved identifiers
/// and the aliases of their own regime. Time derivatives and state
/// assignments must name state variables, output events must name event send
/// ports, on-events must name event receive ports and transitions must
/// target existing regimes.
#[must_use]
pub fn check_unresolved_symbols(dynamics: &Dynamics) -> Vec<ValidationError> {
    let scope = Scope::new(dynamics);
    let mut errors = Vec::new();

    for alias in dynamics.aliases().values() {
        let describe = || format!("alias '{}'", alias.name());
        scope.check_rhs(alias, None, describe, &mut errors);
    }

    for regime in dynamics.regimes().values() {
        let regime_name = regime.name();

        for alias in regime.aliases().values() {
            let describe = || format!("alias '{}' of regime '{regime_name}'", alias.name());
            scope.check_rhs(alias, Some(regime), describe, &mut errors);
        }

        for (variable, derivative) in regime.time_derivatives() {
            let describe = || format!("time derivative of '{variable}' in regime '{regime_name}'");
            scope.check_state_variable(variable, describe, &mut errors);
            scope.check_rhs(derivative, Some(regime), describe, &mut errors);
        }

        for transition in regime.on_conditions() {
            let description = format!("on-condition '{}' of regime '{regime_name}'", transition.key());
            let describe = || format!("trigger of {description}");
            scope.check_rhs(transition.trigger(), Some(regime), describe, &mut errors);
            scope.check_transition(regime, transition, &description, &mut errors);
        }

        for (port, transition) in regime.on_events() {
            let description = format!("on-event '{port}' of regime '{regime_name}'");
            if dynamics.event_receive_port(port).is_err() {
                errors.push(ValidationError::UndefinedPort {
                    port: port.clone(),
                    expected: PortKind::EventReceive,
                    element: description.clone(),
                });
            }
            scope.check_transition(regime, transition, &description, &mut errors);
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::{OnConditionBuilder, OnEventBuilder};

    fn check(dynamics: &crate::DynamicsBuilder) -> Vec<String> {
        let dynamics = dynamics
            .clone()
            .build_unvalidated()
            .expect("builder should accept the component");
        check_unresolved_symbols(&dynamics)
            .into_iter()
            .map(|error| error.to_string())
            .collect()
    }

    #[test]
    fn resolved_component() {
        let dynamics = Dynamics::builder("Ok")
            .parameter("tau")
            .state_variable("V")
            .analog_receive_port("I")
            .alias("drive", "I * 2")
            .event_receive_port("spike_in")
            .regime(
                Regime::builder("r")
                    .alias("leak", "V / tau")
                    .time_derivative("V", "drive - leak + sin(2 * pi * t)")
                    .on_event(OnEventBuilder::new("spike_in").assign("V", "V + 1")),
            );

        assert!(check(&dynamics).is_empty());
    }

    #[test]
    fn undefined_symbol() {
        let dynamics = Dynamics::builder("Missing")
            .state_variable("V")
            .regime(Regime::builder("r").time_derivative("V", "-V / tau"));

        assert_eq!(
            check(&dynamics),
            ["'tau' in time derivative of 'V' in regime 'r' is not defined"]
        );
    }

    #[test]
    fn regime_alias_is_local() {
        let dynamics = Dynamics::builder("Local")
            .state_variable("V")
            .regime(Regime::builder("a").alias("k", "1").time_derivative("V", "k"))
            .regime(Regime::builder("b").time_derivative("V", "k"));

        assert_eq!(
            check(&dynamics),
            ["'k' in time derivative of 'V' in regime 'b' is not defined"]
        );
    }

    #[test]
    fn bad_transitions() {
        let dynamics = Dynamics::builder("Transitions")
            .parameter("x")
            .state_variable("V")
            .regime(
                Regime::builder("r")
                    .time_derivative("x", "1")
                    .on_condition(
                        OnConditionBuilder::new("V > 1")
                            .assign("x", "0")
                            .emit("spike")
                            .goto("nowhere"),
                    )
                    .on_event(OnEventBuilder::new("input")),
            );

        assert_eq!(
            check(&dynamics),
            [
                "time derivative of 'x' in regime 'r' refers to 'x', which is not a state variable",
                "state assignment of 'x' in on-condition 'V > 1' of regime 'r' refers to 'x', which is not a state variable",
                "output event of on-condition 'V > 1' of regime 'r' refers to undefined event send port 'spike'",
                "a transition of regime 'r' targets undefined regime 'nowhere'",
                "on-event 'input' of regime 'r' refers to undefined event receive port 'input'",
            ]
        );
    }
}
