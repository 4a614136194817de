//! Canned components and a seeded random-component generator for tests.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Dynamics, DynamicsBuilder, OnConditionBuilder, OnEventBuilder, ReduceOp, Regime};

fn pick(names: &[String], rng: &mut StdRng) -> String {
    names[rng.random_range(0..names.len())].clone()
}

fn valid(builder: DynamicsBuilder) -> Dynamics {
    match builder.build() {
        Ok(dynamics) => dynamics,
        Err(errors) => panic!("fixture is invalid: {errors}"),
    }
}

/// A leaky integrate-and-fire cell with a refractory regime.
///
/// Two regimes, one analog reduce port `Isyn`, an analog send port `V` and an
/// event send port `spike_out`.
///
/// # Panics
///
/// Never; the component is known to be valid.
#[must_use]
pub fn leaky_integrate_and_fire() -> Dynamics {
    valid(
        Dynamics::builder("LeakyIntegrateAndFire")
            .parameters(["tau", "R", "v_threshold", "v_reset", "t_ref"])
            .state_variables(["V", "t_rpend"])
            .analog_reduce_port("Isyn", ReduceOp::Sum)
            .analog_send_port("V")
            .event_send_port("spike_out")
            .regime(
                Regime::builder("subthreshold")
                    .time_derivative("V", "(-V + R * Isyn) / tau")
                    .on_condition(
                        OnConditionBuilder::new("V > v_threshold")
                            .assign("V", "v_reset")
                            .assign("t_rpend", "t + t_ref")
                            .emit("spike_out")
                            .goto("refractory"),
                    ),
            )
            .regime(
                Regime::builder("refractory")
                    .on_condition(OnConditionBuilder::new("t > t_rpend").goto("subthreshold")),
            ),
    )
}

/// An exponentially decaying conductance synapse.
///
/// One regime, an event receive port `spike`, an analog receive port `V` and
/// an analog send port `Isyn`.
///
/// # Panics
///
/// Never; the component is known to be valid.
#[must_use]
pub fn exponential_synapse() -> Dynamics {
    valid(
        Dynamics::builder("ExponentialSynapse")
            .parameters(["tau", "weight", "E_rev"])
            .state_variable("g")
            .alias("Isyn", "g * (E_rev - V)")
            .analog_receive_port("V")
            .analog_send_port("Isyn")
            .event_receive_port("spike")
            .regime(
                Regime::builder("default")
                    .time_derivative("g", "-g / tau")
                    .on_event(OnEventBuilder::new("spike").assign("g", "g + weight")),
            ),
    )
}

/// A gating variable that cycles through three regimes.
///
/// # Panics
///
/// Never; the component is known to be valid.
#[must_use]
pub fn three_state_channel() -> Dynamics {
    valid(
        Dynamics::builder("ThreeStateChannel")
            .parameters(["alpha", "beta", "theta"])
            .state_variable("m")
            .analog_receive_port("V")
            .analog_send_port("m")
            .regime(
                Regime::builder("closed")
                    .time_derivative("m", "-alpha * m")
                    .on_condition(OnConditionBuilder::new("V > theta").goto("open")),
            )
            .regime(
                Regime::builder("open")
                    .time_derivative("m", "beta * (1 - m)")
                    .on_condition(OnConditionBuilder::new("m > 0.9").goto("inactivated")),
            )
            .regime(
                Regime::builder("inactivated")
                    .time_derivative("m", "-beta * m")
                    .on_condition(OnConditionBuilder::new("V < theta").goto("closed")),
            ),
    )
}

/// The Izhikevich neuron.
///
/// # Panics
///
/// Never; the component is known to be valid.
#[must_use]
pub fn izhikevich() -> Dynamics {
    valid(
        Dynamics::builder("Izhikevich")
            .parameters(["a", "b", "c", "d", "theta"])
            .state_variables(["U", "V"])
            .alias("dV", "0.04 * V^2 + 5 * V + 140 - U + Isyn")
            .analog_reduce_port("Isyn", ReduceOp::Sum)
            .analog_send_port("V")
            .event_send_port("spike")
            .regime(
                Regime::builder("subthreshold")
                    .time_derivative("V", "dV")
                    .time_derivative("U", "a * (b * V - U)")
                    .on_condition(
                        OnConditionBuilder::new("V > theta")
                            .assign("V", "c")
                            .assign("U", "U + d")
                            .emit("spike"),
                    ),
            ),
    )
}

/// A regular spike source.
///
/// # Panics
///
/// Never; the component is known to be valid.
#[must_use]
pub fn spike_source() -> Dynamics {
    valid(
        Dynamics::builder("SpikeSource")
            .parameter("rate")
            .state_variable("t_next")
            .event_send_port("spike_out")
            .regime(
                Regime::builder("default")
                    .time_derivative("t_next", "0")
                    .on_condition(
                        OnConditionBuilder::new("t > t_next")
                            .assign("t_next", "t + 1 / rate")
                            .emit("spike_out"),
                    ),
            ),
    )
}

/// Generates a valid random component from `seed`.
///
/// The same seed always produces the same component.
///
/// # Panics
///
/// Never; generated components only refer to names they define.
#[must_use]
pub fn random_dynamics(seed: u64) -> Dynamics {
    let mut rng = StdRng::seed_from_u64(seed);

    let parameters: Vec<_> = (0..rng.random_range(1..=4)).map(|i| format!("p{i}")).collect();
    let state_variables: Vec<_> = (0..rng.random_range(1..=3)).map(|i| format!("x{i}")).collect();
    let regimes: Vec<_> = (0..rng.random_range(1..=3)).map(|i| format!("r{i}")).collect();

    let mut builder = Dynamics::builder(format!("Random{seed}"))
        .parameters(parameters.iter().map(String::as_str))
        .state_variables(state_variables.iter().map(String::as_str))
        .event_send_port("out");

    // each alias only refers to names defined before it
    let mut defined: Vec<String> = parameters.iter().chain(&state_variables).cloned().collect();
    for i in 0..rng.random_range(0..=3) {
        let name = format!("a{i}");
        let rhs = format!("{} * {} + {i}", pick(&defined, &mut rng), pick(&defined, &mut rng));
        builder = builder.alias(&name, rhs.as_str());
        defined.push(name);
    }

    for variable in &state_variables {
        builder = builder.analog_send_port(variable);
    }

    for regime_name in &regimes {
        let mut regime = Regime::builder(regime_name.as_str());
        for variable in &state_variables {
            let rhs = format!("-{variable} / {}", pick(&parameters, &mut rng));
            regime = regime.time_derivative(variable, rhs.as_str());
        }

        for _ in 0..rng.random_range(0..=2) {
            let trigger = format!(
                "{} > {}",
                pick(&state_variables, &mut rng),
                pick(&parameters, &mut rng)
            );
            let mut transition = OnConditionBuilder::new(trigger.as_str())
                .assign(&pick(&state_variables, &mut rng), pick(&defined, &mut rng).as_str())
                .goto(pick(&regimes, &mut rng));
            if rng.random_bool(0.5) {
                transition = transition.emit("out");
            }
            regime = regime.on_condition(transition);
        }

        builder = builder.regime(regime);
    }

    valid(builder)
}
