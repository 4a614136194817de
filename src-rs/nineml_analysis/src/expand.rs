//! Rewriting expressions in terms of inputs only.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use nineml_expr::{Expr, is_reserved};
use nineml_ir::{
    Alias, Dynamics, ExpressionElement, OnCondition, OnEvent, Regime, RegimeParts,
    StateAssignment, TimeDerivative, Transition, TransitionBody, Trigger, ValidationErrors,
    validate,
};

/// Expanded alias expressions, keyed by the regime they were expanded in
/// (`None` for top-level aliases) and the alias name.
///
/// The cache belongs to the caller. It is only valid for the component it
/// was filled from; a rebuilt component needs a fresh cache.
#[derive(Debug, Clone, Default)]
pub struct ExpansionCache {
    entries: IndexMap<(Option<String>, String), Expr>,
    hits: usize,
}

impl ExpansionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the expansion of the alias `name`.
    #[must_use]
    pub fn get(&self, regime: Option<&str>, name: &str) -> Option<&Expr> {
        self.entries
            .get(&(regime.map(str::to_string), name.to_string()))
    }

    fn lookup(&mut self, regime: Option<&str>, name: &str) -> Option<Expr> {
        let expr = self.get(regime, name).cloned()?;
        self.hits += 1;
        log::trace!("expansion of '{name}' found in the cache");
        Some(expr)
    }

    fn insert(&mut self, regime: Option<&str>, name: &str, expr: Expr) {
        self.entries
            .insert((regime.map(str::to_string), name.to_string()), expr);
    }

    /// Returns the number of cached expansions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns how many lookups were answered by the cache.
    #[must_use]
    pub const fn hits(&self) -> usize {
        self.hits
    }
}

/// Substitutes aliases by their right-hand sides until expressions refer
/// only to inputs: parameters, constants, analog receive and reduce ports,
/// state variables and reserved identifiers.
///
/// Inside a regime, the regime's own aliases are expanded as well as the
/// top-level ones.
#[derive(Debug)]
pub struct ExpressionExpander<'a> {
    dynamics: &'a Dynamics,
    cache: ExpansionCache,
}

impl<'a> ExpressionExpander<'a> {
    /// Creates an expander with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns the recursive aliases of `dynamics`, which cannot be
    /// expanded.
    pub fn new(dynamics: &'a Dynamics) -> Result<Self, ValidationErrors> {
        Self::with_cache(dynamics, ExpansionCache::new())
    }

    /// Creates an expander that reuses `cache`.
    ///
    /// # Errors
    ///
    /// Returns the recursive aliases of `dynamics`, which cannot be
    /// expanded.
    pub fn with_cache(
        dynamics: &'a Dynamics,
        cache: ExpansionCache,
    ) -> Result<Self, ValidationErrors> {
        let errors = validate::check_recursive_aliases(dynamics);
        if !errors.is_empty() {
            return Err(ValidationErrors::new(dynamics.name().to_string(), errors));
        }
        Ok(Self { dynamics, cache })
    }

    /// Returns the cache.
    #[must_use]
    pub const fn cache(&self) -> &ExpansionCache {
        &self.cache
    }

    /// Consumes the expander, returning its cache.
    #[must_use]
    pub fn into_cache(self) -> ExpansionCache {
        self.cache
    }

    fn regime(&self, regime: Option<&str>) -> Option<&'a Regime> {
        regime.and_then(|name| self.dynamics.regime(name).ok())
    }

    /// Returns the alias called `name` as seen from `regime`, and the regime
    /// it belongs to.
    fn resolve(
        &self,
        regime: Option<&str>,
        name: &str,
    ) -> Option<(Option<&'a str>, &'a Alias)> {
        if let Some(regime) = self.regime(regime)
            && let Some(alias) = regime.aliases().get(name)
        {
            return Some((Some(regime.name()), alias));
        }
        self.dynamics.aliases().get(name).map(|alias| (None, alias))
    }

    /// Returns the expansion of the alias `name` as seen from `regime`, or
    /// `None` if there is no such alias.
    pub fn expand_alias(&mut self, regime: Option<&str>, name: &str) -> Option<Expr> {
        let (owner, alias) = self.resolve(regime, name)?;
        if let Some(expr) = self.cache.lookup(owner, name) {
            return Some(expr);
        }

        let expanded = self.expand(owner, alias.rhs().as_ref());
        self.cache.insert(owner, name, expanded.clone());
        Some(expanded)
    }

    /// Returns `expr` with every alias visible from `regime` substituted,
    /// simplified.
    pub fn expand(&mut self, regime: Option<&str>, expr: &Expr) -> Expr {
        let substitutions: HashMap<String, Expr> = expr
            .symbols()
            .into_iter()
            .filter(|symbol| !is_reserved(symbol))
            .filter_map(|symbol| {
                self.expand_alias(regime, symbol)
                    .map(|expanded| (symbol.to_string(), expanded))
            })
            .collect();

        if substitutions.is_empty() {
            expr.clone()
        } else {
            expr.substitute(&substitutions).simplify()
        }
    }

    fn expand_transition(&mut self, regime: &str, transition: &dyn Transition) -> TransitionBody {
        let assignments: Vec<_> = transition
            .state_assignments()
            .values()
            .map(|assignment| {
                StateAssignment::new(
                    assignment.variable(),
                    self.expand(Some(regime), assignment.rhs().as_ref()),
                )
            })
            .collect();
        TransitionBody::new(
            assignments,
            transition.output_events().values().cloned(),
            transition.target_regime_name().map(str::to_string),
        )
    }

    fn expand_regime(&mut self, regime: &Regime) -> Regime {
        let name = regime.name();
        let time_derivatives = regime
            .time_derivatives()
            .values()
            .map(|derivative| {
                let rhs = self.expand(Some(name), derivative.rhs().as_ref());
                (
                    derivative.variable().to_string(),
                    TimeDerivative::new(derivative.variable(), rhs),
                )
            })
            .collect();
        let on_conditions = regime
            .on_conditions()
            .iter()
            .map(|transition| {
                let trigger = self.expand(Some(name), transition.trigger().rhs().as_ref());
                OnCondition::new(Trigger::new(trigger), self.expand_transition(name, transition))
            })
            .collect();
        let on_events = regime
            .on_events()
            .iter()
            .map(|(port, transition)| {
                let body = self.expand_transition(name, transition);
                (port.clone(), OnEvent::new(port.as_str(), body))
            })
            .collect();

        Regime::from_parts(RegimeParts {
            name: name.to_string(),
            time_derivatives,
            aliases: IndexMap::new(),
            on_conditions,
            on_events,
            annotations: regime.annotations().clone(),
        })
    }

    /// Returns an equivalent component called `name` without aliases.
    ///
    /// Every time derivative, trigger and state assignment is expanded.
    /// Aliases that drive an analog send port are kept, expanded; every
    /// other alias is dropped.
    ///
    /// # Errors
    ///
    /// Returns the problems with the expanded component.
    pub fn expanded_dynamics(&mut self, name: &str) -> Result<Dynamics, ValidationErrors> {
        let dynamics = self.dynamics;
        let send_ports: IndexSet<&str> = dynamics
            .analog_send_ports()
            .keys()
            .map(String::as_str)
            .collect();

        let aliases = dynamics
            .aliases()
            .keys()
            .filter(|alias| send_ports.contains(alias.as_str()))
            .filter_map(|alias| {
                self.expand_alias(None, alias)
                    .map(|rhs| (alias.clone(), Alias::new(alias.as_str(), rhs)))
            })
            .collect();
        let regimes = dynamics
            .regimes()
            .values()
            .map(|regime| (regime.name().to_string(), self.expand_regime(regime)))
            .collect();

        let mut parts = dynamics.clone().into_parts();
        parts.name = name.to_string();
        parts.aliases = aliases;
        parts.regimes = regimes;

        let expanded = Dynamics::from_parts(parts);
        log::debug!(
            "expanded '{}' into '{name}' ({} cached expansions)",
            dynamics.name(),
            self.cache.len()
        );
        validate::validate(&expanded)?;
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nineml_expr::{Value, equivalent};
    use nineml_ir::{OnConditionBuilder, Regime, fixtures};

    use super::*;

    fn expr(text: &str) -> Expr {
        Expr::parse(text).expect("expression should parse")
    }

    fn layered() -> Dynamics {
        Dynamics::builder("Layered")
            .parameters(["g", "E", "tau", "theta"])
            .state_variable("V")
            .alias("drive", "g * (E - V)")
            .alias("scaled", "drive / tau")
            .alias("out", "scaled * 2")
            .analog_send_port("out")
            .event_send_port("spike")
            .regime(
                Regime::builder("default")
                    .alias("local", "scaled + 1")
                    .time_derivative("V", "local - V / tau")
                    .on_condition(
                        OnConditionBuilder::new("drive > theta")
                            .assign("V", "V - drive")
                            .emit("spike"),
                    ),
            )
            .build()
            .expect("layered should be valid")
    }

    #[test]
    fn aliases_expand_to_inputs() {
        let dynamics = layered();
        let mut expander = ExpressionExpander::new(&dynamics).expect("no recursion");

        let expanded = expander.expand_alias(None, "out").expect("out is an alias");
        assert!(equivalent(&expanded, &expr("2 * g * (E - V) / tau")));

        let local = expander
            .expand_alias(Some("default"), "local")
            .expect("local is visible in its regime");
        assert!(equivalent(&local, &expr("g * (E - V) / tau + 1")));

        assert_eq!(expander.expand_alias(None, "local"), None);
        assert_eq!(expander.expand_alias(None, "V"), None);
    }

    #[test]
    fn expansions_are_cached() {
        let dynamics = layered();
        let mut expander = ExpressionExpander::new(&dynamics).expect("no recursion");

        expander.expand_alias(None, "out");
        assert_eq!(expander.cache().len(), 3);
        assert_eq!(expander.cache().hits(), 0);

        expander.expand(Some("default"), &expr("drive + local"));
        assert!(expander.cache().get(Some("default"), "local").is_some());
        assert!(expander.cache().get(None, "drive").is_some());
        assert_eq!(expander.cache().hits(), 2);

        let cache = expander.into_cache();
        let expander = ExpressionExpander::with_cache(&dynamics, cache).expect("no recursion");
        assert_eq!(expander.cache().len(), 4);
    }

    #[test]
    fn expanded_dynamics_behave_the_same() {
        let dynamics = layered();
        let mut expander = ExpressionExpander::new(&dynamics).expect("no recursion");
        let expanded = expander
            .expanded_dynamics("LayeredExpanded")
            .expect("expansion should be valid");

        assert_eq!(expanded.name(), "LayeredExpanded");
        assert_eq!(expanded.num_aliases(), 1);
        let regime = expanded.regime("default").expect("regime is kept");
        assert!(regime.aliases().is_empty());

        let values = [("g", 0.5), ("E", -70.0), ("tau", 20.0), ("theta", 1.0), ("V", -65.0)];
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };

        // drive = -2.5, scaled = -0.125, local = 0.875
        let derivative = regime.time_derivative("V").expect("derivative is kept");
        let Ok(Value::Number(rate)) = derivative.rhs().evaluate(&lookup) else {
            panic!("the derivative should evaluate to a number");
        };
        assert_relative_eq!(rate, 0.875 + 65.0 / 20.0);

        let transition = &regime.on_conditions()[0];
        assert!(!transition.trigger().rhs().contains_symbol("drive"));
        let reset = transition.state_assignments()["V"].rhs();
        let Ok(Value::Number(reset)) = reset.evaluate(&lookup) else {
            panic!("the reset should evaluate to a number");
        };
        assert_relative_eq!(reset, -62.5);
    }

    #[test]
    fn recursive_aliases_are_refused() {
        let dynamics = Dynamics::builder("Loop")
            .alias("a", "b + 1")
            .alias("b", "a * 2")
            .build_unvalidated()
            .expect("builder should accept the component");

        let errors = ExpressionExpander::new(&dynamics).expect_err("a and b form a cycle");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn composites_expand_after_flattening() {
        let network = nineml_multi::MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .build()
            .expect("network should be valid");
        let flat = network.flatten();

        let mut expander = ExpressionExpander::new(&flat).expect("no recursion");
        let expanded = expander
            .expanded_dynamics("NetworkExpanded")
            .expect("expansion should be valid");

        for regime in expanded.regimes().values() {
            for derivative in regime.time_derivatives().values() {
                for symbol in derivative.rhs().symbols() {
                    assert!(expanded.aliases().get(symbol).is_none(), "{symbol} is an alias");
                }
            }
        }
    }
}
