//! The definitions a set of expressions depends on.

use indexmap::IndexSet;
use nineml_expr::{Expr, is_reserved};
use nineml_ir::{Alias, Dynamics, ExpressionElement, ValidationErrors, validate};

/// The top-level definitions that a set of expressions needs, directly or
/// through aliases.
///
/// Only top-level aliases are followed. Names that are not top-level
/// definitions, such as the aliases of a regime, are recorded as
/// unresolved.
///
/// # Examples
///
/// ```
/// use nineml_analysis::RequiredDefinitions;
/// use nineml_ir::{Dynamics, Regime};
///
/// let cell = Dynamics::builder("Cell")
///     .parameters(["g", "E", "unused"])
///     .state_variable("V")
///     .alias("I", "g * (E - V)")
///     .alias("spare", "unused * 2")
///     .analog_send_port("I")
///     .regime(Regime::builder("default").time_derivative("V", "I"))
///     .build()
///     .unwrap();
///
/// let required = RequiredDefinitions::from_send_ports(&cell);
/// assert!(required.is_required("g"));
/// assert!(!required.is_required("spare"));
/// ```
#[derive(Debug, Clone)]
pub struct RequiredDefinitions<'a> {
    dynamics: &'a Dynamics,
    parameters: IndexSet<String>,
    constants: IndexSet<String>,
    state_variables: IndexSet<String>,
    ports: IndexSet<String>,
    aliases: IndexSet<String>,
    unresolved: IndexSet<String>,
    in_progress: IndexSet<String>,
}

impl<'a> RequiredDefinitions<'a> {
    fn new(dynamics: &'a Dynamics) -> Self {
        Self {
            dynamics,
            parameters: IndexSet::new(),
            constants: IndexSet::new(),
            state_variables: IndexSet::new(),
            ports: IndexSet::new(),
            aliases: IndexSet::new(),
            unresolved: IndexSet::new(),
            in_progress: IndexSet::new(),
        }
    }

    /// Finds the definitions needed by `expressions`.
    #[must_use]
    pub fn from_expressions<'e>(
        dynamics: &'a Dynamics,
        expressions: impl IntoIterator<Item = &'e Expr>,
    ) -> Self {
        let mut required = Self::new(dynamics);
        for expr in expressions {
            for symbol in expr.symbols() {
                required.require(symbol);
            }
        }
        log::debug!(
            "'{}' requires {} of its {} top-level aliases",
            dynamics.name(),
            required.aliases.len(),
            dynamics.num_aliases()
        );
        required
    }

    /// Finds the definitions needed to drive the analog send ports.
    #[must_use]
    pub fn from_send_ports(dynamics: &'a Dynamics) -> Self {
        let names: Vec<Expr> = dynamics
            .analog_send_ports()
            .keys()
            .map(Expr::symbol)
            .collect();
        Self::from_expressions(dynamics, &names)
    }

    fn require(&mut self, symbol: &str) {
        let dynamics = self.dynamics;
        if is_reserved(symbol) {
            return;
        }

        if dynamics.parameters().contains_key(symbol) {
            self.parameters.insert(symbol.to_string());
        } else if dynamics.constants().contains_key(symbol) {
            self.constants.insert(symbol.to_string());
        } else if dynamics.state_variables().contains_key(symbol) {
            self.state_variables.insert(symbol.to_string());
        } else if dynamics.analog_receive_ports().contains_key(symbol)
            || dynamics.analog_reduce_ports().contains_key(symbol)
        {
            self.ports.insert(symbol.to_string());
        } else if let Some(alias) = dynamics.aliases().get(symbol) {
            if self.aliases.contains(symbol) || !self.in_progress.insert(symbol.to_string()) {
                return;
            }
            for dependency in alias.rhs_symbols() {
                self.require(&dependency);
            }
            // dependencies are inserted first
            self.aliases.insert(symbol.to_string());
        } else {
            self.unresolved.insert(symbol.to_string());
        }
    }

    /// Returns whether `name` is a required top-level definition.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.parameters.contains(name)
            || self.constants.contains(name)
            || self.state_variables.contains(name)
            || self.ports.contains(name)
            || self.aliases.contains(name)
    }

    /// Returns the required parameters.
    #[must_use]
    pub const fn parameters(&self) -> &IndexSet<String> {
        &self.parameters
    }

    /// Returns the required constants.
    #[must_use]
    pub const fn constants(&self) -> &IndexSet<String> {
        &self.constants
    }

    /// Returns the required state variables.
    #[must_use]
    pub const fn state_variables(&self) -> &IndexSet<String> {
        &self.state_variables
    }

    /// Returns the required analog receive and reduce ports.
    #[must_use]
    pub const fn ports(&self) -> &IndexSet<String> {
        &self.ports
    }

    /// Returns the required top-level aliases, each after the aliases it
    /// refers to.
    pub fn aliases(&self) -> impl Iterator<Item = &'a Alias> {
        self.aliases
            .iter()
            .filter_map(|name| self.dynamics.aliases().get(name))
    }

    /// Returns the symbols that are not top-level definitions.
    #[must_use]
    pub const fn unresolved(&self) -> &IndexSet<String> {
        &self.unresolved
    }

    /// Returns a copy of the component without the top-level aliases that
    /// are not required.
    ///
    /// # Errors
    ///
    /// Returns the problems with the pruned component, for example an
    /// analog send port whose alias was dropped.
    pub fn pruned(&self) -> Result<Dynamics, ValidationErrors> {
        let mut parts = self.dynamics.clone().into_parts();
        parts.aliases = self
            .aliases()
            .map(|alias| (alias.name().to_string(), alias.clone()))
            .collect();

        let pruned = Dynamics::from_parts(parts)
            .with_document_url(self.dynamics.document_url().map(str::to_string));
        validate::validate(&pruned)?;
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::{Regime, fixtures};

    use super::*;

    fn names<'a>(aliases: impl Iterator<Item = &'a Alias>) -> Vec<&'a str> {
        aliases.map(Alias::name).collect()
    }

    fn chain() -> Dynamics {
        Dynamics::builder("Chain")
            .parameters(["a", "b", "c"])
            .constant("k", 2.0, None)
            .state_variable("x")
            .alias("top", "mid * k")
            .alias("mid", "low + b")
            .alias("low", "a * x")
            .alias("dead", "c * 3")
            .analog_receive_port("I")
            .analog_send_port("top")
            .regime(
                Regime::builder("default")
                    .time_derivative("x", "local - x")
                    .alias("local", "I + top"),
            )
            .build()
            .expect("chain should be valid")
    }

    #[test]
    fn aliases_come_after_their_dependencies() {
        let dynamics = chain();
        let required = RequiredDefinitions::from_send_ports(&dynamics);

        assert_eq!(names(required.aliases()), ["low", "mid", "top"]);
        assert_eq!(required.parameters().iter().collect::<Vec<_>>(), ["a", "b"]);
        assert!(required.constants().contains("k"));
        assert!(required.state_variables().contains("x"));
        assert!(!required.is_required("dead"));
        assert!(!required.is_required("c"));
        assert!(required.unresolved().is_empty());
    }

    #[test]
    fn regime_aliases_are_not_top_level() {
        let dynamics = chain();
        let regime = dynamics.regime("default").expect("regime exists");
        let derivative = regime.time_derivative("x").expect("derivative exists");

        let rhs = derivative.rhs();
        let required = RequiredDefinitions::from_expressions(&dynamics, [rhs.as_ref()]);
        assert_eq!(required.unresolved().iter().collect::<Vec<_>>(), ["local"]);
        assert!(required.state_variables().contains("x"));
        assert!(required.aliases().next().is_none());
    }

    #[test]
    fn pruning_drops_unused_aliases() {
        let dynamics = chain();
        let pruned = RequiredDefinitions::from_send_ports(&dynamics)
            .pruned()
            .expect("pruned component should be valid");

        assert_eq!(pruned.num_aliases(), 3);
        assert!(pruned.alias("dead").is_err());
        assert_eq!(pruned.num_parameters(), 3);
    }

    #[test]
    fn pruning_can_break_send_ports() {
        let dynamics = fixtures::exponential_synapse();
        let none: [&Expr; 0] = [];
        let errors = RequiredDefinitions::from_expressions(&dynamics, none)
            .pruned()
            .expect_err("Isyn loses its alias");
        assert_eq!(errors.len(), 1);
    }
}
