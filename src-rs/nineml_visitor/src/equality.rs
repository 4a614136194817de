//! Structural equality of component graphs.

use std::ops::ControlFlow;

use approx::relative_eq;
use nineml_expr::equivalent;

use crate::{AttrValue, Crumb, DualVisitor, ElementKind, Mismatch, NodeRef, walk_dual};

/// How attributes are compared.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityOptions {
    epsilon: f64,
    annotation_namespaces: Vec<String>,
}

impl Default for EqualityOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            annotation_namespaces: Vec::new(),
        }
    }
}

impl EqualityOptions {
    /// Creates the default options: a relative tolerance of `1e-12` and no
    /// annotations compared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative tolerance for numbers.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Includes annotations in `namespace` in the comparison.
    #[must_use]
    pub fn with_annotation_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.annotation_namespaces.push(namespace.into());
        self
    }

    /// Returns the relative tolerance for numbers.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the annotation namespaces that are compared.
    #[must_use]
    pub fn annotation_namespaces(&self) -> &[String] {
        &self.annotation_namespaces
    }

    fn compared_entries<'a>(
        &self,
        entries: &'a [(String, String, String)],
    ) -> Vec<&'a (String, String, String)> {
        let mut compared: Vec<_> = entries
            .iter()
            .filter(|(namespace, _, _)| self.annotation_namespaces.contains(namespace))
            .collect();
        compared.sort();
        compared
    }

    /// Returns whether two attribute values match.
    ///
    /// Numbers match within the relative tolerance. Expressions match when
    /// they are symbolically equivalent. Annotation entries match when they
    /// agree on every opted-in namespace.
    #[must_use]
    pub fn values_eq(&self, first: &AttrValue, second: &AttrValue) -> bool {
        match (first, second) {
            (AttrValue::Number(a), AttrValue::Number(b)) => {
                relative_eq!(*a, *b, epsilon = self.epsilon, max_relative = self.epsilon)
            }
            (AttrValue::Expr(a), AttrValue::Expr(b)) => a == b || equivalent(a, b),
            (AttrValue::Entries(a), AttrValue::Entries(b)) => {
                self.compared_entries(a) == self.compared_entries(b)
            }
            (
                AttrValue::Text(_)
                | AttrValue::OptionalText(_)
                | AttrValue::Number(_)
                | AttrValue::Expr(_)
                | AttrValue::Entries(_),
                _,
            ) => first == second,
        }
    }
}

/// Decides whether two graphs are equal, stopping at the first difference.
#[derive(Debug, Clone, Default)]
pub struct EqualityChecker {
    options: EqualityOptions,
}

struct FirstMismatch<'o> {
    options: &'o EqualityOptions,
    found: Option<String>,
}

impl DualVisitor for FirstMismatch<'_> {
    fn attribute_eq(
        &self,
        _kind: ElementKind,
        _name: &str,
        first: &AttrValue,
        second: &AttrValue,
    ) -> bool {
        self.options.values_eq(first, second)
    }

    fn mismatch(&mut self, path: &[Crumb], mismatch: Mismatch) -> ControlFlow<()> {
        self.found = Some(mismatch.report_line(path));
        ControlFlow::Break(())
    }
}

impl EqualityChecker {
    /// Creates a checker.
    #[must_use]
    pub const fn new(options: EqualityOptions) -> Self {
        Self { options }
    }

    /// Returns whether the graphs rooted at `first` and `second` are equal.
    #[must_use]
    pub fn check<'a>(
        &self,
        first: impl Into<NodeRef<'a>>,
        second: impl Into<NodeRef<'a>>,
    ) -> bool {
        let mut visitor = FirstMismatch {
            options: &self.options,
            found: None,
        };
        let flow = walk_dual(&mut visitor, first.into(), second.into());
        if let Some(line) = &visitor.found {
            log::debug!("graphs differ: {line}");
        }
        flow.is_continue()
    }
}

/// Lists every difference between two graphs.
#[derive(Debug, Clone, Default)]
pub struct MismatchFinder {
    options: EqualityOptions,
    lines: Vec<String>,
}

impl DualVisitor for MismatchFinder {
    fn attribute_eq(
        &self,
        _kind: ElementKind,
        _name: &str,
        first: &AttrValue,
        second: &AttrValue,
    ) -> bool {
        self.options.values_eq(first, second)
    }

    fn mismatch(&mut self, path: &[Crumb], mismatch: Mismatch) -> ControlFlow<()> {
        self.lines.push(mismatch.report_line(path));
        ControlFlow::Continue(())
    }
}

impl MismatchFinder {
    /// Creates a finder.
    #[must_use]
    pub const fn new(options: EqualityOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
        }
    }

    /// Returns a report with one line per difference between the graphs
    /// rooted at `first` and `second`, or an empty string if they are equal.
    pub fn find<'a>(
        &mut self,
        first: impl Into<NodeRef<'a>>,
        second: impl Into<NodeRef<'a>>,
    ) -> String {
        self.lines.clear();
        let _ = walk_dual(self, first.into(), second.into());
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::{Dynamics, Regime, fixtures};
    use nineml_multi::MultiDynamics;

    use super::*;

    fn decay(rhs: &str) -> Dynamics {
        Dynamics::builder("Decay")
            .parameter("tau")
            .state_variable("x")
            .regime(Regime::builder("default").time_derivative("x", rhs))
            .build()
            .expect("decay should be valid")
    }

    #[test]
    fn symbolically_equal_expressions_are_equal() {
        let checker = EqualityChecker::default();
        assert!(checker.check(&decay("x + x"), &decay("2 * x")));
        assert!(checker.check(&decay("-x / tau"), &decay("-(x / tau)")));
        assert!(!checker.check(&decay("x + x"), &decay("3 * x")));
    }

    #[test]
    fn numbers_are_compared_with_a_tolerance() {
        let options = EqualityOptions::new().with_epsilon(1e-6);
        assert!(options.values_eq(&AttrValue::Number(1.0), &AttrValue::Number(1.000_000_1)));
        assert!(!options.values_eq(&AttrValue::Number(1.0), &AttrValue::Number(1.1)));
    }

    #[test]
    fn annotations_are_compared_when_opted_in() {
        let plain = fixtures::spike_source();
        let annotated = Dynamics::builder("SpikeSource")
            .parameter("rate")
            .state_variable("t_next")
            .event_send_port("spike_out")
            .regime(
                Regime::builder("default")
                    .time_derivative("t_next", "0")
                    .on_condition(
                        nineml_ir::OnConditionBuilder::new("t > t_next")
                            .assign("t_next", "t + 1 / rate")
                            .emit("spike_out"),
                    ),
            )
            .annotate("http://tools.example/sim", "solver", "euler")
            .build()
            .expect("annotated source should be valid");

        assert!(EqualityChecker::default().check(&plain, &annotated));

        let options = EqualityOptions::new().with_annotation_namespace("http://tools.example/sim");
        assert!(!EqualityChecker::new(options.clone()).check(&plain, &annotated));

        let report = MismatchFinder::new(options).find(&plain, &annotated);
        assert_eq!(
            report,
            "[Dynamics('SpikeSource')>Annotations('annotations')] - 'entries' attr: [] | [http://tools.example/sim:solver=euler]"
        );
    }

    #[test]
    fn differing_keys_are_reported_sorted() {
        let first = Dynamics::builder("Keys")
            .parameters(["b", "a"])
            .build()
            .expect("component should be valid");
        let second = Dynamics::builder("Keys")
            .parameters(["c", "a"])
            .build()
            .expect("component should be valid");

        let report = MismatchFinder::default().find(&first, &second);
        assert_eq!(report, "[Dynamics('Keys')] - Parameter keys: [a, b] | [a, c]");
    }

    #[test]
    fn different_kinds_are_reported() {
        let dynamics = fixtures::spike_source();
        let parameter = nineml_ir::Parameter::new("rate");
        let report = MismatchFinder::default().find(&dynamics, &parameter);
        assert_eq!(
            report,
            "[Dynamics('SpikeSource')] - types: [Dynamics] | [Parameter] (expected=Dynamics)"
        );
    }

    fn network(synapse_rhs: &str) -> MultiDynamics {
        let synapse = Dynamics::builder("ExponentialSynapse")
            .parameters(["tau", "weight", "E_rev"])
            .state_variable("g")
            .alias("Isyn", synapse_rhs)
            .analog_receive_port("V")
            .analog_send_port("Isyn")
            .event_receive_port("spike")
            .regime(
                Regime::builder("default")
                    .time_derivative("g", "-g / tau")
                    .on_event(nineml_ir::OnEventBuilder::new("spike").assign("g", "g + weight")),
            )
            .build()
            .expect("synapse should be valid");

        MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", synapse)
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .build()
            .expect("network should be valid")
    }

    #[test]
    fn composite_mismatches_name_the_path() {
        let first = network("g * (E_rev - V)");
        let second = network("g * (V - E_rev)");

        assert!(EqualityChecker::default().check(&first, &network("g * E_rev - g * V")));
        assert!(!EqualityChecker::default().check(&first, &second));

        let report = MismatchFinder::default().find(&first, &second);
        assert_eq!(
            report,
            "[MultiDynamics('Network')>SubDynamics('syn')>Dynamics('ExponentialSynapse')>Alias('Isyn')] - 'rhs' attr: [g * (E_rev - V)] | [g * (V - E_rev)]"
        );
    }

    fn network_with_decay(decay: &str) -> MultiDynamics {
        let synapse = Dynamics::builder("ExponentialSynapse")
            .parameters(["tau", "weight", "E_rev"])
            .state_variable("g")
            .alias("Isyn", "g * (E_rev - V)")
            .analog_receive_port("V")
            .analog_send_port("Isyn")
            .event_receive_port("spike")
            .regime(
                Regime::builder("default")
                    .time_derivative("g", "decay")
                    .alias("decay", decay)
                    .on_event(nineml_ir::OnEventBuilder::new("spike").assign("g", "g + weight")),
            )
            .build()
            .expect("synapse should be valid");

        MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", synapse)
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .build()
            .expect("network should be valid")
    }

    #[test]
    fn regime_alias_mismatches_name_the_regime() {
        let first = network_with_decay("-g / tau");
        let second = network_with_decay("g / tau");

        assert!(EqualityChecker::default().check(&first, &network_with_decay("-(g / tau)")));
        assert!(!EqualityChecker::default().check(&first, &second));

        let report = MismatchFinder::default().find(&first, &second);
        assert_eq!(
            report,
            "[MultiDynamics('Network')>SubDynamics('syn')>Dynamics('ExponentialSynapse')>Regime('default')>Alias('decay')] - 'rhs' attr: [-g / tau] | [g / tau]"
        );
    }

    fn threshold_cell(trigger: &str) -> Dynamics {
        Dynamics::builder("Threshold")
            .parameters(["th", "tau"])
            .state_variable("V")
            .event_send_port("spike")
            .regime(
                Regime::builder("default")
                    .time_derivative("V", "-V / tau")
                    .on_condition(
                        nineml_ir::OnConditionBuilder::new(trigger)
                            .assign("V", "0")
                            .emit("spike"),
                    ),
            )
            .build()
            .expect("cell should be valid")
    }

    #[test]
    fn rearranged_triggers_are_equal() {
        let first = threshold_cell("V > th");

        assert!(EqualityChecker::default().check(&first, &threshold_cell("th < V")));
        assert_eq!(MismatchFinder::default().find(&first, &threshold_cell("th < V")), "");

        let report = MismatchFinder::default().find(&first, &threshold_cell("V < th"));
        assert_eq!(
            report,
            "[Dynamics('Threshold')>Regime('default')] - OnCondition keys: [V > th] | [V < th]"
        );
    }
}
