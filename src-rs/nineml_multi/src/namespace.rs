//! Namespace-qualified views of sub-component elements.
//!
//! A [`Namespaced`] view borrows an element of a sub-component and presents
//! it as seen from the composite: its name and the free symbols of its
//! expressions carry the suffix `_<sub-component>`. Views never own or
//! modify the element they wrap.

use std::{borrow::Cow, cell::RefCell, collections::HashMap};

use nineml_expr::{Expr, is_reserved};
use nineml_ir::{
    Alias, Assignment, AssignmentEdit, Constant, ExpressionEdit, ExpressionElement, OnCondition,
    OnEvent, OutputEvent, Parameter, Regime, StateAssignment, StateVariable, TimeDerivative,
    Transition, Trigger,
};

use crate::{ImmutableError, SubDynamics, multi_regime::MULTI_REGIME_SEPARATOR};

/// Appends the namespace suffix to `name`.
#[must_use]
pub fn append_namespace(name: &str, namespace: &str) -> String {
    format!("{name}_{namespace}")
}

/// Returns whether `symbol` is qualified when seen from a composite.
///
/// Reserved identifiers and composite regime names keep their name.
#[must_use]
pub fn is_qualifiable(symbol: &str) -> bool {
    !is_reserved(symbol) && !symbol.contains(MULTI_REGIME_SEPARATOR)
}

/// Qualifies `name` with `namespace` unless it is exempt.
#[must_use]
pub fn qualify(name: &str, namespace: &str) -> String {
    if is_qualifiable(name) {
        append_namespace(name, namespace)
    } else {
        name.to_string()
    }
}

/// Identifies a qualified right-hand side: the regime of the element, if it
/// lives in one, its kind and its local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedKey {
    regime: Option<String>,
    kind: &'static str,
    name: String,
}

impl QualifiedKey {
    /// Creates a key.
    #[must_use]
    pub fn new(regime: Option<&str>, kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            regime: regime.map(str::to_string),
            kind,
            name: name.into(),
        }
    }
}

/// Memoises qualified right-hand sides per (regime, element name).
///
/// Each entry remembers the unqualified expression it was made from and is
/// recomputed when asked for with a different one. Each sub-component owns
/// one cache. Cloning a sub-component, and therefore rebuilding its
/// composite, starts from an empty cache.
#[derive(Debug, Default)]
pub struct QualifiedExprCache {
    entries: RefCell<HashMap<QualifiedKey, (Expr, Expr)>>,
}

impl QualifiedExprCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the qualified form of `source` cached under `key`, computing
    /// it with `qualify` when absent or made from another expression.
    pub fn get_or_insert_with(
        &self,
        key: QualifiedKey,
        source: &Expr,
        qualify: impl FnOnce(&Expr) -> Expr,
    ) -> Expr {
        if let Some((cached_source, expr)) = self.entries.borrow().get(&key)
            && cached_source == source
        {
            log::trace!("qualified expression cache hit for '{}'", key.name);
            return expr.clone();
        }

        let expr = qualify(source);
        self.entries
            .borrow_mut()
            .insert(key, (source.clone(), expr.clone()));
        expr
    }

    /// Returns the number of cached expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Clone for QualifiedExprCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Elements that are known by a local name within their component.
pub trait LocalName {
    /// Returns the unqualified name.
    fn local_name(&self) -> &str;
}

macro_rules! local_name {
    ($($ty:ty => $accessor:ident),* $(,)?) => {
        $(
            impl LocalName for $ty {
                fn local_name(&self) -> &str {
                    self.$accessor()
                }
            }
        )*
    };
}

local_name!(
    Parameter => name,
    Constant => name,
    StateVariable => name,
    Alias => name,
    TimeDerivative => variable,
    StateAssignment => variable,
    OutputEvent => port_name,
    OnEvent => src_port_name,
    Regime => name,
);

/// Expression elements whose qualified right-hand side is memoised.
pub trait CachedExpression: ExpressionElement {
    /// Keeps elements of different kinds with the same name apart.
    const KIND: &'static str;

    /// Returns the name of the element within its regime.
    fn source_name(&self) -> Cow<'_, str>;
}

impl CachedExpression for Alias {
    const KIND: &'static str = "Alias";

    fn source_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name())
    }
}

impl CachedExpression for TimeDerivative {
    const KIND: &'static str = "TimeDerivative";

    fn source_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.variable())
    }
}

impl CachedExpression for StateAssignment {
    const KIND: &'static str = "StateAssignment";

    fn source_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.variable())
    }
}

impl CachedExpression for Trigger {
    const KIND: &'static str = "Trigger";

    fn source_name(&self) -> Cow<'_, str> {
        Cow::Owned(self.rhs().to_string())
    }
}

/// A read-only view of a sub-component element, qualified by the
/// sub-component name.
#[derive(Debug)]
pub struct Namespaced<'a, T> {
    sub_component: &'a SubDynamics,
    regime: Option<&'a str>,
    element: &'a T,
}

impl<T> Clone for Namespaced<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Namespaced<'_, T> {}

impl<T: PartialEq> PartialEq for Namespaced<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.sub_component.name() == other.sub_component.name() && self.element == other.element
    }
}

impl<'a, T> Namespaced<'a, T> {
    /// Wraps a top-level `element` of `sub_component`.
    #[must_use]
    pub(crate) const fn new(sub_component: &'a SubDynamics, element: &'a T) -> Self {
        Self {
            sub_component,
            regime: None,
            element,
        }
    }

    /// Wraps an `element` of `sub_component` that lives in the regime
    /// called `regime`.
    #[must_use]
    pub(crate) const fn in_regime(
        sub_component: &'a SubDynamics,
        regime: &'a str,
        element: &'a T,
    ) -> Self {
        Self {
            sub_component,
            regime: Some(regime),
            element,
        }
    }

    /// Returns the wrapped element.
    #[must_use]
    pub const fn element(&self) -> &'a T {
        self.element
    }

    /// Returns the sub-component the element belongs to.
    #[must_use]
    pub const fn sub_component(&self) -> &'a SubDynamics {
        self.sub_component
    }

    fn qualify(&self, name: &str) -> String {
        qualify(name, self.sub_component.name())
    }

    fn wrap<U>(&self, element: &'a U) -> Namespaced<'a, U> {
        Namespaced {
            sub_component: self.sub_component,
            regime: self.regime,
            element,
        }
    }

    fn wrap_in_regime<U>(&self, element: &'a U) -> Namespaced<'a, U>
    where
        T: AsRegime,
    {
        Namespaced::in_regime(self.sub_component, self.element.as_regime().name(), element)
    }

    /// Returns the name of the element as seen from the composite.
    #[must_use]
    pub fn name(&self) -> String
    where
        T: LocalName,
    {
        self.qualify(self.element.local_name())
    }

    /// Returns the regimes' time derivatives, qualified.
    pub fn time_derivatives(&self) -> impl Iterator<Item = Namespaced<'a, TimeDerivative>> + use<'a, T>
    where
        T: AsRegime,
    {
        let view = *self;
        self.element
            .as_regime()
            .time_derivatives()
            .values()
            .map(move |derivative| view.wrap_in_regime(derivative))
    }

    /// Returns the regime-local aliases, qualified.
    pub fn aliases(&self) -> impl Iterator<Item = Namespaced<'a, Alias>> + use<'a, T>
    where
        T: AsRegime,
    {
        let view = *self;
        self.element
            .as_regime()
            .aliases()
            .values()
            .map(move |alias| view.wrap_in_regime(alias))
    }

    /// Returns the on-condition transitions, qualified.
    pub fn on_conditions(&self) -> impl Iterator<Item = Namespaced<'a, OnCondition>> + use<'a, T>
    where
        T: AsRegime,
    {
        let view = *self;
        self.element
            .as_regime()
            .on_conditions()
            .iter()
            .map(move |transition| view.wrap_in_regime(transition))
    }

    /// Returns the on-event transitions, qualified.
    pub fn on_events(&self) -> impl Iterator<Item = Namespaced<'a, OnEvent>> + use<'a, T>
    where
        T: AsRegime,
    {
        let view = *self;
        self.element
            .as_regime()
            .on_events()
            .values()
            .map(move |transition| view.wrap_in_regime(transition))
    }

    /// Returns the time derivative of the qualified state variable `name`.
    #[must_use]
    pub fn time_derivative(&self, name: &str) -> Option<Namespaced<'a, TimeDerivative>>
    where
        T: AsRegime,
    {
        let local = self.sub_component.strip_namespace(name)?;
        let derivative = self.element.as_regime().time_derivative(local)?;
        Some(self.wrap_in_regime(derivative))
    }

    /// Returns the regime-local alias with the qualified name `name`.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<Namespaced<'a, Alias>>
    where
        T: AsRegime,
    {
        let local = self.sub_component.strip_namespace(name)?;
        let alias = self.element.as_regime().aliases().get(local)?;
        Some(self.wrap_in_regime(alias))
    }

    /// Returns the on-event transition triggered by the qualified port
    /// `port_name`.
    #[must_use]
    pub fn on_event(&self, port_name: &str) -> Option<Namespaced<'a, OnEvent>>
    where
        T: AsRegime,
    {
        let local = self.sub_component.strip_namespace(port_name)?;
        let transition = self.element.as_regime().on_event(local)?;
        Some(self.wrap_in_regime(transition))
    }

    /// Returns the number of time derivatives.
    #[must_use]
    pub fn num_time_derivatives(&self) -> usize
    where
        T: AsRegime,
    {
        self.element.as_regime().time_derivatives().len()
    }

    /// Returns the number of regime-local aliases.
    #[must_use]
    pub fn num_aliases(&self) -> usize
    where
        T: AsRegime,
    {
        self.element.as_regime().aliases().len()
    }

    /// Returns the number of on-condition transitions.
    #[must_use]
    pub fn num_on_conditions(&self) -> usize
    where
        T: AsRegime,
    {
        self.element.as_regime().on_conditions().len()
    }

    /// Returns the number of on-event transitions.
    #[must_use]
    pub fn num_on_events(&self) -> usize
    where
        T: AsRegime,
    {
        self.element.as_regime().on_events().len()
    }

    /// Returns the state assignments of the transition, qualified.
    pub fn state_assignments(
        &self,
    ) -> impl Iterator<Item = Namespaced<'a, StateAssignment>> + use<'a, T>
    where
        T: Transition,
    {
        let view = *self;
        self.element
            .state_assignments()
            .values()
            .map(move |assignment| view.wrap(assignment))
    }

    /// Returns the output events of the transition, qualified.
    pub fn output_events(&self) -> impl Iterator<Item = Namespaced<'a, OutputEvent>> + use<'a, T>
    where
        T: Transition,
    {
        let view = *self;
        self.element
            .output_events()
            .values()
            .map(move |event| view.wrap(event))
    }

    /// Returns the qualified name of the regime the transition enters.
    #[must_use]
    pub fn target_regime_name(&self) -> Option<String>
    where
        T: Transition,
    {
        self.element
            .target_regime_name()
            .map(|target| self.qualify(target))
    }

    /// Returns the number of state assignments of the transition.
    #[must_use]
    pub fn num_state_assignments(&self) -> usize
    where
        T: Transition,
    {
        self.element.state_assignments().len()
    }

    /// Returns the number of output events of the transition.
    #[must_use]
    pub fn num_output_events(&self) -> usize
    where
        T: Transition,
    {
        self.element.output_events().len()
    }

    /// Returns the trigger of the on-condition, qualified.
    #[must_use]
    pub fn trigger(&self) -> Namespaced<'a, Trigger>
    where
        T: AsOnCondition,
    {
        self.wrap(self.element.as_on_condition().trigger())
    }

    fn immutable(&self, element: String) -> ImmutableError {
        ImmutableError::new(element, self.sub_component.name())
    }
}

/// Elements viewed as a regime.
pub trait AsRegime {
    /// Returns the regime.
    fn as_regime(&self) -> &Regime;
}

impl AsRegime for Regime {
    fn as_regime(&self) -> &Regime {
        self
    }
}

/// Elements viewed as an on-condition transition.
pub trait AsOnCondition {
    /// Returns the on-condition.
    fn as_on_condition(&self) -> &OnCondition;
}

impl AsOnCondition for OnCondition {
    fn as_on_condition(&self) -> &OnCondition {
        self
    }
}

impl<T: CachedExpression> ExpressionElement for Namespaced<'_, T> {
    /// Returns a fresh copy of the right-hand side with every qualifiable
    /// free symbol suffixed; the wrapped expression is left untouched.
    fn rhs(&self) -> Cow<'_, Expr> {
        let key = QualifiedKey::new(self.regime, T::KIND, self.element.source_name());
        let namespace = self.sub_component.name();
        let source = self.element.rhs();
        let expr = self.sub_component.cache().get_or_insert_with(key, &source, |source| {
            let rename =
                |symbol: &str| is_qualifiable(symbol).then(|| append_namespace(symbol, namespace));
            source.rename_symbols(&rename)
        });
        Cow::Owned(expr)
    }
}

impl<T: Assignment + CachedExpression> Assignment for Namespaced<'_, T> {
    fn lhs(&self) -> Cow<'_, str> {
        Cow::Owned(self.qualify(&self.element.lhs()))
    }
}

impl<T: CachedExpression> ExpressionEdit for Namespaced<'_, T> {
    type Error = ImmutableError;

    fn set_rhs(&mut self, _rhs: Expr) -> Result<(), Self::Error> {
        Err(self.immutable(format!("expression '{}'", self.rhs())))
    }

    fn subs(&mut self, _old: &str, _new: &Expr) -> Result<(), Self::Error> {
        Err(self.immutable(format!("expression '{}'", self.rhs())))
    }

    fn rhs_name_transform_inplace(
        &mut self,
        _rename: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), Self::Error> {
        Err(self.immutable(format!("expression '{}'", self.rhs())))
    }
}

impl<T: Assignment + CachedExpression> AssignmentEdit for Namespaced<'_, T> {
    fn set_lhs(&mut self, _lhs: String) -> Result<(), Self::Error> {
        Err(self.immutable(self.lhs().into_owned()))
    }

    fn lhs_name_transform_inplace(
        &mut self,
        _rename: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), Self::Error> {
        Err(self.immutable(self.lhs().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use nineml_ir::{Dynamics, OnConditionBuilder};

    use super::*;

    fn sub_component() -> SubDynamics {
        let dynamics = Dynamics::builder("Source")
            .parameters(["P3", "tau"])
            .state_variable("x")
            .alias("a", "x * 2 + t")
            .event_send_port("out")
            .regime(
                Regime::builder("r")
                    .time_derivative("x", "-x / tau")
                    .on_condition(
                        OnConditionBuilder::new("P3 > 0")
                            .assign("x", "0")
                            .emit("out"),
                    ),
            )
            .build()
            .expect("component should be valid");
        SubDynamics::new("e", Rc::new(dynamics))
    }

    #[test]
    fn names_and_symbols_are_suffixed() {
        let sub = sub_component();

        let parameter = sub.parameter("P3_e").expect("parameter should be visible");
        assert_eq!(parameter.name(), "P3_e");

        let regime = sub.regime("r_e").expect("regime should be visible");
        let transition = regime.on_conditions().next().expect("transition should exist");
        assert_eq!(transition.trigger().rhs().to_string(), "P3_e > 0");
        assert_eq!(transition.target_regime_name().as_deref(), Some("r_e"));

        let event = transition.output_events().next().expect("event should exist");
        assert_eq!(event.name(), "out_e");
    }

    #[test]
    fn reserved_symbols_keep_their_name() {
        let sub = sub_component();
        let alias = sub.alias("a_e").expect("alias should be visible");

        assert_eq!(alias.lhs(), "a_e");
        assert_eq!(alias.rhs().to_string(), "x_e * 2 + t");
        let original = sub.component().alias("a").expect("original alias should exist");
        assert_eq!(original.rhs().to_string(), "x * 2 + t");
    }

    #[test]
    fn qualified_expressions_are_cached() {
        let sub = sub_component();
        let alias = sub.alias("a_e").expect("alias should be visible");

        assert!(sub.cache().is_empty());
        let first = alias.rhs().into_owned();
        let second = alias.rhs().into_owned();
        assert_eq!(first, second);
        assert_eq!(sub.cache().len(), 1);
    }

    #[test]
    fn short_lived_elements_are_qualified_afresh() {
        let sub = sub_component();

        let seen: Vec<_> = ["a + 1", "b * 2", "c - 3"]
            .into_iter()
            .map(|rhs| {
                let alias = Alias::new("x", Expr::parse(rhs).expect("rhs should parse"));
                Namespaced::new(&sub, &alias).rhs().to_string()
            })
            .collect();

        assert_eq!(seen, ["a_e + 1", "b_e * 2", "c_e - 3"]);
        assert_eq!(sub.cache().len(), 1);
    }

    #[test]
    fn cache_keys_are_scoped_by_regime_and_kind() {
        let dynamics = Dynamics::builder("Scoped")
            .parameter("tau")
            .state_variable("x")
            .alias("x_rate", "x / tau")
            .regime(
                Regime::builder("up")
                    .time_derivative("x", "x / tau")
                    .on_condition(OnConditionBuilder::new("x > 1").goto("down")),
            )
            .regime(
                Regime::builder("down")
                    .time_derivative("x", "-x / tau")
                    .alias("x_rate", "-x / tau")
                    .on_condition(OnConditionBuilder::new("x < 0").goto("up")),
            )
            .build_unvalidated()
            .expect("builder should accept the component");
        let sub = SubDynamics::new("n", Rc::new(dynamics));

        let up = sub.regime("up_n").expect("regime should be visible");
        let down = sub.regime("down_n").expect("regime should be visible");
        for _ in 0..2 {
            let rising = up.time_derivative("x_n").expect("derivative should be visible");
            let falling = down.time_derivative("x_n").expect("derivative should be visible");
            assert_eq!(rising.rhs().to_string(), "x_n / tau_n");
            assert_eq!(falling.rhs().to_string(), "-x_n / tau_n");

            let local = down.alias("x_rate_n").expect("regime alias should be visible");
            assert_eq!(local.rhs().to_string(), "-x_n / tau_n");
            let top = sub.alias("x_rate_n").expect("alias should be visible");
            assert_eq!(top.rhs().to_string(), "x_n / tau_n");

            for regime in [up, down] {
                for transition in regime.on_conditions() {
                    let trigger = transition.trigger().rhs().into_owned();
                    assert!(trigger.symbols().contains("x_n"));
                }
            }
        }

        // two derivatives, two aliases and two triggers
        assert_eq!(sub.cache().len(), 6);
    }

    #[test]
    fn edits_through_a_view_fail() {
        let sub = sub_component();
        let regime = sub.regime("r_e").expect("regime should be visible");
        let mut derivative = regime
            .time_derivative("x_e")
            .expect("derivative should be visible");

        let error = derivative
            .set_lhs("y".to_string())
            .expect_err("qualified expressions are read-only");
        assert!(error.to_string().starts_with("Cannot change expression in global namespace"));
        assert!(derivative.set_rhs(Expr::Number(1.0)).is_err());
        assert!(derivative.subs("x_e", &Expr::Number(1.0)).is_err());

        assert_eq!(derivative.lhs(), "x_e");
        assert_eq!(derivative.rhs().to_string(), "-x_e / tau_e");
        let original = sub
            .component()
            .regime("r")
            .ok()
            .and_then(|regime| regime.time_derivative("x"))
            .expect("original derivative should exist");
        assert_eq!(original.rhs().to_string(), "-x / tau");
    }

    #[test]
    fn composite_regime_names_are_not_qualified() {
        assert_eq!(qualify("a_x___b_y", "outer"), "a_x___b_y");
        assert_eq!(qualify("pi", "outer"), "pi");
        assert_eq!(qualify("V", "cell"), "V_cell");
    }
}
