//! Regimes of the hybrid automaton and the transitions between them.

use indexmap::IndexMap;
use nineml_expr::Expr;

use crate::{
    annotations::Annotations,
    expression::{Alias, ExpressionElement, IntoExpr, StateAssignment, TimeDerivative, Trigger},
    validate::ValidationError,
};

/// An event emitted on a send port when a transition fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    port_name: String,
}

impl OutputEvent {
    /// Creates a new output event.
    #[must_use]
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
        }
    }

    /// Returns the name of the event send port.
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// The effects shared by every kind of transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransitionBody {
    state_assignments: IndexMap<String, StateAssignment>,
    output_events: IndexMap<String, OutputEvent>,
    target_regime: Option<String>,
}

impl TransitionBody {
    /// Creates a new transition body.
    ///
    /// A `target_regime` of `None` means the transition returns to the regime
    /// it leaves; the enclosing [`Regime`] fills it in.
    #[must_use]
    pub fn new(
        state_assignments: impl IntoIterator<Item = StateAssignment>,
        output_events: impl IntoIterator<Item = OutputEvent>,
        target_regime: Option<String>,
    ) -> Self {
        Self {
            state_assignments: state_assignments
                .into_iter()
                .map(|assignment| (assignment.variable().to_string(), assignment))
                .collect(),
            output_events: output_events
                .into_iter()
                .map(|event| (event.port_name().to_string(), event))
                .collect(),
            target_regime,
        }
    }
}

/// Accessors common to on-condition and on-event transitions.
pub trait Transition {
    /// Returns the shared transition body.
    fn body(&self) -> &TransitionBody;

    /// Returns the state assignments, keyed by state variable.
    fn state_assignments(&self) -> &IndexMap<String, StateAssignment> {
        &self.body().state_assignments
    }

    /// Returns the output events, keyed by port name.
    fn output_events(&self) -> &IndexMap<String, OutputEvent> {
        &self.body().output_events
    }

    /// Returns the name of the regime entered when the transition fires.
    ///
    /// This is only `None` for transitions that are not part of a regime.
    fn target_regime_name(&self) -> Option<&str> {
        self.body().target_regime.as_deref()
    }

    /// Returns the free symbols of every right-hand side of the transition.
    fn rhs_symbols(&self) -> Vec<String> {
        self.state_assignments()
            .values()
            .flat_map(ExpressionElement::rhs_symbols)
            .collect()
    }
}

/// A transition that fires when its trigger becomes true.
#[derive(Debug, Clone, PartialEq)]
pub struct OnCondition {
    trigger: Trigger,
    body: TransitionBody,
}

impl OnCondition {
    /// Creates a new on-condition transition.
    #[must_use]
    pub const fn new(trigger: Trigger, body: TransitionBody) -> Self {
        Self { trigger, body }
    }

    /// Returns the trigger.
    #[must_use]
    pub const fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Returns the key identifying the transition within its regime.
    #[must_use]
    pub fn key(&self) -> String {
        self.trigger.rhs().to_string()
    }
}

impl Transition for OnCondition {
    fn body(&self) -> &TransitionBody {
        &self.body
    }
}

/// A transition that fires when an event arrives on a receive port.
#[derive(Debug, Clone, PartialEq)]
pub struct OnEvent {
    src_port_name: String,
    body: TransitionBody,
}

impl OnEvent {
    /// Creates a new on-event transition.
    #[must_use]
    pub fn new(src_port_name: impl Into<String>, body: TransitionBody) -> Self {
        Self {
            src_port_name: src_port_name.into(),
            body,
        }
    }

    /// Returns the name of the event receive port.
    #[must_use]
    pub fn src_port_name(&self) -> &str {
        &self.src_port_name
    }
}

impl Transition for OnEvent {
    fn body(&self) -> &TransitionBody {
        &self.body
    }
}

/// The elements of a [`Regime`], used to construct one.
#[derive(Debug, Clone, Default)]
pub struct RegimeParts {
    /// The regime name
    pub name: String,
    /// Time derivatives keyed by state variable
    pub time_derivatives: IndexMap<String, TimeDerivative>,
    /// Regime-local aliases keyed by name
    pub aliases: IndexMap<String, Alias>,
    /// On-condition transitions
    pub on_conditions: Vec<OnCondition>,
    /// On-event transitions keyed by receive port
    pub on_events: IndexMap<String, OnEvent>,
    /// Annotations
    pub annotations: Annotations,
}

/// One discrete state of the hybrid automaton.
///
/// A regime governs the continuous dynamics through its time derivatives
/// until one of its transitions fires.
#[derive(Debug, Clone, PartialEq)]
pub struct Regime {
    name: String,
    time_derivatives: IndexMap<String, TimeDerivative>,
    aliases: IndexMap<String, Alias>,
    on_conditions: Vec<OnCondition>,
    on_events: IndexMap<String, OnEvent>,
    annotations: Annotations,
}

impl Regime {
    /// Creates a regime from its parts.
    ///
    /// Transitions without a target regime are made to target this regime.
    #[must_use]
    pub fn from_parts(parts: RegimeParts) -> Self {
        let RegimeParts {
            name,
            time_derivatives,
            aliases,
            mut on_conditions,
            mut on_events,
            annotations,
        } = parts;

        let bodies = on_conditions
            .iter_mut()
            .map(|transition| &mut transition.body)
            .chain(on_events.values_mut().map(|transition| &mut transition.body));
        for body in bodies {
            body.target_regime.get_or_insert_with(|| name.clone());
        }

        Self {
            name,
            time_derivatives,
            aliases,
            on_conditions,
            on_events,
            annotations,
        }
    }

    /// Splits the regime into its parts.
    #[must_use]
    pub fn into_parts(self) -> RegimeParts {
        RegimeParts {
            name: self.name,
            time_derivatives: self.time_derivatives,
            aliases: self.aliases,
            on_conditions: self.on_conditions,
            on_events: self.on_events,
            annotations: self.annotations,
        }
    }

    /// Starts building a regime.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RegimeBuilder {
        RegimeBuilder::new(name)
    }

    /// Returns the regime name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the time derivatives keyed by state variable.
    #[must_use]
    pub const fn time_derivatives(&self) -> &IndexMap<String, TimeDerivative> {
        &self.time_derivatives
    }

    /// Returns the time derivative of `variable`, if the regime governs it.
    #[must_use]
    pub fn time_derivative(&self, variable: &str) -> Option<&TimeDerivative> {
        self.time_derivatives.get(variable)
    }

    /// Returns the regime-local aliases.
    #[must_use]
    pub const fn aliases(&self) -> &IndexMap<String, Alias> {
        &self.aliases
    }

    /// Returns the on-condition transitions.
    #[must_use]
    pub fn on_conditions(&self) -> &[OnCondition] {
        &self.on_conditions
    }

    /// Returns the on-event transitions keyed by receive port.
    #[must_use]
    pub const fn on_events(&self) -> &IndexMap<String, OnEvent> {
        &self.on_events
    }

    /// Returns the on-event transition triggered by `port_name`.
    #[must_use]
    pub fn on_event(&self, port_name: &str) -> Option<&OnEvent> {
        self.on_events.get(port_name)
    }

    /// Returns the annotations.
    #[must_use]
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Returns all transitions, on-conditions first.
    pub fn transitions(&self) -> impl Iterator<Item = &dyn Transition> {
        self.on_conditions
            .iter()
            .map(|transition| transition as &dyn Transition)
            .chain(
                self.on_events
                    .values()
                    .map(|transition| transition as &dyn Transition),
            )
    }

    /// Returns the number of transitions.
    #[must_use]
    pub fn num_transitions(&self) -> usize {
        self.on_conditions.len() + self.on_events.len()
    }
}

/// Collects the effects of a transition while reporting bad input.
#[derive(Debug, Clone, Default)]
struct TransitionBodyBuilder {
    state_assignments: IndexMap<String, StateAssignment>,
    output_events: IndexMap<String, OutputEvent>,
    target_regime: Option<String>,
    errors: Vec<ValidationError>,
}

impl TransitionBodyBuilder {
    fn assign(&mut self, variable: &str, rhs: impl IntoExpr) {
        match rhs.into_expr() {
            Ok(rhs) => {
                let assignment = StateAssignment::new(variable, rhs);
                if self
                    .state_assignments
                    .insert(variable.to_string(), assignment)
                    .is_some()
                {
                    self.errors.push(ValidationError::duplicate(
                        variable,
                        "state assignment",
                        "state assignment",
                    ));
                }
            }
            Err(error) => self.errors.push(ValidationError::InvalidExpression {
                element: format!("state assignment of '{variable}'"),
                error,
            }),
        }
    }

    fn emit(&mut self, port_name: &str) {
        self.output_events
            .insert(port_name.to_string(), OutputEvent::new(port_name));
    }

    fn finish(self) -> (TransitionBody, Vec<ValidationError>) {
        let body = TransitionBody {
            state_assignments: self.state_assignments,
            output_events: self.output_events,
            target_regime: self.target_regime,
        };
        (body, self.errors)
    }
}

/// Builds an [`OnCondition`].
#[derive(Debug, Clone)]
pub struct OnConditionBuilder {
    trigger: Result<Expr, ValidationError>,
    body: TransitionBodyBuilder,
}

impl OnConditionBuilder {
    /// Starts a transition that fires when `trigger` becomes true.
    #[must_use]
    pub fn new(trigger: impl IntoExpr) -> Self {
        let trigger = trigger
            .into_expr()
            .map_err(|error| ValidationError::InvalidExpression {
                element: "trigger".to_string(),
                error,
            });
        Self {
            trigger,
            body: TransitionBodyBuilder::default(),
        }
    }

    /// Adds a state assignment.
    #[must_use]
    pub fn assign(mut self, variable: &str, rhs: impl IntoExpr) -> Self {
        self.body.assign(variable, rhs);
        self
    }

    /// Adds an output event on `port_name`.
    #[must_use]
    pub fn emit(mut self, port_name: &str) -> Self {
        self.body.emit(port_name);
        self
    }

    /// Sets the regime entered when the transition fires.
    #[must_use]
    pub fn goto(mut self, target_regime: impl Into<String>) -> Self {
        self.body.target_regime = Some(target_regime.into());
        self
    }

    fn finish(self) -> (Option<OnCondition>, Vec<ValidationError>) {
        let (body, mut errors) = self.body.finish();
        match self.trigger {
            Ok(trigger) => (Some(OnCondition::new(Trigger::new(trigger), body)), errors),
            Err(error) => {
                errors.push(error);
                (None, errors)
            }
        }
    }
}

/// Builds an [`OnEvent`].
#[derive(Debug, Clone)]
pub struct OnEventBuilder {
    src_port_name: String,
    body: TransitionBodyBuilder,
}

impl OnEventBuilder {
    /// Starts a transition that fires on events arriving at `src_port_name`.
    #[must_use]
    pub fn new(src_port_name: impl Into<String>) -> Self {
        Self {
            src_port_name: src_port_name.into(),
            body: TransitionBodyBuilder::default(),
        }
    }

    /// Adds a state assignment.
    #[must_use]
    pub fn assign(mut self, variable: &str, rhs: impl IntoExpr) -> Self {
        self.body.assign(variable, rhs);
        self
    }

    /// Adds an output event on `port_name`.
    #[must_use]
    pub fn emit(mut self, port_name: &str) -> Self {
        self.body.emit(port_name);
        self
    }

    /// Sets the regime entered when the transition fires.
    #[must_use]
    pub fn goto(mut self, target_regime: impl Into<String>) -> Self {
        self.body.target_regime = Some(target_regime.into());
        self
    }

    fn finish(self) -> (OnEvent, Vec<ValidationError>) {
        let (body, errors) = self.body.finish();
        (OnEvent::new(self.src_port_name, body), errors)
    }
}

/// Builds a [`Regime`], collecting malformed expressions and duplicate names.
#[derive(Debug, Clone)]
pub struct RegimeBuilder {
    parts: RegimeParts,
    errors: Vec<ValidationError>,
}

impl RegimeBuilder {
    /// Starts a regime called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: RegimeParts {
                name: name.into(),
                ..RegimeParts::default()
            },
            errors: Vec::new(),
        }
    }

    /// Adds the time derivative `d(variable)/dt = rhs`.
    #[must_use]
    pub fn time_derivative(mut self, variable: &str, rhs: impl IntoExpr) -> Self {
        match rhs.into_expr() {
            Ok(rhs) => {
                let derivative = TimeDerivative::new(variable, rhs);
                if self
                    .parts
                    .time_derivatives
                    .insert(variable.to_string(), derivative)
                    .is_some()
                {
                    self.errors.push(ValidationError::duplicate(
                        variable,
                        "time derivative",
                        "time derivative",
                    ));
                }
            }
            Err(error) => self.errors.push(ValidationError::InvalidExpression {
                element: format!("time derivative of '{variable}'"),
                error,
            }),
        }
        self
    }

    /// Adds a regime-local alias.
    #[must_use]
    pub fn alias(mut self, name: &str, rhs: impl IntoExpr) -> Self {
        match rhs.into_expr() {
            Ok(rhs) => {
                if self
                    .parts
                    .aliases
                    .insert(name.to_string(), Alias::new(name, rhs))
                    .is_some()
                {
                    self.errors
                        .push(ValidationError::duplicate(name, "alias", "alias"));
                }
            }
            Err(error) => self.errors.push(ValidationError::InvalidExpression {
                element: format!("alias '{name}'"),
                error,
            }),
        }
        self
    }

    /// Adds an on-condition transition.
    #[must_use]
    pub fn on_condition(mut self, transition: OnConditionBuilder) -> Self {
        let (transition, errors) = transition.finish();
        self.errors.extend(errors);
        self.parts.on_conditions.extend(transition);
        self
    }

    /// Adds an on-event transition.
    #[must_use]
    pub fn on_event(mut self, transition: OnEventBuilder) -> Self {
        let (transition, errors) = transition.finish();
        self.errors.extend(errors);
        let port_name = transition.src_port_name().to_string();
        if self.parts.on_events.insert(port_name.clone(), transition).is_some() {
            self.errors
                .push(ValidationError::duplicate(&port_name, "on-event", "on-event"));
        }
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotate(mut self, namespace: &str, key: &str, value: &str) -> Self {
        self.parts.annotations.set(namespace, key, value);
        self
    }

    /// Finishes the regime, returning it with any problems found on the way.
    #[must_use]
    pub fn finish(self) -> (Regime, Vec<ValidationError>) {
        (Regime::from_parts(self.parts), self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_is_the_enclosing_regime() {
        let (regime, errors) = Regime::builder("subthreshold")
            .time_derivative("V", "(I - V) / tau")
            .on_condition(OnConditionBuilder::new("V > theta").goto("refractory"))
            .on_event(OnEventBuilder::new("spike_in").assign("g", "g + w"))
            .finish();

        assert!(errors.is_empty());
        let targets: Vec<_> = regime
            .transitions()
            .map(|transition| transition.target_regime_name())
            .collect();
        assert_eq!(targets, [Some("refractory"), Some("subthreshold")]);
    }

    #[test]
    fn problems_are_collected() {
        let (regime, errors) = Regime::builder("r")
            .time_derivative("V", "V +")
            .alias("a", "1")
            .alias("a", "2")
            .on_condition(OnConditionBuilder::new("V >"))
            .finish();

        assert_eq!(errors.len(), 3);
        assert!(regime.on_conditions().is_empty());
        assert!(regime.time_derivatives().is_empty());
    }

    #[test]
    fn transition_symbols() {
        let (regime, _) = Regime::builder("r")
            .on_event(OnEventBuilder::new("spike").assign("g", "g + w").emit("out"))
            .finish();
        let transition = regime.on_event("spike").expect("on-event should exist");

        assert_eq!(transition.rhs_symbols(), ["g", "w"]);
        assert!(transition.output_events().contains_key("out"));
    }
}
