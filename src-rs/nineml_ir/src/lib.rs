//! Abstraction-layer elements for NineML dynamics
//!
//! A [`Dynamics`] component is a hybrid automaton: parameters, constants and
//! state variables, aliases, ports, and regimes whose transitions move the
//! automaton between them. Components are assembled with [`DynamicsBuilder`]
//! and checked by the validators in [`validate`].

mod annotations;
mod document;
mod dynamics;
mod expression;
mod parameter;
mod port;
mod properties;
mod regime;
pub mod validate;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use annotations::Annotations;
pub use document::{Document, DocumentContext, DocumentError, Reference};
pub use dynamics::{Dynamics, DynamicsBuilder, DynamicsParts, NameError};
pub use expression::{
    Alias, Assignment, AssignmentEdit, ExprTextError, ExpressionEdit, ExpressionElement, IntoExpr,
    StateAssignment, TimeDerivative, Trigger,
};
pub use parameter::{Constant, Parameter, StateVariable};
pub use port::{
    AnalogReceivePort, AnalogReducePort, AnalogSendPort, EventReceivePort, EventSendPort, Port,
    PortKind, PortRef, ReduceOp,
};
pub use properties::{DynamicsProperties, PropertyError};
pub use regime::{
    OnCondition, OnConditionBuilder, OnEvent, OnEventBuilder, OutputEvent, Regime, RegimeBuilder,
    RegimeParts, Transition, TransitionBody,
};
pub use validate::{ValidationError, ValidationErrors};
