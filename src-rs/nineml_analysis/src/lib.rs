//! Queries over NineML dynamics
//!
//! - [`InterfaceInferer`] derives a component's parameters, state variables
//!   and event ports from how its expressions and transitions use them.
//! - [`RequiredDefinitions`] finds the top-level definitions that a set of
//!   expressions depends on, so that unused aliases can be pruned.
//! - [`ExpressionExpander`] rewrites expressions in terms of inputs only,
//!   substituting aliases recursively.
//!
//! Composites are analysed through their flattened form
//! (`MultiDynamics::flatten`).

mod expand;
mod inferer;
mod required;

pub use expand::{ExpansionCache, ExpressionExpander};
pub use inferer::{InferredInterface, InterfaceInferer, build_with_inferred_parameters};
pub use required::RequiredDefinitions;
