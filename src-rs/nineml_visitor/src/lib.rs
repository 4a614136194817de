//! Schema-driven traversal of NineML object graphs
//!
//! Every element kind declares a [`KindSchema`]: its scalar attributes, its
//! singular children and its plural children. [`walk`] drives a [`Visitor`]
//! over one graph from those tables, and [`walk_dual`] drives a
//! [`DualVisitor`] over two graphs in lock step. The [`Cloner`],
//! [`EqualityChecker`] and [`MismatchFinder`] are built on the two walks.
//!
//! # Examples
//!
//! ```
//! use nineml_ir::{Dynamics, Regime};
//! use nineml_visitor::{EqualityChecker, clone_dynamics};
//!
//! let decay = Dynamics::builder("Decay")
//!     .parameter("tau")
//!     .state_variable("x")
//!     .regime(Regime::builder("default").time_derivative("x", "-x / tau"))
//!     .build()
//!     .unwrap();
//!
//! let copy = clone_dynamics(&decay).unwrap();
//! assert!(EqualityChecker::default().check(copy.as_ref(), &decay));
//! ```

mod cloner;
mod dual;
mod equality;
mod error;
mod kind;
mod node;
mod walk;

pub use cloner::{CloneId, Cloner, clone_dynamics, clone_multi_dynamics};
pub use dual::{DualVisitor, Mismatch, walk_dual};
pub use equality::{EqualityChecker, EqualityOptions, MismatchFinder};
pub use error::RebuildError;
pub use kind::{ElementKind, KindSchema};
pub use node::{AttrValue, Node, NodeRef, Parts};
pub use walk::{Crumb, Results, Visitor, breadcrumbs, walk};
