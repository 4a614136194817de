//! NineML dynamics for Rust
//!
//! This crate gathers the layers of the workspace behind one dependency:
//!
//! - [`expr`]: symbolic expressions
//! - [`ir`]: components, regimes, transitions and ports, with validators
//! - [`multi`]: namespace qualification and composition of components
//! - [`visitor`]: schema-driven traversal, cloning and structural equality
//! - [`analysis`]: interface inference, required definitions and expansion
//!
//! The last three are enabled by the `multi`, `visitor` and `analysis`
//! features, all on by default.
//!
//! # Examples
//!
//! ```
//! use nineml::ir::{Dynamics, OnConditionBuilder, ReduceOp, Regime};
//! use nineml::multi::MultiDynamics;
//!
//! let cell = Dynamics::builder("Cell")
//!     .parameters(["tau", "theta"])
//!     .state_variable("V")
//!     .analog_reduce_port("I", ReduceOp::Sum)
//!     .analog_send_port("V")
//!     .event_send_port("spike")
//!     .regime(
//!         Regime::builder("default")
//!             .time_derivative("V", "(I - V) / tau")
//!             .on_condition(OnConditionBuilder::new("V > theta").assign("V", "0").emit("spike")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let pair = MultiDynamics::builder("Pair")
//!     .sub_component("a", cell.clone())
//!     .sub_component("b", cell)
//!     .connect("a", "V", "b", "I")
//!     .expose("spike", "b", "spike")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(pair.num_regimes(), 1);
//! assert!(pair.parameter("tau_a").is_ok());
//! ```

pub use nineml_shared::error;

pub use nineml_expr as expr;
pub use nineml_ir as ir;

#[cfg(feature = "multi")]
pub use nineml_multi as multi;

#[cfg(feature = "visitor")]
pub use nineml_visitor as visitor;

#[cfg(feature = "analysis")]
pub use nineml_analysis as analysis;

#[cfg(all(test, feature = "analysis"))]
mod tests {
    use crate::{
        analysis::{ExpressionExpander, InterfaceInferer},
        ir::fixtures,
        multi::MultiDynamics,
        visitor::{EqualityChecker, MismatchFinder, clone_multi_dynamics},
    };

    fn network() -> MultiDynamics {
        MultiDynamics::builder("Network")
            .sub_component("cell", fixtures::leaky_integrate_and_fire())
            .sub_component("syn", fixtures::exponential_synapse())
            .sub_component("src", fixtures::spike_source())
            .connect("src", "spike_out", "syn", "spike")
            .connect("cell", "V", "syn", "V")
            .connect("syn", "Isyn", "cell", "Isyn")
            .expose("spike", "cell", "spike_out")
            .build()
            .expect("network should be valid")
    }

    #[test]
    fn compose_clone_compare_and_analyse() {
        let network = network();
        assert_eq!(network.num_regimes(), 2);

        let clone = clone_multi_dynamics(&network).expect("clone should succeed");
        assert!(!std::ptr::eq(clone.as_ref(), &network));
        assert!(EqualityChecker::default().check(clone.as_ref(), &network));
        assert_eq!(MismatchFinder::default().find(clone.as_ref(), &network), "");

        let flat = network.flatten();
        let interface = InterfaceInferer::infer(&flat);
        assert!(interface.parameters().contains("tau_cell"));
        assert!(interface.parameters().contains("rate_src"));
        assert!(interface.event_send_ports().contains("spike"));

        let expanded = ExpressionExpander::new(&flat)
            .and_then(|mut expander| expander.expanded_dynamics("NetworkExpanded"))
            .expect("expansion should be valid");
        assert_eq!(expanded.num_regimes(), flat.num_regimes());
    }
}
