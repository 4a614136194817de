//! Composition of NineML dynamics components.
//!
//! A [`MultiDynamics`] combines named sub-components into one component.
//! Elements of each sub-component are seen through [`Namespaced`] views that
//! append the sub-component name to every name they mention, ports are wired
//! together with [`PortConnection`]s and presented to the outside with
//! [`PortExposure`]s, and regimes are the cross product of the sub-component
//! regimes. [`MultiDynamics::flatten`] turns a composite back into a plain
//! [`Dynamics`](nineml_ir::Dynamics).

mod connection;
mod error;
mod exposure;
mod flatten;
mod multi_dynamics;
mod multi_regime;
mod namespace;
mod properties;
mod sub_component;

pub use crate::connection::{ConnectionKind, PortConnection};
pub use crate::error::{ImmutableError, MultiDynamicsError, NotBoundError};
pub use crate::exposure::{BoundExposure, ExposureDescriptor, PortExposure};
pub use crate::multi_dynamics::{FanIn, MultiAlias, MultiDynamics, MultiDynamicsBuilder};
pub use crate::multi_regime::{
    MAX_MULTI_REGIMES, MULTI_REGIME_SEPARATOR, MultiRegime, RegimeTuple, multi_regime_name,
    regime_product, tuple_name,
};
pub use crate::namespace::{
    AsOnCondition, AsRegime, CachedExpression, LocalName, Namespaced, QualifiedExprCache,
    QualifiedKey, append_namespace, is_qualifiable, qualify,
};
pub use crate::properties::MultiDynamicsProperties;
pub use crate::sub_component::SubDynamics;
