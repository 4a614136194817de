//! Deep copies that keep the sharing of the original graph.

use std::{collections::HashMap, marker::PhantomData, rc::Rc};

use nineml_ir::Dynamics;
use nineml_multi::MultiDynamics;

use crate::{Crumb, ElementKind, Node, NodeRef, Parts, RebuildError, Results, Visitor, walk};

/// Identifies an original component in the cloner's memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CloneId {
    /// A component loaded from a document, known by its URL and name.
    Named {
        /// The kind of the component
        kind: ElementKind,
        /// The document URL
        url: String,
        /// The component name
        name: String,
    },
    /// Any other component, known by its address.
    Address {
        /// The kind of the component
        kind: ElementKind,
        /// The address of the original
        address: usize,
    },
}

impl CloneId {
    /// Returns the id of `node`, or `None` if its kind is never shared.
    ///
    /// Only components can be reached through more than one owner, so they
    /// are the only kinds that get an id.
    #[must_use]
    pub fn of(node: NodeRef<'_>) -> Option<Self> {
        match node {
            NodeRef::Dynamics(dynamics) => Some(dynamics.document_url().map_or_else(
                || Self::Address {
                    kind: ElementKind::Dynamics,
                    address: node.address(),
                },
                |url| Self::Named {
                    kind: ElementKind::Dynamics,
                    url: url.to_string(),
                    name: dynamics.name().to_string(),
                },
            )),
            NodeRef::MultiDynamics(_) => Some(Self::Address {
                kind: ElementKind::MultiDynamics,
                address: node.address(),
            }),
            NodeRef::Parameter(_)
            | NodeRef::Constant(_)
            | NodeRef::StateVariable(_)
            | NodeRef::Alias(_)
            | NodeRef::Regime(_)
            | NodeRef::TimeDerivative(_)
            | NodeRef::OnCondition(_)
            | NodeRef::OnEvent(_)
            | NodeRef::Trigger(_)
            | NodeRef::StateAssignment(_)
            | NodeRef::OutputEvent(_)
            | NodeRef::AnalogSendPort(_)
            | NodeRef::AnalogReceivePort(_)
            | NodeRef::AnalogReducePort(_)
            | NodeRef::EventSendPort(_)
            | NodeRef::EventReceivePort(_)
            | NodeRef::Annotations(_)
            | NodeRef::SubDynamics(_)
            | NodeRef::PortExposure(_)
            | NodeRef::PortConnection(_) => None,
        }
    }
}

/// Rebuilds graphs element by element.
///
/// Every element is reconstructed from its processed attributes and
/// children, so a clone owns none of the original's elements. Components
/// are memoized: one reachable through several owners is cloned once and
/// the clone is shared in the same way. The memo lives as long as the
/// cloner, which cannot outlive the graphs it has cloned.
#[derive(Debug, Default)]
pub struct Cloner<'g> {
    memo: HashMap<CloneId, Node>,
    graphs: PhantomData<&'g ()>,
}

impl<'g> Cloner<'g> {
    /// Creates a cloner with an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones the graph rooted at `node`.
    ///
    /// Components already cloned by this cloner are returned from the memo.
    ///
    /// # Errors
    ///
    /// Returns a [`RebuildError`] if an element cannot be rebuilt.
    pub fn clone_node(&mut self, node: impl Into<NodeRef<'g>>) -> Result<Node, RebuildError> {
        walk(self, node.into())
    }

    /// Returns the number of memoized components.
    #[must_use]
    pub fn num_memoized(&self) -> usize {
        self.memo.len()
    }
}

impl Visitor for Cloner<'_> {
    type Output = Node;
    type Error = RebuildError;

    fn pre_visit(&mut self, node: NodeRef<'_>, path: &[Crumb]) -> Option<Node> {
        let clone = self.memo.get(&CloneId::of(node)?)?;
        log::trace!("reusing the clone of {}", crate::breadcrumbs(path));
        Some(clone.clone())
    }

    fn post_visit(
        &mut self,
        node: NodeRef<'_>,
        results: Results<Node>,
        _path: &[Crumb],
    ) -> Result<Node, RebuildError> {
        let mut parts = Parts::new();
        for (name, value) in node.attributes() {
            parts.set_attribute(name, value);
        }
        let (children, plural) = results.into_parts();
        for (name, child) in children {
            parts.set_child(name, child);
        }
        for (name, nodes) in plural {
            parts.set_plural(name, nodes);
        }

        let clone = Node::rebuild(node.kind(), parts)?;
        if let Some(id) = CloneId::of(node) {
            self.memo.insert(id, clone.clone());
        }
        Ok(clone)
    }
}

/// Returns an independent copy of `dynamics`.
///
/// # Errors
///
/// Returns a [`RebuildError`] if an element cannot be rebuilt.
pub fn clone_dynamics(dynamics: &Dynamics) -> Result<Rc<Dynamics>, RebuildError> {
    Cloner::new()
        .clone_node(dynamics)?
        .into_dynamics()
        .map_err(|node| RebuildError::UnexpectedKind {
            expected: ElementKind::Dynamics,
            found: node.kind(),
        })
}

/// Returns an independent copy of `multi`.
///
/// Sub-components shared between several slots stay shared in the copy.
///
/// # Errors
///
/// Returns a [`RebuildError`] if an element cannot be rebuilt or the copy
/// fails to build.
pub fn clone_multi_dynamics(multi: &MultiDynamics) -> Result<Rc<MultiDynamics>, RebuildError> {
    Cloner::new()
        .clone_node(multi)?
        .into_multi_dynamics()
        .map_err(|node| RebuildError::UnexpectedKind {
            expected: ElementKind::MultiDynamics,
            found: node.kind(),
        })
}

#[cfg(test)]
mod tests {
    use nineml_ir::fixtures;

    use super::*;
    use crate::EqualityChecker;

    fn network(cell: &Rc<Dynamics>) -> MultiDynamics {
        MultiDynamics::builder("Pair")
            .sub_component("a", Rc::clone(cell))
            .sub_component("b", Rc::clone(cell))
            .sub_component("syn", fixtures::exponential_synapse())
            .connect("a", "V", "syn", "V")
            .connect("syn", "Isyn", "b", "Isyn")
            .connect("a", "spike_out", "syn", "spike")
            .build()
            .expect("network should be valid")
    }

    #[test]
    fn clones_are_equal_but_not_identical() {
        let original = fixtures::leaky_integrate_and_fire();
        let clone = clone_dynamics(&original).expect("clone should succeed");

        assert!(!std::ptr::eq(clone.as_ref(), &original));
        assert_eq!(*clone, original);
        assert!(EqualityChecker::default().check(clone.as_ref(), &original));
    }

    #[test]
    fn random_components_survive_cloning() {
        let checker = EqualityChecker::default();
        for seed in 0..32 {
            let original = fixtures::random_dynamics(seed);
            let clone = clone_dynamics(&original).expect("clone should succeed");
            assert!(checker.check(clone.as_ref(), &original), "seed {seed}");
        }
    }

    #[test]
    fn shared_components_stay_shared() {
        let cell = Rc::new(fixtures::leaky_integrate_and_fire());
        let original = network(&cell);
        let clone = clone_multi_dynamics(&original).expect("clone should succeed");

        let a = clone.sub_component("a").expect("a exists").component();
        let b = clone.sub_component("b").expect("b exists").component();
        let syn = clone.sub_component("syn").expect("syn exists").component();
        assert!(Rc::ptr_eq(a, b));
        assert!(!Rc::ptr_eq(a, &cell));
        assert!(!Rc::ptr_eq(a, syn));

        assert!(EqualityChecker::default().check(clone.as_ref(), &original));
        assert_eq!(clone.num_regimes(), original.num_regimes());
    }

    #[test]
    fn one_cloner_clones_each_component_once() {
        let original = fixtures::izhikevich();
        let mut cloner = Cloner::new();

        let first = cloner
            .clone_node(&original)
            .expect("clone should succeed")
            .into_dynamics()
            .expect("the clone is a component");
        let second = cloner
            .clone_node(&original)
            .expect("clone should succeed")
            .into_dynamics()
            .expect("the clone is a component");

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cloner.num_memoized(), 1);

        // a fresh operation does not see the memo of another
        let third = clone_dynamics(&original).expect("clone should succeed");
        assert!(!Rc::ptr_eq(&first, &third));
    }

    #[test]
    fn document_components_are_known_by_url() {
        let url = Some("http://models.example/lif.xml".to_string());
        let first = fixtures::leaky_integrate_and_fire().with_document_url(url.clone());
        let second = fixtures::leaky_integrate_and_fire().with_document_url(url);

        let mut cloner = Cloner::new();
        let first = cloner.clone_node(&first).expect("clone should succeed");
        let second = cloner.clone_node(&second).expect("clone should succeed");

        let first = first.into_dynamics().expect("the clone is a component");
        let second = second.into_dynamics().expect("the clone is a component");
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn only_components_are_memoized() {
        let source = fixtures::spike_source();
        assert!(matches!(
            CloneId::of(NodeRef::from(&source)),
            Some(CloneId::Address { kind: ElementKind::Dynamics, .. })
        ));

        let regime = source.regime("default").expect("regime exists");
        assert_eq!(CloneId::of(NodeRef::from(regime)), None);
    }
}
