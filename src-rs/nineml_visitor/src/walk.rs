//! Single-graph traversal.

use std::fmt;

use indexmap::IndexMap;

use crate::{ElementKind, NodeRef};

/// One step of the path from the root of a traversal to the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    kind: ElementKind,
    key: String,
}

impl Crumb {
    /// Creates the crumb of `node`.
    #[must_use]
    pub fn of(node: NodeRef<'_>) -> Self {
        Self {
            kind: node.kind(),
            key: node.key(),
        }
    }

    /// Returns the kind of the node.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Returns the key of the node.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Crumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}('{}')", self.kind, self.key)
    }
}

/// Formats a path as `[Kind('key')>Kind('key')]`.
#[must_use]
pub fn breadcrumbs(path: &[Crumb]) -> String {
    let crumbs: Vec<String> = path.iter().map(Crumb::to_string).collect();
    format!("[{}]", crumbs.join(">"))
}

/// The outputs produced for the children of one node.
#[derive(Debug)]
pub struct Results<T> {
    children: IndexMap<&'static str, T>,
    plural: IndexMap<&'static str, Vec<T>>,
}

impl<T> Results<T> {
    fn new() -> Self {
        Self {
            children: IndexMap::new(),
            plural: IndexMap::new(),
        }
    }

    /// Returns the output for the singular child `name`, if it was present.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&T> {
        self.children.get(name)
    }

    /// Returns the outputs for the plural slot `name`.
    #[must_use]
    pub fn plural(&self, name: &str) -> &[T] {
        self.plural.get(name).map_or(&[], Vec::as_slice)
    }

    /// Splits the results into singular and plural outputs, keyed by slot.
    #[must_use]
    pub fn into_parts(self) -> (IndexMap<&'static str, T>, IndexMap<&'static str, Vec<T>>) {
        (self.children, self.plural)
    }
}

/// Processes every node of a graph, children before parents.
///
/// The walk visits the children each kind declares in its schema. For
/// every node it calls [`pre_visit`](Visitor::pre_visit) first, which may
/// supply the output directly and skip the children, and otherwise
/// [`post_visit`](Visitor::post_visit) with the outputs of the children.
pub trait Visitor {
    /// The output produced for each node.
    type Output;
    /// The error that stops the walk.
    type Error;

    /// Called on entering `node`; `path` ends with the node itself.
    ///
    /// Returning `Some` skips the children and `post_visit`.
    fn pre_visit(&mut self, node: NodeRef<'_>, path: &[Crumb]) -> Option<Self::Output> {
        let _ = (node, path);
        None
    }

    /// Produces the output of `node` from the outputs of its children.
    ///
    /// # Errors
    ///
    /// Any error stops the walk and is returned from [`walk`].
    fn post_visit(
        &mut self,
        node: NodeRef<'_>,
        results: Results<Self::Output>,
        path: &[Crumb],
    ) -> Result<Self::Output, Self::Error>;
}

/// A visitor that only counts nodes, by kind.
impl Visitor for IndexMap<ElementKind, usize> {
    type Output = ();
    type Error = std::convert::Infallible;

    fn post_visit(
        &mut self,
        node: NodeRef<'_>,
        _results: Results<()>,
        _path: &[Crumb],
    ) -> Result<(), Self::Error> {
        *self.entry(node.kind()).or_default() += 1;
        Ok(())
    }
}

/// Walks the graph rooted at `node`.
///
/// # Errors
///
/// Returns the first error produced by the visitor.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, node: NodeRef<'_>) -> Result<V::Output, V::Error> {
    let mut path = Vec::new();
    walk_at(visitor, node, &mut path)
}

fn walk_at<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: NodeRef<'_>,
    path: &mut Vec<Crumb>,
) -> Result<V::Output, V::Error> {
    path.push(Crumb::of(node));
    let output = visit(visitor, node, path);
    path.pop();
    output
}

fn visit<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: NodeRef<'_>,
    path: &mut Vec<Crumb>,
) -> Result<V::Output, V::Error> {
    if let Some(output) = visitor.pre_visit(node, path) {
        return Ok(output);
    }

    let schema = node.kind().schema();
    let mut results = Results::new();
    for (name, _) in schema.children() {
        if let Some(child) = node.child(name) {
            let output = walk_at(visitor, child, path)?;
            results.children.insert(*name, output);
        }
    }
    for (name, _) in schema.plural() {
        let outputs = node
            .children(name)
            .into_iter()
            .map(|child| walk_at(visitor, child, path))
            .collect::<Result<Vec<_>, _>>()?;
        results.plural.insert(*name, outputs);
    }

    visitor.post_visit(node, results, path)
}

#[cfg(test)]
mod tests {
    use nineml_ir::fixtures;

    use super::*;

    struct Paths(Vec<String>);

    impl Visitor for Paths {
        type Output = ();
        type Error = ();

        fn pre_visit(&mut self, node: NodeRef<'_>, _path: &[Crumb]) -> Option<()> {
            // ports are leaves, nothing below them is interesting
            (node.kind() == ElementKind::AnalogSendPort).then_some(())
        }

        fn post_visit(&mut self, node: NodeRef<'_>, _: Results<()>, path: &[Crumb]) -> Result<(), ()> {
            if node.kind() == ElementKind::StateAssignment {
                self.0.push(breadcrumbs(path));
            }
            Ok(())
        }
    }

    #[test]
    fn counts_every_node() {
        let dynamics = fixtures::leaky_integrate_and_fire();
        let mut counts = IndexMap::new();
        walk(&mut counts, NodeRef::from(&dynamics)).expect("counting cannot fail");

        assert_eq!(counts[&ElementKind::Dynamics], 1);
        assert_eq!(counts[&ElementKind::Parameter], 5);
        assert_eq!(counts[&ElementKind::Regime], 2);
        assert_eq!(counts[&ElementKind::OnCondition], 2);
        assert_eq!(counts[&ElementKind::Trigger], 2);
        assert_eq!(counts[&ElementKind::StateAssignment], 2);
        assert_eq!(counts[&ElementKind::Annotations], 3);
    }

    #[test]
    fn paths_name_every_ancestor() {
        let dynamics = fixtures::leaky_integrate_and_fire();
        let mut paths = Paths(Vec::new());
        walk(&mut paths, NodeRef::from(&dynamics)).expect("walk cannot fail");

        assert_eq!(
            paths.0[0],
            "[Dynamics('LeakyIntegrateAndFire')>Regime('subthreshold')>OnCondition('V > v_threshold')>StateAssignment('V')]"
        );
        assert_eq!(paths.0.len(), 2);
    }
}
