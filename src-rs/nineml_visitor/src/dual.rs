//! Lock-step traversal of two graphs of presumed matching shape.

use std::{fmt, ops::ControlFlow};

use crate::{AttrValue, Crumb, ElementKind, NodeRef, breadcrumbs};

/// A difference between two graphs.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// The two nodes have different kinds.
    Kind {
        /// The kind of the first node
        first: ElementKind,
        /// The kind of the second node
        second: ElementKind,
        /// The kind the slot holds
        expected: ElementKind,
    },
    /// An attribute differs.
    Attribute {
        /// The attribute name
        name: &'static str,
        /// The value in the first graph
        first: AttrValue,
        /// The value in the second graph
        second: AttrValue,
    },
    /// A singular child is present on one side only.
    Child {
        /// The child slot
        name: &'static str,
        /// The kind of the first child, if present
        first: Option<ElementKind>,
        /// The kind of the second child, if present
        second: Option<ElementKind>,
    },
    /// The children of a plural slot have different keys.
    Keys {
        /// The kind the slot holds
        kind: ElementKind,
        /// The sorted keys of the first graph
        first: Vec<String>,
        /// The sorted keys of the second graph
        second: Vec<String>,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |kind: &Option<ElementKind>| match kind {
            Some(kind) => kind.to_string(),
            None => "None".to_string(),
        };
        match self {
            Self::Kind {
                first,
                second,
                expected,
            } => write!(f, "types: [{first}] | [{second}] (expected={expected})"),
            Self::Attribute {
                name,
                first,
                second,
            } => write!(f, "'{name}' attr: [{first}] | [{second}]"),
            Self::Child {
                name,
                first,
                second,
            } => write!(
                f,
                "'{name}' child: [{}] | [{}]",
                describe(first),
                describe(second)
            ),
            Self::Keys {
                kind,
                first,
                second,
            } => write!(
                f,
                "{kind} keys: [{}] | [{}]",
                first.join(", "),
                second.join(", ")
            ),
        }
    }
}

impl Mismatch {
    /// Formats the mismatch as one report line located at `path`.
    #[must_use]
    pub fn report_line(&self, path: &[Crumb]) -> String {
        format!("{} - {self}", breadcrumbs(path))
    }
}

/// Compares two graphs node by node.
pub trait DualVisitor {
    /// Returns whether two values of the attribute `name` of `kind` match.
    fn attribute_eq(
        &self,
        kind: ElementKind,
        name: &str,
        first: &AttrValue,
        second: &AttrValue,
    ) -> bool;

    /// Called for every difference found; `path` locates it in the first
    /// graph. Breaking stops the walk.
    fn mismatch(&mut self, path: &[Crumb], mismatch: Mismatch) -> ControlFlow<()>;
}

/// Walks `first` and `second` in lock step.
///
/// Attributes are compared with [`DualVisitor::attribute_eq`]. Singular
/// children must be present on both sides or on neither. Plural children
/// must have the same keys, and are then paired by key.
pub fn walk_dual<V: DualVisitor + ?Sized>(
    visitor: &mut V,
    first: NodeRef<'_>,
    second: NodeRef<'_>,
) -> ControlFlow<()> {
    let mut path = Vec::new();
    visit_dual(visitor, first, second, first.kind(), &mut path)
}

fn visit_dual<V: DualVisitor + ?Sized>(
    visitor: &mut V,
    first: NodeRef<'_>,
    second: NodeRef<'_>,
    expected: ElementKind,
    path: &mut Vec<Crumb>,
) -> ControlFlow<()> {
    path.push(Crumb::of(first));
    let flow = compare(visitor, first, second, expected, path);
    path.pop();
    flow
}

fn compare<V: DualVisitor + ?Sized>(
    visitor: &mut V,
    first: NodeRef<'_>,
    second: NodeRef<'_>,
    expected: ElementKind,
    path: &mut Vec<Crumb>,
) -> ControlFlow<()> {
    let kind = first.kind();
    if kind != second.kind() {
        return visitor.mismatch(
            path,
            Mismatch::Kind {
                first: kind,
                second: second.kind(),
                expected,
            },
        );
    }

    let schema = kind.schema();
    for ((name, first_value), (_, second_value)) in
        first.attributes().into_iter().zip(second.attributes())
    {
        if !visitor.attribute_eq(kind, name, &first_value, &second_value) {
            visitor.mismatch(
                path,
                Mismatch::Attribute {
                    name,
                    first: first_value,
                    second: second_value,
                },
            )?;
        }
    }

    for (name, child_kind) in schema.children() {
        match (first.child(name), second.child(name)) {
            (Some(first_child), Some(second_child)) => {
                visit_dual(visitor, first_child, second_child, *child_kind, path)?;
            }
            (None, None) => {}
            (first_child, second_child) => visitor.mismatch(
                path,
                Mismatch::Child {
                    name,
                    first: first_child.map(NodeRef::kind),
                    second: second_child.map(NodeRef::kind),
                },
            )?,
        }
    }

    for (name, child_kind) in schema.plural() {
        let mut first_children: Vec<_> = first
            .children(name)
            .into_iter()
            .map(|child| (child.match_key(), child))
            .collect();
        let mut second_children: Vec<_> = second
            .children(name)
            .into_iter()
            .map(|child| (child.match_key(), child))
            .collect();
        first_children.sort_by(|(a, _), (b, _)| a.cmp(b));
        second_children.sort_by(|(a, _), (b, _)| a.cmp(b));

        let same_keys = first_children.len() == second_children.len()
            && first_children
                .iter()
                .zip(&second_children)
                .all(|((a, _), (b, _))| a == b);
        if !same_keys {
            visitor.mismatch(
                path,
                Mismatch::Keys {
                    kind: *child_kind,
                    first: sorted_keys(first_children),
                    second: sorted_keys(second_children),
                },
            )?;
            continue;
        }

        for ((_, first_child), (_, second_child)) in first_children.into_iter().zip(second_children)
        {
            visit_dual(visitor, first_child, second_child, *child_kind, path)?;
        }
    }

    ControlFlow::Continue(())
}

fn sorted_keys(children: Vec<(String, NodeRef<'_>)>) -> Vec<String> {
    let mut keys: Vec<_> = children.into_iter().map(|(_, child)| child.key()).collect();
    keys.sort();
    keys
}
