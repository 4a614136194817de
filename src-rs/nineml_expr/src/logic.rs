//! Equivalence of boolean expressions.
//!
//! Each relational sub-expression is normalised to `p < 0`, `p <= 0` or
//! `p == 0` over a canonical polynomial `p`, possibly negated. Normalised
//! relations and boolean symbols become propositional atoms and the two
//! expressions are compared by truth table.

use indexmap::IndexSet;

use crate::{
    canonical::{self, Polynomial},
    expr::{BinaryOp, ComparisonOp, Expr, UnaryOp},
};

/// Truth tables are only built over at most this many atoms.
const MAX_TRUTH_TABLE_ATOMS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Lt,
    Le,
    Eq,
}

impl Relation {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
        }
    }
}

#[derive(Debug, Clone)]
enum Prop {
    Const(bool),
    Atom(usize),
    Not(Box<Prop>),
    And(Box<Prop>, Box<Prop>),
    Or(Box<Prop>, Box<Prop>),
}

impl Prop {
    fn not(prop: Self) -> Self {
        Self::Not(Box::new(prop))
    }

    fn eval(&self, assignment: u32) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::Atom(index) => assignment & (1 << index) != 0,
            Self::Not(prop) => !prop.eval(assignment),
            Self::And(left, right) => left.eval(assignment) && right.eval(assignment),
            Self::Or(left, right) => left.eval(assignment) || right.eval(assignment),
        }
    }
}

/// Interns atom keys so that both expressions share one atom table.
#[derive(Debug, Default)]
struct Atoms {
    keys: IndexSet<String>,
}

impl Atoms {
    fn intern(&mut self, key: String) -> Prop {
        let (index, _) = self.keys.insert_full(key);
        Prop::Atom(index)
    }

    fn to_prop(&mut self, expr: &Expr) -> Prop {
        match expr {
            Expr::Boolean(value) => Prop::Const(*value),
            Expr::UnaryOp {
                op: UnaryOp::Not,
                expr,
            } => Prop::not(self.to_prop(expr)),
            Expr::BinaryOp {
                op: BinaryOp::And,
                left,
                right,
            } => Prop::And(Box::new(self.to_prop(left)), Box::new(self.to_prop(right))),
            Expr::BinaryOp {
                op: BinaryOp::Or,
                left,
                right,
            } => Prop::Or(Box::new(self.to_prop(left)), Box::new(self.to_prop(right))),
            Expr::ComparisonOp { op, left, right } => self.comparison(*op, left, right),
            Expr::Number(_)
            | Expr::Symbol(_)
            | Expr::UnaryOp { .. }
            | Expr::BinaryOp { .. }
            | Expr::FunctionCall { .. } => {
                self.intern(format!("?{}", canonical::simplify(expr)))
            }
        }
    }

    fn comparison(&mut self, op: ComparisonOp, left: &Expr, right: &Expr) -> Prop {
        let (Some(left), Some(right)) = (canonical::to_polynomial(left), canonical::to_polynomial(right))
        else {
            return self.intern(format!(
                "{} {op} {}",
                canonical::simplify(left),
                canonical::simplify(right)
            ));
        };

        let difference = left.sub(&right);
        match op {
            ComparisonOp::LessThan => self.relation(Relation::Lt, &difference),
            ComparisonOp::LessThanEq => self.relation(Relation::Le, &difference),
            ComparisonOp::GreaterThan => self.relation(Relation::Lt, &difference.scale(-1.0)),
            ComparisonOp::GreaterThanEq => self.relation(Relation::Le, &difference.scale(-1.0)),
            ComparisonOp::Eq => self.relation(Relation::Eq, &difference),
            ComparisonOp::NotEq => Prop::not(self.relation(Relation::Eq, &difference)),
        }
    }

    /// Builds the atom for `p <relation> 0` with `p` scaled so that its
    /// leading coefficient is one.
    fn relation(&mut self, relation: Relation, polynomial: &Polynomial) -> Prop {
        let Some(leading) = polynomial.leading_coefficient() else {
            // p is zero
            return Prop::Const(relation != Relation::Lt);
        };

        if polynomial.to_expr().symbols().is_empty() {
            let value = leading;
            return Prop::Const(match relation {
                Relation::Lt => value < 0.0,
                Relation::Le => value <= 0.0,
                Relation::Eq => value.abs() < f64::EPSILON,
            });
        }

        let normalised = polynomial.scale(1.0 / leading.abs());
        match (relation, leading < 0.0) {
            (Relation::Eq, _) => self.intern(format!("{} == 0", polynomial.scale(1.0 / leading).key())),
            (_, false) => self.intern(format!("{} {} 0", normalised.key(), relation.symbol())),
            // -q < 0 is q > 0, which is !(q <= 0)
            (Relation::Lt, true) => {
                Prop::not(self.intern(format!("{} <= 0", normalised.scale(-1.0).key())))
            }
            (Relation::Le, true) => {
                Prop::not(self.intern(format!("{} < 0", normalised.scale(-1.0).key())))
            }
        }
    }
}

/// Returns whether two boolean expressions are equivalent.
pub fn equivalent(a: &Expr, b: &Expr) -> bool {
    let mut atoms = Atoms::default();
    let left = atoms.to_prop(a);
    let right = atoms.to_prop(b);

    let atom_count = atoms.keys.len();
    if atom_count > MAX_TRUTH_TABLE_ATOMS {
        log::debug!("comparing {atom_count} atoms structurally");
        return canonical::simplify(a) == canonical::simplify(b);
    }

    (0..1u32 << atom_count).all(|assignment| left.eval(assignment) == right.eval(assignment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Expr {
        Expr::parse(source).expect("expression should parse")
    }

    fn assert_equivalent(a: &str, b: &str) {
        assert!(equivalent(&parse(a), &parse(b)), "`{a}` should be equivalent to `{b}`");
    }

    fn assert_not_equivalent(a: &str, b: &str) {
        assert!(!equivalent(&parse(a), &parse(b)), "`{a}` should differ from `{b}`");
    }

    #[test]
    fn negated_comparisons() {
        assert_equivalent("!(x >= 1)", "x < 1");
        assert_equivalent("!(V > theta)", "V <= theta");
        assert_equivalent("a != b", "!(a == b)");
    }

    #[test]
    fn rearranged_comparisons() {
        assert_equivalent("V > theta", "theta < V");
        assert_equivalent("2 * x < 4", "x < 2");
        assert_equivalent("x + 1 == y", "y - x == 1");
    }

    #[test]
    fn propositional_laws() {
        assert_equivalent("!(a && b)", "!a || !b");
        assert_equivalent("a && (b || c)", "a && b || a && c");
        assert_equivalent("a || true", "true");
    }

    #[test]
    fn different_conditions() {
        assert_not_equivalent("x < 1", "x <= 1");
        assert_not_equivalent("x > 1", "x < 1");
        assert_not_equivalent("a && b", "a || b");
    }

    #[test]
    fn constant_comparisons() {
        assert_equivalent("1 < 2", "true");
        assert_equivalent("x - x > 0", "false");
    }
}
