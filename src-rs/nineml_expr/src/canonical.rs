//! Canonical polynomial form of numeric expressions.
//!
//! A numeric expression is expanded into a sum of monomials. Each monomial is
//! a product of atoms raised to integer powers, where an atom is either a
//! symbol or an opaque sub-expression (a function call, a non-integer power,
//! or the reciprocal of a sum). Atoms are identified by a canonical key so
//! that structurally different spellings of the same term collect together.

use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    eval,
    expr::{BinaryOp, ComparisonOp, Expr, UnaryOp},
};

/// Relative size below which the sum of two coefficients is treated as an
/// exact cancellation.
const CANCELLATION_TOLERANCE: f64 = 1e-9;

/// Largest integer power that is expanded by repeated multiplication.
const MAX_EXPANDED_POWER: i32 = 8;

#[derive(Debug, Clone)]
pub struct Atom {
    key: String,
    expr: Expr,
}

impl Atom {
    fn symbol(name: &str) -> Self {
        Self {
            key: name.to_string(),
            expr: Expr::symbol(name),
        }
    }

    const fn opaque(key: String, expr: Expr) -> Self {
        Self { key, expr }
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Atom {}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

type Monomial = BTreeMap<Atom, i32>;

/// A sum of monomials with real coefficients.
#[derive(Debug, Clone, Default)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, f64>,
}

impl Polynomial {
    fn constant(value: f64) -> Self {
        let mut terms = BTreeMap::new();
        if value != 0.0 {
            terms.insert(Monomial::new(), value);
        }
        Self { terms }
    }

    fn atom(atom: Atom) -> Self {
        let mut monomial = Monomial::new();
        monomial.insert(atom, 1);
        Self {
            terms: BTreeMap::from([(monomial, 1.0)]),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    fn as_constant(&self) -> Option<f64> {
        match self.terms.len() {
            0 => Some(0.0),
            1 => self
                .terms
                .iter()
                .next()
                .and_then(|(monomial, coefficient)| monomial.is_empty().then_some(*coefficient)),
            _ => None,
        }
    }

    fn single_term(&self) -> Option<(&Monomial, f64)> {
        if self.terms.len() == 1 {
            self.terms
                .iter()
                .next()
                .map(|(monomial, coefficient)| (monomial, *coefficient))
        } else {
            None
        }
    }

    /// Returns the coefficient of the greatest monomial.
    pub fn leading_coefficient(&self) -> Option<f64> {
        self.terms.values().next_back().copied()
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: f64) {
        if coefficient == 0.0 {
            return;
        }

        match self.terms.get(&monomial).copied() {
            Some(existing) => {
                let sum = existing + coefficient;
                let scale = existing.abs().max(coefficient.abs());
                if sum.abs() <= CANCELLATION_TOLERANCE * scale {
                    self.terms.remove(&monomial);
                } else {
                    self.terms.insert(monomial, sum);
                }
            }
            None => {
                self.terms.insert(monomial, coefficient);
            }
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (monomial, coefficient) in &other.terms {
            result.add_term(monomial.clone(), *coefficient);
        }
        result
    }

    pub fn scale(&self, factor: f64) -> Self {
        let mut result = Self::default();
        for (monomial, coefficient) in &self.terms {
            result.add_term(monomial.clone(), coefficient * factor);
        }
        result
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(-1.0))
    }

    fn mul(&self, other: &Self) -> Self {
        let mut result = Self::default();
        for (left_monomial, left_coefficient) in &self.terms {
            for (right_monomial, right_coefficient) in &other.terms {
                let mut monomial = left_monomial.clone();
                for (atom, exponent) in right_monomial {
                    let combined = monomial.get(atom).copied().unwrap_or(0) + exponent;
                    if combined == 0 {
                        monomial.remove(atom);
                    } else {
                        monomial.insert(atom.clone(), combined);
                    }
                }
                result.add_term(monomial, left_coefficient * right_coefficient);
            }
        }
        result
    }

    fn pow(&self, exponent: u32) -> Self {
        (0..exponent).fold(Self::constant(1.0), |acc, _| acc.mul(self))
    }

    /// Returns the reciprocal of a single term, or `None` for sums.
    fn invert_term(&self) -> Option<Self> {
        let (monomial, coefficient) = self.single_term()?;
        let inverted = monomial
            .iter()
            .map(|(atom, exponent)| (atom.clone(), -exponent))
            .collect();
        Some(Self {
            terms: BTreeMap::from([(inverted, 1.0 / coefficient)]),
        })
    }

    /// Returns `self` wrapped as an atom raised to `exponent`.
    fn as_atom_power(&self, exponent: i32) -> Self {
        let atom = Atom::opaque(format!("({})", self.key()), self.to_expr());
        let mut monomial = Monomial::new();
        monomial.insert(atom, exponent);
        Self {
            terms: BTreeMap::from([(monomial, 1.0)]),
        }
    }

    /// Canonical textual key; equal for polynomials with the same terms.
    pub fn key(&self) -> String {
        if self.terms.is_empty() {
            return "0".to_string();
        }

        self.terms
            .iter()
            .map(|(monomial, coefficient)| {
                let factors = monomial
                    .iter()
                    .map(|(atom, exponent)| format!("{}^{exponent}", atom.key))
                    .collect::<Vec<_>>()
                    .join("*");
                format!("{coefficient:.10e}*{factors}")
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Converts back to an expression, constant term last.
    pub fn to_expr(&self) -> Expr {
        let (constant, others): (Vec<_>, Vec<_>) = self
            .terms
            .iter()
            .partition(|(monomial, _)| monomial.is_empty());

        let mut terms = others.into_iter().chain(constant);
        let Some((monomial, coefficient)) = terms.next() else {
            return Expr::Number(0.0);
        };

        let first = match term_to_expr(monomial, *coefficient) {
            (false, term) => term,
            (true, Expr::Number(magnitude)) => Expr::Number(-magnitude),
            (true, term) => Expr::unary_op(UnaryOp::Neg, term),
        };

        terms.fold(first, |acc, (monomial, coefficient)| {
            let (negative, term) = term_to_expr(monomial, *coefficient);
            let op = if negative { BinaryOp::Sub } else { BinaryOp::Add };
            Expr::binary_op(op, acc, term)
        })
    }
}

/// Renders one term as its sign and magnitude.
fn term_to_expr(monomial: &Monomial, coefficient: f64) -> (bool, Expr) {
    let factor = |atom: &Atom, exponent: i32| {
        if exponent == 1 {
            atom.expr.clone()
        } else {
            Expr::binary_op(BinaryOp::Pow, atom.expr.clone(), Expr::Number(f64::from(exponent)))
        }
    };

    let numerator = monomial
        .iter()
        .filter(|(_, exponent)| **exponent > 0)
        .map(|(atom, exponent)| factor(atom, *exponent))
        .reduce(|acc, factor| Expr::binary_op(BinaryOp::Mul, acc, factor));
    let denominator = monomial
        .iter()
        .filter(|(_, exponent)| **exponent < 0)
        .map(|(atom, exponent)| factor(atom, -exponent))
        .reduce(|acc, factor| Expr::binary_op(BinaryOp::Mul, acc, factor));

    let magnitude = coefficient.abs();

    let numerator = match numerator {
        None => Expr::Number(magnitude),
        Some(product) if (magnitude - 1.0).abs() < f64::EPSILON => product,
        Some(product) => Expr::binary_op(BinaryOp::Mul, Expr::Number(magnitude), product),
    };

    let expr = match denominator {
        Some(denominator) => Expr::binary_op(BinaryOp::Div, numerator, denominator),
        None => numerator,
    };

    (coefficient < 0.0, expr)
}

/// Returns `value` as an integer exponent when it is one and small enough to
/// expand.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is integral and within the expansion range"
)]
fn small_integer(value: f64) -> Option<i32> {
    let is_integral = value.fract().abs() < f64::EPSILON;
    let in_range = value.abs() <= f64::from(MAX_EXPANDED_POWER);
    (is_integral && in_range).then_some(value as i32)
}

/// Converts a numeric expression to canonical form.
///
/// Returns `None` for boolean expressions.
pub fn to_polynomial(expr: &Expr) -> Option<Polynomial> {
    match expr {
        Expr::Number(value) => Some(Polynomial::constant(*value)),
        Expr::Boolean(_)
        | Expr::ComparisonOp { .. }
        | Expr::UnaryOp {
            op: UnaryOp::Not, ..
        }
        | Expr::BinaryOp {
            op: BinaryOp::And | BinaryOp::Or,
            ..
        } => None,
        Expr::Symbol(name) => Some(Polynomial::atom(Atom::symbol(name))),
        Expr::UnaryOp {
            op: UnaryOp::Neg,
            expr,
        } => to_polynomial(expr).map(|p| p.scale(-1.0)),
        Expr::BinaryOp { op, left, right } => {
            let left = to_polynomial(left)?;
            let right = to_polynomial(right)?;
            match op {
                BinaryOp::Add => Some(left.add(&right)),
                BinaryOp::Sub => Some(left.sub(&right)),
                BinaryOp::Mul => Some(left.mul(&right)),
                BinaryOp::Div => Some(left.mul(&reciprocal(&right))),
                BinaryOp::Pow => Some(power(&left, &right)),
                BinaryOp::And | BinaryOp::Or => None,
            }
        }
        Expr::FunctionCall { name, args } => Some(function_atom(name, args)),
    }
}

fn reciprocal(denominator: &Polynomial) -> Polynomial {
    match denominator.invert_term() {
        Some(inverted) => inverted,
        None => denominator.as_atom_power(-1),
    }
}

fn power(base: &Polynomial, exponent: &Polynomial) -> Polynomial {
    match (base.as_constant(), exponent.as_constant()) {
        (Some(base), Some(exponent)) if base.powf(exponent).is_finite() => {
            Polynomial::constant(base.powf(exponent))
        }
        (_, Some(exponent)) => match small_integer(exponent) {
            Some(0) => Polynomial::constant(1.0),
            Some(n) if n > 0 => base.pow(n.unsigned_abs()),
            Some(n) => match base.invert_term() {
                Some(inverted) => inverted.pow(n.unsigned_abs()),
                None => base.as_atom_power(n),
            },
            None => {
                let key = format!("({})^({})", base.key(), Polynomial::constant(exponent).key());
                let expr = Expr::binary_op(BinaryOp::Pow, base.to_expr(), Expr::Number(exponent));
                Polynomial::atom(Atom::opaque(key, expr))
            }
        },
        (_, None) => {
            let key = format!("({})^({})", base.key(), exponent.key());
            let expr = Expr::binary_op(BinaryOp::Pow, base.to_expr(), exponent.to_expr());
            Polynomial::atom(Atom::opaque(key, expr))
        }
    }
}

fn function_atom(name: &str, args: &[Expr]) -> Polynomial {
    let canonical_args: Vec<_> = args
        .iter()
        .map(|arg| match to_polynomial(arg) {
            Some(polynomial) => (polynomial.key(), Some(polynomial)),
            None => (simplify(arg).to_string(), None),
        })
        .collect();

    let constant_args: Option<Vec<f64>> = canonical_args
        .iter()
        .map(|(_, polynomial)| polynomial.as_ref().and_then(Polynomial::as_constant))
        .collect();

    if let Some(value) = constant_args.and_then(|values| eval::call_builtin(name, &values))
        && value.is_finite()
    {
        return Polynomial::constant(value);
    }

    let key = format!(
        "{name}({})",
        canonical_args
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    let expr = Expr::function_call(
        name,
        canonical_args
            .iter()
            .zip(args)
            .map(|((_, polynomial), arg)| match polynomial {
                Some(polynomial) => polynomial.to_expr(),
                None => simplify(arg),
            })
            .collect(),
    );

    Polynomial::atom(Atom::opaque(key, expr))
}

/// Returns the canonical form of `expr`.
pub fn simplify(expr: &Expr) -> Expr {
    if let Some(polynomial) = to_polynomial(expr) {
        return polynomial.to_expr();
    }

    match expr {
        Expr::UnaryOp { op, expr } => Expr::unary_op(*op, simplify(expr)),
        Expr::BinaryOp { op, left, right } => Expr::binary_op(*op, simplify(left), simplify(right)),
        Expr::ComparisonOp { op, left, right } => {
            Expr::comparison_op(*op, simplify(left), simplify(right))
        }
        Expr::Number(_) | Expr::Boolean(_) | Expr::Symbol(_) | Expr::FunctionCall { .. } => {
            expr.clone()
        }
    }
}

/// Returns `expr` in canonical form with every comparison rewritten as
/// `p <op> 0`, where `p` has a leading coefficient of one.
pub fn normalise(expr: &Expr) -> Expr {
    match expr {
        Expr::ComparisonOp { op, left, right } => {
            let (Some(left), Some(right)) = (to_polynomial(left), to_polynomial(right)) else {
                return simplify(expr);
            };
            let difference = left.sub(&right);
            let (op, difference) = match difference.leading_coefficient() {
                Some(leading) if leading < 0.0 => (flip(*op), difference.scale(1.0 / leading)),
                Some(leading) => (*op, difference.scale(1.0 / leading)),
                None => (*op, difference),
            };
            Expr::comparison_op(op, difference.to_expr(), Expr::Number(0.0))
        }
        Expr::UnaryOp {
            op: UnaryOp::Not,
            expr: inner,
        } => Expr::unary_op(UnaryOp::Not, normalise(inner)),
        Expr::BinaryOp {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            left,
            right,
        } => Expr::binary_op(*op, normalise(left), normalise(right)),
        Expr::Number(_)
        | Expr::Boolean(_)
        | Expr::Symbol(_)
        | Expr::UnaryOp { .. }
        | Expr::BinaryOp { .. }
        | Expr::FunctionCall { .. } => simplify(expr),
    }
}

/// Returns the comparison that holds after negating both sides.
const fn flip(op: ComparisonOp) -> ComparisonOp {
    match op {
        ComparisonOp::LessThan => ComparisonOp::GreaterThan,
        ComparisonOp::LessThanEq => ComparisonOp::GreaterThanEq,
        ComparisonOp::GreaterThan => ComparisonOp::LessThan,
        ComparisonOp::GreaterThanEq => ComparisonOp::LessThanEq,
        ComparisonOp::Eq => ComparisonOp::Eq,
        ComparisonOp::NotEq => ComparisonOp::NotEq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalent;

    fn parse(source: &str) -> Expr {
        Expr::parse(source).expect("expression should parse")
    }

    fn simplified(source: &str) -> String {
        simplify(&parse(source)).to_string()
    }

    #[test]
    fn collects_like_terms() {
        assert_eq!(simplified("x + x"), "2 * x");
        assert_eq!(simplified("a - a"), "0");
        assert_eq!(simplified("3 * y - y + 1"), "2 * y + 1");
    }

    #[test]
    fn expands_products() {
        assert!(equivalent(&parse("(a + b)^2"), &parse("a^2 + 2*a*b + b^2")));
        assert!(equivalent(&parse("(a + b) * (a - b)"), &parse("a*a - b*b")));
    }

    #[test]
    fn folds_constants() {
        assert_eq!(simplified("2 * 3 + 4"), "10");
        assert_eq!(simplified("exp(0) * x"), "x");
        assert_eq!(simplified("0.1 + 0.2 - 0.3"), "0");
    }

    #[test]
    fn division_by_term_and_sum() {
        assert!(equivalent(&parse("x / 2"), &parse("0.5 * x")));
        assert!(equivalent(&parse("a * b / b"), &parse("a")));
        assert!(equivalent(&parse("x / (a + b) + y / (b + a)"), &parse("(x + y) / (a + b)")));
    }

    #[test]
    fn opaque_functions_compare_by_canonical_arguments() {
        assert!(equivalent(&parse("exp(V + V)"), &parse("exp(2 * V)")));
        assert!(!equivalent(&parse("exp(V)"), &parse("exp(2 * V)")));
    }

    #[test]
    fn negative_terms_render_with_subtraction() {
        assert_eq!(simplified("a - 2*b"), "a - 2 * b");
        assert_eq!(simplified("-a"), "-a");
    }

    #[test]
    fn boolean_structure_is_kept() {
        assert_eq!(simplified("x + x > 1 && y"), "2 * x > 1 && y");
    }

    #[test]
    fn comparisons_are_normalised() {
        let normalised = |source: &str| normalise(&parse(source)).to_string();

        assert_eq!(normalised("V > th"), normalised("th < V"));
        assert_eq!(normalised("2 * V >= 2 * th"), normalised("th <= V"));
        assert_eq!(
            normalised("!(x == 1) && t > t_next"),
            normalised("!(1 == x) && t_next < t")
        );
        assert_ne!(normalised("V > th"), normalised("V < th"));
    }
}
