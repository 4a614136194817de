//! Composite regimes: one per combination of sub-component regimes.

use indexmap::IndexMap;
use nineml_ir::{Alias, Regime, TimeDerivative};
pub use nineml_ir::validate::MULTI_REGIME_SEPARATOR;

use crate::{MultiDynamicsError, SubDynamics, namespace::Namespaced};

/// The largest number of composite regimes a composite may have.
pub const MAX_MULTI_REGIMES: usize = 4096;

/// Returns the name of the composite regime made of the qualified regime
/// names `names`, in sub-component order.
#[must_use]
pub fn multi_regime_name<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(MULTI_REGIME_SEPARATOR)
}

/// The constituents of a composite regime: `(sub-component, local regime)`
/// pairs in sub-component order.
pub type RegimeTuple = Vec<(String, String)>;

/// Computes every composite regime of `sub_components`, keyed by name.
///
/// Sub-components without regimes do not take part in the product.
///
/// # Errors
///
/// Returns [`MultiDynamicsError::TooManyRegimes`] if the product has more
/// than [`MAX_MULTI_REGIMES`] elements.
pub fn regime_product(
    composite: &str,
    sub_components: &IndexMap<String, SubDynamics>,
) -> Result<IndexMap<String, RegimeTuple>, MultiDynamicsError> {
    let factors: Vec<&SubDynamics> = sub_components
        .values()
        .filter(|sub| sub.component().num_regimes() > 0)
        .collect();

    let count = factors.iter().try_fold(1_usize, |count, sub| {
        count
            .checked_mul(sub.component().num_regimes())
            .filter(|count| *count <= MAX_MULTI_REGIMES)
    });
    if count.is_none() {
        return Err(MultiDynamicsError::TooManyRegimes {
            composite: composite.to_string(),
            limit: MAX_MULTI_REGIMES,
        });
    }

    let mut tuples: Vec<RegimeTuple> = vec![Vec::new()];
    for sub in factors {
        tuples = tuples
            .into_iter()
            .flat_map(|prefix| {
                sub.component().regimes().keys().map(move |regime| {
                    let mut tuple = prefix.clone();
                    tuple.push((sub.name().to_string(), regime.clone()));
                    tuple
                })
            })
            .collect();
    }

    Ok(tuples
        .into_iter()
        .filter(|tuple| !tuple.is_empty())
        .map(|tuple| (tuple_name(sub_components, &tuple), tuple))
        .collect())
}

/// Returns the composite regime name of `tuple`.
#[must_use]
pub fn tuple_name(
    sub_components: &IndexMap<String, SubDynamics>,
    tuple: &[(String, String)],
) -> String {
    let names: Vec<String> = tuple
        .iter()
        .map(|(sub, regime)| match sub_components.get(sub) {
            Some(sub) => sub.append_namespace(regime),
            None => regime.clone(),
        })
        .collect();
    multi_regime_name(&names)
}

/// A view of one composite regime.
///
/// The regime aggregates the time derivatives and aliases of its
/// constituents without merging them.
#[derive(Debug, Clone)]
pub struct MultiRegime<'a> {
    name: String,
    regimes: Vec<Namespaced<'a, Regime>>,
}

impl<'a> MultiRegime<'a> {
    /// Creates the view of `tuple`, whose name is `name`.
    ///
    /// Constituents whose sub-component or regime is unknown are skipped.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sub_components: &'a IndexMap<String, SubDynamics>,
        tuple: &'a [(String, String)],
    ) -> Self {
        let regimes = tuple
            .iter()
            .filter_map(|(sub, regime)| {
                let sub = sub_components.get(sub)?;
                let regime = sub.component().regimes().get(regime)?;
                Some(Namespaced::new(sub, regime))
            })
            .collect();
        Self {
            name: name.into(),
            regimes,
        }
    }

    /// Returns the composite regime name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the constituent regimes, in sub-component order.
    #[must_use]
    pub fn sub_regimes(&self) -> &[Namespaced<'a, Regime>] {
        &self.regimes
    }

    /// Returns the constituent regime of the sub-component `sub_component`.
    #[must_use]
    pub fn sub_regime(&self, sub_component: &str) -> Option<Namespaced<'a, Regime>> {
        self.regimes
            .iter()
            .find(|regime| regime.sub_component().name() == sub_component)
            .copied()
    }

    /// Returns the time derivatives of every constituent.
    pub fn time_derivatives(&self) -> impl Iterator<Item = Namespaced<'a, TimeDerivative>> + '_ {
        self.regimes.iter().flat_map(Namespaced::time_derivatives)
    }

    /// Returns the regime-local aliases of every constituent.
    pub fn aliases(&self) -> impl Iterator<Item = Namespaced<'a, Alias>> + '_ {
        self.regimes.iter().flat_map(Namespaced::aliases)
    }

    /// Returns the number of time derivatives.
    #[must_use]
    pub fn num_time_derivatives(&self) -> usize {
        self.regimes.iter().map(Namespaced::num_time_derivatives).sum()
    }

    /// Returns the number of regime-local aliases.
    #[must_use]
    pub fn num_aliases(&self) -> usize {
        self.regimes.iter().map(Namespaced::num_aliases).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use nineml_ir::fixtures;

    use super::*;

    fn sub_components() -> IndexMap<String, SubDynamics> {
        [
            ("cell", fixtures::leaky_integrate_and_fire()),
            ("chan", fixtures::three_state_channel()),
        ]
        .into_iter()
        .map(|(name, dynamics)| (name.to_string(), SubDynamics::new(name, Rc::new(dynamics))))
        .collect()
    }

    #[test]
    fn product_of_two_and_three() {
        let subs = sub_components();
        let regimes = regime_product("Both", &subs).expect("product should be small");

        assert_eq!(regimes.len(), 6);
        assert_eq!(
            regimes.keys().next().map(String::as_str),
            Some("subthreshold_cell___closed_chan")
        );

        for (name, tuple) in &regimes {
            let regime = MultiRegime::new(name.as_str(), &subs, tuple);
            let expected: usize = tuple
                .iter()
                .map(|(sub, local)| {
                    subs[sub.as_str()].component().regimes()[local.as_str()]
                        .time_derivatives()
                        .len()
                })
                .sum();
            assert_eq!(regime.num_time_derivatives(), expected);
            assert_eq!(regime.sub_regimes().len(), 2);
        }
    }

    #[test]
    fn regimeless_components_do_not_empty_the_product() {
        let mut subs = sub_components();
        let empty = nineml_ir::Dynamics::builder("Empty")
            .build()
            .expect("empty component should be valid");
        subs.insert("none".to_string(), SubDynamics::new("none", Rc::new(empty)));

        let regimes = regime_product("All", &subs).expect("product should be small");
        assert_eq!(regimes.len(), 6);
    }

    #[test]
    fn oversized_products_are_refused() {
        let subs: IndexMap<_, _> = (0..13)
            .map(|i| {
                let name = format!("c{i}");
                let sub = SubDynamics::new(&name, Rc::new(fixtures::leaky_integrate_and_fire()));
                (name, sub)
            })
            .collect();

        assert!(matches!(
            regime_product("Huge", &subs),
            Err(MultiDynamicsError::TooManyRegimes { limit: MAX_MULTI_REGIMES, .. })
        ));
    }
}
