//! Sub-components: named component instances inside a composite.

use std::rc::Rc;

use nineml_ir::{Alias, Constant, Dynamics, Parameter, Regime, StateVariable};

use crate::namespace::{Namespaced, QualifiedExprCache, is_qualifiable, qualify};

macro_rules! qualified_views {
    ($(#[$doc:meta])* $many:ident, $one:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $many(&self) -> impl Iterator<Item = Namespaced<'_, $ty>> {
            self.component
                .$many()
                .values()
                .map(move |element| Namespaced::new(self, element))
        }

        /// Returns the element with the qualified name `name`.
        #[must_use]
        pub fn $one(&self, name: &str) -> Option<Namespaced<'_, $ty>> {
            let local = self.strip_namespace(name)?;
            let element = self.component.$many().get(local)?;
            Some(Namespaced::new(self, element))
        }
    };
}

/// A component instance within a composite, addressed by a unique local
/// name that becomes the namespace of its elements.
#[derive(Debug, Clone)]
pub struct SubDynamics {
    name: String,
    component: Rc<Dynamics>,
    cache: QualifiedExprCache,
}

impl SubDynamics {
    /// Creates a sub-component called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, component: Rc<Dynamics>) -> Self {
        Self {
            name: name.into(),
            component,
            cache: QualifiedExprCache::new(),
        }
    }

    /// Returns the sub-component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the component.
    #[must_use]
    pub const fn component(&self) -> &Rc<Dynamics> {
        &self.component
    }

    /// Returns the cache of qualified right-hand sides.
    #[must_use]
    pub const fn cache(&self) -> &QualifiedExprCache {
        &self.cache
    }

    /// Qualifies a name of this sub-component.
    #[must_use]
    pub fn append_namespace(&self, name: &str) -> String {
        qualify(name, &self.name)
    }

    /// Returns the local name behind the qualified `name`, if `name` is in
    /// this sub-component's namespace.
    #[must_use]
    pub fn strip_namespace<'n>(&self, name: &'n str) -> Option<&'n str> {
        if !is_qualifiable(name) {
            return Some(name);
        }
        name.strip_suffix(self.name.as_str())?.strip_suffix('_')
    }

    qualified_views!(
        /// Returns the parameters, qualified.
        parameters, parameter, Parameter
    );
    qualified_views!(
        /// Returns the constants, qualified.
        constants, constant, Constant
    );
    qualified_views!(
        /// Returns the state variables, qualified.
        state_variables, state_variable, StateVariable
    );
    qualified_views!(
        /// Returns the top-level aliases, qualified.
        aliases, alias, Alias
    );
    qualified_views!(
        /// Returns the regimes, qualified.
        regimes, regime, Regime
    );
}

impl PartialEq for SubDynamics {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.component == other.component
    }
}

#[cfg(test)]
mod tests {
    use nineml_ir::fixtures;

    use super::*;

    #[test]
    fn namespace_round_trip() {
        let sub = SubDynamics::new("cell", Rc::new(fixtures::leaky_integrate_and_fire()));

        assert_eq!(sub.append_namespace("V"), "V_cell");
        assert_eq!(sub.strip_namespace("V_cell"), Some("V"));
        assert_eq!(sub.strip_namespace("V_syn"), None);
        assert_eq!(sub.strip_namespace("t"), Some("t"));

        let names: Vec<_> = sub.state_variables().map(|sv| sv.name()).collect();
        assert_eq!(names, ["V_cell", "t_rpend_cell"]);
        assert!(sub.regime("refractory_cell").is_some());
        assert!(sub.regime("refractory").is_none());
    }

    #[test]
    fn clones_start_with_an_empty_cache() {
        use nineml_ir::ExpressionElement;

        let sub = SubDynamics::new("syn", Rc::new(fixtures::exponential_synapse()));
        let alias = sub.alias("Isyn_syn").expect("alias should be visible");
        let _ = alias.rhs();
        assert_eq!(sub.cache().len(), 1);

        let copy = sub.clone();
        assert!(copy.cache().is_empty());
        assert_eq!(copy, sub);
    }
}
