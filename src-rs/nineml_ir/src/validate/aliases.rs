use indexmap::{IndexMap, IndexSet};

use crate::{Dynamics, expression::ExpressionElement};

use super::ValidationError;

/// Returns, for each alias in scope, the aliases its right-hand side refers
/// to.
///
/// Top-level aliases are always in scope; `regime_aliases` adds the aliases
/// of one regime, which shadow nothing (duplicates are reported elsewhere).
#[must_use]
pub fn alias_dependencies<'a>(
    dynamics: &'a Dynamics,
    regime_aliases: impl IntoIterator<Item = &'a crate::Alias>,
) -> IndexMap<String, IndexSet<String>> {
    let aliases: Vec<_> = dynamics
        .aliases()
        .values()
        .chain(regime_aliases)
        .collect();
    let names: IndexSet<&str> = aliases.iter().map(|alias| alias.name()).collect();

    aliases
        .iter()
        .map(|alias| {
            let dependencies = alias
                .rhs_symbols()
                .into_iter()
                .filter(|symbol| names.contains(symbol.as_str()))
                .collect();
            (alias.name().to_string(), dependencies)
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Finds the first cycle reachable from `start`, returned as the path from
/// the first repeated alias back to itself.
fn find_cycle(
    start: &str,
    dependencies: &IndexMap<String, IndexSet<String>>,
    marks: &mut IndexMap<String, Mark>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    match marks.get(start) {
        Some(Mark::Done) => return None,
        Some(Mark::InProgress) => {
            let begin = path.iter().position(|name| name == start)?;
            let mut cycle = path[begin..].to_vec();
            cycle.push(start.to_string());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(start.to_string(), Mark::InProgress);
    path.push(start.to_string());

    let next = dependencies.get(start).into_iter().flatten();
    for dependency in next {
        if let Some(cycle) = find_cycle(dependency, dependencies, marks, path) {
            return Some(cycle);
        }
    }

    path.pop();
    marks.insert(start.to_string(), Mark::Done);
    None
}

fn cycles(dependencies: &IndexMap<String, IndexSet<String>>) -> Vec<Vec<String>> {
    let mut marks = IndexMap::new();
    let mut found = Vec::new();

    for name in dependencies.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = find_cycle(name, dependencies, &mut marks, &mut path) {
            // the search stopped early, leaving its path in progress
            for alias in cycle.iter().chain(&path) {
                marks.insert(alias.clone(), Mark::Done);
            }
            found.push(cycle);
        }
    }

    found
}

/// Reports aliases that are defined, directly or through other aliases, in
/// terms of themselves.
///
/// Top-level aliases are checked on their own and together with the
/// aliases of each regime.
#[must_use]
pub fn check_recursive_aliases(dynamics: &Dynamics) -> Vec<ValidationError> {
    let mut reported: IndexSet<Vec<String>> = IndexSet::new();

    let top_level = alias_dependencies(dynamics, []);
    reported.extend(cycles(&top_level));

    for regime in dynamics.regimes().values() {
        if regime.aliases().is_empty() {
            continue;
        }
        let dependencies = alias_dependencies(dynamics, regime.aliases().values());
        reported.extend(cycles(&dependencies));
    }

    reported
        .into_iter()
        .map(|cycle| ValidationError::RecursiveAlias { cycle })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Regime;

    #[test]
    fn direct_and_indirect_recursion() {
        let dynamics = Dynamics::builder("Loops")
            .alias("a", "b + 1")
            .alias("b", "c * 2")
            .alias("c", "a")
            .alias("d", "d + 1")
            .alias("e", "a")
            .build_unvalidated()
            .expect("builder should accept the component");

        let errors = check_recursive_aliases(&dynamics);
        assert_eq!(
            errors,
            [
                ValidationError::RecursiveAlias {
                    cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()]
                },
                ValidationError::RecursiveAlias {
                    cycle: vec!["d".into(), "d".into()]
                },
            ]
        );
    }

    #[test]
    fn recursion_through_regime_alias() {
        let dynamics = Dynamics::builder("RegimeLoop")
            .alias("a", "k")
            .regime(Regime::builder("r").alias("k", "a * 2"))
            .build_unvalidated()
            .expect("builder should accept the component");

        assert_eq!(check_recursive_aliases(&dynamics).len(), 1);
    }

    #[test]
    fn chains_are_not_recursion() {
        let dynamics = Dynamics::builder("Chain")
            .alias("a", "b + c")
            .alias("b", "c")
            .alias("c", "1")
            .build_unvalidated()
            .expect("builder should accept the component");

        assert!(check_recursive_aliases(&dynamics).is_empty());
    }
}
