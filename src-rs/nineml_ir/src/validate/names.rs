use indexmap::IndexMap;
use nineml_expr::is_reserved;

use crate::Dynamics;

use super::ValidationError;

/// Joins the regime names of the constituents of a composite regime, so it
/// may not appear in the name of any other element.
pub const MULTI_REGIME_SEPARATOR: &str = "___";

fn named<'a, V>(
    map: &'a IndexMap<String, V>,
    kind: &'static str,
) -> impl Iterator<Item = (&'a str, &'static str)> {
    map.keys().map(move |name| (name.as_str(), kind))
}

/// Names that right-hand sides can refer to, with the kind of each.
fn symbol_names(dynamics: &Dynamics) -> impl Iterator<Item = (&str, &'static str)> {
    named(dynamics.parameters(), "parameter")
        .chain(named(dynamics.constants(), "constant"))
        .chain(named(dynamics.state_variables(), "state variable"))
        .chain(named(dynamics.aliases(), "alias"))
        .chain(named(dynamics.analog_receive_ports(), "analog receive port"))
        .chain(named(dynamics.analog_reduce_ports(), "analog reduce port"))
}

/// Reports names shared between elements of different kinds.
///
/// Parameters, constants, state variables, aliases and analog receive or
/// reduce ports share one namespace. Port names are unique across every port
/// kind; an analog send port is expected to share its name with the alias or
/// state variable it publishes. Regime aliases may not shadow top-level
/// names.
#[must_use]
pub fn check_duplicate_names(dynamics: &Dynamics) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen: IndexMap<&str, &'static str> = IndexMap::new();
    for (name, kind) in symbol_names(dynamics) {
        if let Some(first) = seen.insert(name, kind) {
            errors.push(ValidationError::duplicate(name, first, kind));
        }
    }

    for (_, alias) in dynamics.regime_aliases() {
        if let Some(first) = seen.get(alias.name()) {
            errors.push(ValidationError::duplicate(alias.name(), *first, "regime alias"));
        }
    }

    let mut ports: IndexMap<&str, &'static str> = IndexMap::new();
    for port in dynamics.ports() {
        let kind = port.kind().description();
        if let Some(first) = ports.insert(port.name(), kind) {
            errors.push(ValidationError::duplicate(port.name(), first, kind));
        }
    }

    errors
}

fn element_names(dynamics: &Dynamics) -> impl Iterator<Item = (&str, &'static str)> {
    let regime_aliases = dynamics
        .regime_aliases()
        .map(|(_, alias)| (alias.name(), "regime alias"));
    let ports = dynamics
        .ports()
        .map(|port| (port.name(), port.kind().description()));

    symbol_names(dynamics).chain(regime_aliases).chain(ports)
}

/// Reports elements named after a reserved identifier, and elements other
/// than regimes whose name contains [`MULTI_REGIME_SEPARATOR`].
#[must_use]
pub fn check_reserved_names(dynamics: &Dynamics) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (name, kind) in element_names(dynamics) {
        if is_reserved(name) {
            errors.push(ValidationError::ReservedName {
                name: name.to_string(),
                kind,
            });
        } else if name.contains(MULTI_REGIME_SEPARATOR) {
            errors.push(ValidationError::SeparatorInName {
                name: name.to_string(),
                kind,
            });
        }
    }
    errors
}
