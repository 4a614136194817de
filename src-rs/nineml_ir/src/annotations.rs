//! Free-form annotations attached to components and regimes.

use indexmap::IndexMap;

/// Key/value annotations grouped by namespace.
///
/// Annotations carry tool-specific metadata. They take no part in the
/// dynamics and are ignored by equality checks unless their namespace is
/// explicitly opted in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations {
    namespaces: IndexMap<String, IndexMap<String, String>>,
}

impl Annotations {
    /// Creates an empty set of annotations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value` within `namespace`, returning the previous value.
    pub fn set(
        &mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .insert(key.into(), value.into())
    }

    /// Returns the value of `key` within `namespace`.
    #[must_use]
    pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
        self.namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Returns the entries of one namespace.
    #[must_use]
    pub fn namespace(&self, namespace: &str) -> Option<&IndexMap<String, String>> {
        self.namespaces.get(namespace)
    }

    /// Returns the namespaces in insertion order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Returns whether there are no annotations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(IndexMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut annotations = Annotations::new();
        assert!(annotations.is_empty());

        assert_eq!(annotations.set("sim", "solver", "rk4"), None);
        assert_eq!(
            annotations.set("sim", "solver", "euler"),
            Some("rk4".to_string())
        );

        assert_eq!(annotations.get("sim", "solver"), Some("euler"));
        assert_eq!(annotations.get("other", "solver"), None);
        assert_eq!(annotations.namespaces().collect::<Vec<_>>(), ["sim"]);
    }
}
