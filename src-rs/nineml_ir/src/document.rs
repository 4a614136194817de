//! Documents: named collections of shared component instances.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use nineml_shared::error::{AsNineMLError, Context};

use crate::Dynamics;

/// A reference to a component by name, optionally in another document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    name: String,
    url: Option<String>,
}

impl Reference {
    /// Creates a reference to `name` in the current document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    /// Creates a reference to `name` in the document at `url`.
    #[must_use]
    pub fn with_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
        }
    }

    /// Returns the referenced name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the document URL, if the reference is not local.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{url}#{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An error from looking up or adding to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Nothing in the document has the referenced name.
    NotFound(Reference),
    /// The reference points at a document that is not available.
    UnknownDocument(Reference),
    /// The document already holds an element with this name.
    Duplicate(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(reference) => write!(f, "could not find '{reference}'"),
            Self::UnknownDocument(reference) => {
                write!(f, "the document of '{reference}' is not loaded")
            }
            Self::Duplicate(name) => write!(f, "the document already contains '{name}'"),
        }
    }
}

impl std::error::Error for DocumentError {}

impl AsNineMLError for DocumentError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Vec<Context> {
        match self {
            Self::UnknownDocument(_) => vec![Context::Help(
                "add the document to the resolution context".to_string(),
            )],
            Self::NotFound(_) | Self::Duplicate(_) => vec![],
        }
    }
}

/// Resolves references to shared component instances.
pub trait DocumentContext {
    /// Returns the component `reference` points to.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] if the reference cannot be resolved.
    fn resolve(&self, reference: &Reference) -> Result<Rc<Dynamics>, DocumentError>;
}

/// A collection of named components, optionally identified by a URL.
///
/// Components are stored behind [`Rc`] so that every reference to the same
/// name resolves to the same instance.
#[derive(Debug, Clone, Default)]
pub struct Document {
    url: Option<String>,
    elements: IndexMap<String, Rc<Dynamics>>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            elements: IndexMap::new(),
        }
    }

    /// Returns the document URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Adds a component, returning the shared instance.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Duplicate`] if the name is taken.
    pub fn add(&mut self, dynamics: Dynamics) -> Result<Rc<Dynamics>, DocumentError> {
        let name = dynamics.name().to_string();
        if self.elements.contains_key(&name) {
            return Err(DocumentError::Duplicate(name));
        }

        let shared = Rc::new(dynamics.with_document_url(self.url.clone()));
        self.elements.insert(name, Rc::clone(&shared));
        Ok(shared)
    }

    /// Returns the component called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<Dynamics>> {
        self.elements.get(name)
    }

    /// Returns every component in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Rc<Dynamics>> {
        self.elements.values()
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns whether the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn holds(&self, reference: &Reference) -> bool {
        reference.url().is_none() || reference.url() == self.url()
    }
}

impl DocumentContext for Document {
    fn resolve(&self, reference: &Reference) -> Result<Rc<Dynamics>, DocumentError> {
        if !self.holds(reference) {
            return Err(DocumentError::UnknownDocument(reference.clone()));
        }

        self.elements
            .get(reference.name())
            .map(Rc::clone)
            .ok_or_else(|| DocumentError::NotFound(reference.clone()))
    }
}

/// Several documents searched in order; local references resolve against
/// the first document.
impl DocumentContext for [Document] {
    fn resolve(&self, reference: &Reference) -> Result<Rc<Dynamics>, DocumentError> {
        let document = match reference.url() {
            None => self.first(),
            Some(_) => self.iter().find(|document| document.holds(reference)),
        };

        document
            .ok_or_else(|| DocumentError::UnknownDocument(reference.clone()))?
            .resolve(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> Dynamics {
        Dynamics::builder(name)
            .build()
            .expect("empty component should be valid")
    }

    #[test]
    fn references_share_one_instance() {
        let mut document = Document::new(Some("cells.xml".to_string()));
        let added = document.add(component("Cell")).expect("name should be free");

        let local = document
            .resolve(&Reference::new("Cell"))
            .expect("reference should resolve");
        let remote = document
            .resolve(&Reference::with_url("Cell", "cells.xml"))
            .expect("reference should resolve");

        assert!(Rc::ptr_eq(&added, &local));
        assert!(Rc::ptr_eq(&local, &remote));
        assert_eq!(local.document_url(), Some("cells.xml"));
    }

    #[test]
    fn lookup_failures() {
        let mut document = Document::new(None);
        document.add(component("Cell")).expect("name should be free");

        assert_eq!(
            document.add(component("Cell")),
            Err(DocumentError::Duplicate("Cell".to_string()))
        );
        assert_eq!(
            document.resolve(&Reference::new("Synapse")),
            Err(DocumentError::NotFound(Reference::new("Synapse")))
        );
        assert!(matches!(
            document.resolve(&Reference::with_url("Cell", "other.xml")),
            Err(DocumentError::UnknownDocument(_))
        ));
    }

    #[test]
    fn search_several_documents() {
        let mut cells = Document::new(Some("cells.xml".to_string()));
        cells.add(component("Cell")).expect("name should be free");
        let mut synapses = Document::new(Some("synapses.xml".to_string()));
        synapses.add(component("Synapse")).expect("name should be free");

        let documents = [cells, synapses];
        let synapse = documents[..]
            .resolve(&Reference::with_url("Synapse", "synapses.xml"))
            .expect("reference should resolve");
        assert_eq!(synapse.name(), "Synapse");
        assert!(documents[..].resolve(&Reference::new("Synapse")).is_err());
    }
}
