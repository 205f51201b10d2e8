//! Prefix bindings for XPath evaluation
//!
//! XPath name tests resolve their prefixes here, never against the
//! declarations in the document. `xml` is always bound.

use std::collections::HashMap;

use crate::dom::namespace::ns;

/// Prefix → namespace URI table passed to every evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: HashMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix, replacing any earlier binding
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Resolve a prefix to its URI
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match self.bindings.get(prefix) {
            Some(uri) => Some(uri),
            None if prefix == "xml" => Some(ns::XML),
            None => None,
        }
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.resolve(prefix).is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceContext {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        let mut ctx = NamespaceContext::new();
        for (prefix, uri) in iter {
            ctx.insert(prefix, uri);
        }
        ctx
    }
}
