//! Namespace table for XPath evaluation, read off the root element

use crate::dom::document::is_namespace_declaration;
use crate::dom::{DocumentAccess, XmlDocument};
use crate::xpath::NamespaceContext;

/// Prefix used for the root element's unprefixed `xmlns` declaration
pub const DEFAULT_PREFIX: &str = "default";

/// Bind every `xmlns` / `xmlns:*` declaration on the root element.
///
/// Only the root is inspected. `xmlns="..."` is bound to [`DEFAULT_PREFIX`],
/// `xmlns:p="..."` to `p`, and a later declaration of the same prefix
/// replaces an earlier one.
pub fn resolve_namespaces(doc: &XmlDocument) -> NamespaceContext {
    let mut namespaces = NamespaceContext::new();
    let Some(root) = doc.root_element_id().and_then(|id| doc.get_node(id)) else {
        return namespaces;
    };

    for attr_id in root.attribute_range() {
        let Some(attr) = doc.get_node(attr_id) else {
            continue;
        };
        if !is_namespace_declaration(doc, attr) {
            continue;
        }
        let strings = doc.strings();
        let prefix = match strings.get(attr.name_id) {
            "xmlns" => DEFAULT_PREFIX,
            _ => strings.get(attr.local_id),
        };
        namespaces.insert(prefix, strings.get(attr.value_id));
    }

    tracing::trace!(bindings = namespaces.len(), "resolved root namespaces");
    namespaces
}
