//! DOM Module - Arena-based XML Document
//!
//! Implements a mutable DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and character data
//! - Namespace resolution stack at parse time
//! - Iterative serialization back to markup

pub mod document;
pub mod namespace;
pub mod node;
pub mod serialize;
pub mod strings;

pub use document::XmlDocument;
pub use node::{NodeId, NodeKind, XmlNode};
pub use serialize::to_xml;
pub use strings::StringPool;

/// Read access to a document, the seam the XPath engine is written against
pub trait DocumentAccess {
    /// The document node always has id 0
    fn document_node_id(&self) -> NodeId {
        0
    }

    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get the string pool for direct access
    fn strings(&self) -> &StringPool;

    /// Children in order, collected for trait object compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Descendants in document order, collected for trait object compatibility
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;

    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Parent node; for an attribute this is its owner element
    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.next_sibling)
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.prev_sibling)
    }

    /// Qualified name; empty for nodes without one
    fn node_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| self.strings().get(n.name_id))
    }

    /// Get node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| self.strings().get(n.local_id))
    }

    /// Namespace URI, None when the node is in no namespace
    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|n| n.namespace_id != 0)
            .map(|n| self.strings().get(n.namespace_id))
    }

    /// Attribute value, character data, comment text or PI data
    fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| self.strings().get(n.value_id))
    }

    /// Attribute nodes of an element, namespace declarations excluded
    fn attribute_nodes(&self, id: NodeId) -> Vec<NodeId> {
        match self.get_node(id) {
            Some(node) if node.is_element() => node
                .attribute_range()
                .filter(|&a| {
                    self.get_node(a)
                        .is_some_and(|attr| !document::is_namespace_declaration(self, attr))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Attribute value by namespace URI and local name
    fn get_attribute_ns(&self, id: NodeId, namespace_uri: &str, local_name: &str) -> Option<&str> {
        let node = self.get_node(id)?;
        node.attribute_range().find_map(|a| {
            let attr = self.get_node(a)?;
            let strings = self.strings();
            (strings.get(attr.namespace_id) == namespace_uri
                && strings.get(attr.local_id) == local_name)
                .then(|| strings.get(attr.value_id))
        })
    }

    /// Attribute value by qualified name as written
    fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let node = self.get_node(id)?;
        node.attribute_range().find_map(|a| {
            let attr = self.get_node(a)?;
            (self.strings().get(attr.name_id) == name).then(|| self.strings().get(attr.value_id))
        })
    }
}

/// XPath string-value of a node
///
/// Elements and the document node concatenate all descendant text and CDATA;
/// every other kind yields its own value.
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind(id) {
        Some(NodeKind::Element) | Some(NodeKind::Document) => {
            let mut out = String::new();
            for d in doc.descendants_vec(id) {
                if doc.get_node(d).is_some_and(|n| n.is_character_data()) {
                    out.push_str(doc.node_value(d).unwrap_or(""));
                }
            }
            out
        }
        Some(_) => doc.node_value(id).unwrap_or("").to_string(),
        None => String::new(),
    }
}
