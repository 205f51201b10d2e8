//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes, attributes included
//! - NodeId indices for traversal; ids follow document order
//! - String interning for names, URIs and character data
//! - In-place detach that unlinks a subtree without freeing it

use super::namespace::{ns, NamespaceResolver};
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::core::attributes::split_name;
use crate::core::encoding::decode_document;
use crate::core::entities::find_invalid_char;
use crate::error::ParseError;
use crate::reader::events::{StartElement, XmlDeclaration, XmlEvent};
use crate::reader::slice::SliceReader;

/// A parsed, mutable XML document
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    strings: StringPool,
    root_element: Option<NodeId>,
    declaration: Option<XmlDeclaration>,
}

impl XmlDocument {
    /// Parse raw bytes, detecting the encoding first
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let text = decode_document(input)?;
        Self::parse_str(&text)
    }

    /// Parse text that is already UTF-8
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        if let Some((position, c)) = find_invalid_char(input) {
            return Err(ParseError::new(
                format!("Invalid XML character U+{:04X}", c as u32),
                position,
            ));
        }

        let mut doc = XmlDocument {
            nodes: Vec::with_capacity(input.len() / 16 + 1),
            strings: StringPool::new(),
            root_element: None,
            declaration: None,
        };
        doc.nodes.push(XmlNode::document());
        doc.build(input)?;
        Ok(doc)
    }

    /// Build DOM from XML events
    fn build(&mut self, input: &str) -> Result<(), ParseError> {
        let mut reader = SliceReader::new(input);
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(event) = reader.next_event()? {
            let parent = *stack.last().unwrap_or(&0);
            match event {
                XmlEvent::StartElement(elem) => {
                    let id = self
                        .add_element(&elem, parent, &mut resolver)
                        .map_err(|m| ParseError::new(m, reader.event_start()))?;
                    stack.push(id);
                }
                XmlEvent::EmptyElement(elem) => {
                    self.add_element(&elem, parent, &mut resolver)
                        .map_err(|m| ParseError::new(m, reader.event_start()))?;
                    resolver.pop_scope();
                }
                XmlEvent::EndElement(_) => {
                    stack.pop();
                    resolver.pop_scope();
                }
                XmlEvent::Text(text) => {
                    self.add_leaf(NodeKind::Text, parent, "", &text);
                }
                XmlEvent::CData(text) => {
                    self.add_leaf(NodeKind::CData, parent, "", text);
                }
                XmlEvent::Comment(text) => {
                    self.add_leaf(NodeKind::Comment, parent, "", text);
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    self.add_leaf(NodeKind::ProcessingInstruction, parent, target, data);
                }
                XmlEvent::DocType(body) => {
                    self.add_leaf(NodeKind::DocumentType, parent, "", body);
                }
                XmlEvent::XmlDeclaration(decl) => {
                    self.declaration = Some(decl);
                }
            }
        }

        Ok(())
    }

    /// Handle start/empty element: declarations first, then names, then attributes
    fn add_element(
        &mut self,
        elem: &StartElement<'_>,
        parent: NodeId,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, String> {
        resolver.push_scope();
        for attr in elem.attributes.iter().filter(|a| a.is_namespace_declaration()) {
            let uri_id = self.strings.intern(&attr.value);
            if attr.prefix().is_some() {
                let prefix_id = self.strings.intern(attr.local_name());
                resolver.declare(prefix_id, uri_id)?;
            } else {
                resolver.declare_default(uri_id);
            }
        }

        let (prefix, local) = split_name(elem.name);
        let mut node = XmlNode::new(NodeKind::Element, Some(parent));
        node.name_id = self.strings.intern(elem.name);
        node.local_id = self.strings.intern(local);
        node.namespace_id = match prefix {
            Some(p) => {
                node.prefix_id = self.strings.intern(p);
                resolver
                    .resolve(node.prefix_id)
                    .ok_or_else(|| format!("Namespace prefix '{}' is not declared", p))?
            }
            None => resolver.resolve_default(),
        };

        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);

        let attr_start = self.nodes.len() as NodeId;
        for attr in &elem.attributes {
            let mut attr_node = XmlNode::new(NodeKind::Attribute, Some(id));
            attr_node.name_id = self.strings.intern(attr.name);
            attr_node.local_id = self.strings.intern(attr.local_name());
            attr_node.value_id = self.strings.intern(&attr.value);
            if attr.is_namespace_declaration() {
                attr_node.namespace_id = resolver.xmlns_uri_id();
            } else if let Some(p) = attr.prefix() {
                attr_node.prefix_id = self.strings.intern(p);
                attr_node.namespace_id = resolver
                    .resolve(attr_node.prefix_id)
                    .ok_or_else(|| format!("Namespace prefix '{}' is not declared", p))?;
            }
            self.nodes.push(attr_node);
        }
        let attr_end = self.nodes.len() as NodeId;
        self.check_expanded_names(attr_start, attr_end)?;

        let element = &mut self.nodes[id as usize];
        element.attr_start = attr_start;
        element.attr_count = attr_end - attr_start;

        if parent == 0 {
            self.root_element = Some(id);
        }
        Ok(id)
    }

    /// `a:x` and `b:x` collide when both prefixes name the same URI
    fn check_expanded_names(&self, start: NodeId, end: NodeId) -> Result<(), String> {
        let attrs = &self.nodes[start as usize..end as usize];
        for (i, a) in attrs.iter().enumerate() {
            if a.namespace_id == 0 {
                continue;
            }
            let clash = attrs[i + 1..]
                .iter()
                .any(|b| b.namespace_id == a.namespace_id && b.local_id == a.local_id);
            if clash {
                return Err(format!(
                    "Duplicate attribute '{}' after namespace resolution",
                    self.strings.get(a.name_id)
                ));
            }
        }
        Ok(())
    }

    fn add_leaf(&mut self, kind: NodeKind, parent: NodeId, name: &str, value: &str) -> NodeId {
        let mut node = XmlNode::new(kind, Some(parent));
        node.name_id = self.strings.intern(name);
        node.local_id = node.name_id;
        node.value_id = self.strings.intern(value);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child = self.nodes[parent_id as usize].last_child;

        if let Some(last_id) = last_child {
            self.nodes[child_id as usize].prev_sibling = Some(last_id);
            self.nodes[last_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Unlink a node from its parent's child list.
    ///
    /// Returns false for the document node, attributes, unknown ids and
    /// nodes that are already detached. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let (parent, prev, next) = match self.nodes.get(id as usize) {
            Some(node) if !matches!(node.kind, NodeKind::Document | NodeKind::Attribute) => {
                match node.parent {
                    Some(parent) => (parent, node.prev_sibling, node.next_sibling),
                    None => return false,
                }
            }
            _ => return false,
        };

        match prev {
            Some(p) => self.nodes[p as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(n) => self.nodes[n as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;

        if self.root_element == Some(id) {
            self.root_element = None;
        }
        true
    }

    /// True if the parent chain of `id` reaches the document node
    #[cfg(test)]
    pub(crate) fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == 0 {
                return true;
            }
            current = self.nodes.get(cur as usize).and_then(|n| n.parent);
        }
        false
    }

    /// The `<?xml ...?>` declaration the document started with, if any
    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<XmlDeclaration>) {
        self.declaration = declaration;
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Total nodes in the arena, detached ones included
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl DocumentAccess for XmlDocument {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn strings(&self) -> &StringPool {
        &self.strings
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, pre-order)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }

        Some(current)
    }
}

/// True for `xmlns` / `xmlns:*` attribute nodes
pub(crate) fn is_namespace_declaration<D: DocumentAccess + ?Sized>(doc: &D, node: &XmlNode) -> bool {
    node.kind == NodeKind::Attribute && doc.strings().get(node.namespace_id) == ns::XMLNS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let doc = XmlDocument::parse(b"<root>hello</root>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.children(root).count(), 1);
    }

    #[test]
    fn test_parse_nested() {
        let doc = XmlDocument::parse(b"<a><b><c/></b></a>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.descendants(root).count(), 2);
    }

    #[test]
    fn test_siblings() {
        let doc = XmlDocument::parse(b"<root><a/><b/><c/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 3);

        let first = doc.get_node(children[0]).unwrap();
        assert!(first.prev_sibling.is_none());
        assert_eq!(first.next_sibling, Some(children[1]));
    }

    #[test]
    fn test_ids_follow_document_order() {
        let doc = XmlDocument::parse(b"<r a='1'><x b='2'><y/></x><z/></r>").unwrap();
        let all: Vec<_> = doc.descendants(0).collect();
        let mut sorted = all.clone();
        sorted.sort_unstable();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_default_namespace_resolution() {
        let doc = XmlDocument::parse(br#"<feed xmlns="urn:a"><entry id="1"/></feed>"#).unwrap();
        let root = doc.root_element_id().unwrap();
        let entry = doc.children(root).next().unwrap();
        assert_eq!(doc.node_namespace_uri(entry), Some("urn:a"));
        let id_attr = doc.attribute_nodes(entry)[0];
        assert_eq!(doc.node_namespace_uri(id_attr), None);
    }

    #[test]
    fn test_prefixed_names() {
        let doc = XmlDocument::parse(
            br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:li rdf:resource="r"/></rdf:RDF>"#,
        )
        .unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_local_name(root), Some("RDF"));
        let li = doc.children(root).next().unwrap();
        assert_eq!(
            doc.get_attribute_ns(li, "http://www.w3.org/1999/02/22-rdf-syntax-ns#", "resource"),
            Some("r")
        );
    }

    #[test]
    fn test_undeclared_prefix_is_parse_error() {
        let err = XmlDocument::parse(b"<a><dc:creator>x</dc:creator></a>").unwrap_err();
        assert!(err.message.contains("'dc'"));
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_duplicate_expanded_attribute() {
        let input = br#"<a xmlns:p="urn:x" xmlns:q="urn:x" p:id="1" q:id="2"/>"#;
        assert!(XmlDocument::parse(input).is_err());
    }

    #[test]
    fn test_namespace_declarations_hidden_from_attribute_nodes() {
        let doc = XmlDocument::parse(br#"<a xmlns="urn:a" xmlns:x="urn:x" id="1"/>"#).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_node(root).unwrap().attr_count, 3);
        assert_eq!(doc.attribute_nodes(root).len(), 1);
    }

    #[test]
    fn test_detach_middle_child() {
        let mut doc = XmlDocument::parse(b"<r><a/><b/><c/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();

        assert!(doc.detach(children[1]));
        let remaining: Vec<_> = doc.children(root).collect();
        assert_eq!(remaining, vec![children[0], children[2]]);
        assert_eq!(doc.get_node(children[0]).unwrap().next_sibling, Some(children[2]));
        assert_eq!(doc.get_node(children[2]).unwrap().prev_sibling, Some(children[0]));
        assert!(!doc.is_attached(children[1]));
        assert!(!doc.detach(children[1]));
    }

    #[test]
    fn test_detach_first_and_last() {
        let mut doc = XmlDocument::parse(b"<r><a/><b/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();

        assert!(doc.detach(children[0]));
        assert!(doc.detach(children[1]));
        let node = doc.get_node(root).unwrap();
        assert!(node.first_child.is_none());
        assert!(node.last_child.is_none());
    }

    #[test]
    fn test_detach_refuses_document_and_attributes() {
        let mut doc = XmlDocument::parse(b"<r id='1'/>").unwrap();
        let root = doc.root_element_id().unwrap();
        let attr = doc.get_node(root).unwrap().attr_start;
        assert!(!doc.detach(0));
        assert!(!doc.detach(attr));
        assert!(!doc.detach(9999));
    }

    #[test]
    fn test_declaration_kept() {
        let doc = XmlDocument::parse(br#"<?xml version="1.0" encoding="utf-8"?><r/>"#).unwrap();
        assert_eq!(doc.declaration().unwrap().encoding.as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_invalid_control_character() {
        let err = XmlDocument::parse(b"<r>\x01</r>").unwrap_err();
        assert_eq!(err.position, 3);
    }
}
