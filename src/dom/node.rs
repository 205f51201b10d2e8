//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Attributes
//! live in the same arena as every other node: they point at their owner
//! element through `parent` but never appear in its child list.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    Element,
    Attribute,
    Text,
    /// CDATA section
    CData,
    Comment,
    ProcessingInstruction,
    /// `<!DOCTYPE ...>`, kept only so it can be written back out
    DocumentType,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node: None for the document node and for detached nodes
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements, attributes) or target (PIs)
    pub name_id: u32,
    /// Local part of the qualified name
    pub local_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Resolved namespace URI, or 0 for no namespace
    pub namespace_id: u32,
    /// Attribute value, character data, comment text or PI data
    pub value_id: u32,
    /// First attribute node (elements only)
    pub attr_start: NodeId,
    pub attr_count: u32,
}

impl XmlNode {
    /// Create a node of the given kind with no links and empty strings
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        XmlNode::new(NodeKind::Document, None)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    #[inline]
    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }

    /// Text or CDATA
    #[inline]
    pub fn is_character_data(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }

    /// Arena ids of this element's attribute nodes, declarations included
    #[inline]
    pub fn attribute_range(&self) -> std::ops::Range<NodeId> {
        self.attr_start..self.attr_start + self.attr_count
    }
}
