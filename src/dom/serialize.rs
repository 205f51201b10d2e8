//! Serialization back to markup
//!
//! Iterative, with an explicit stack, so deeply nested feeds cannot
//! overflow the call stack.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind};
use super::DocumentAccess;
use crate::core::entities::{escape_attribute, escape_text};

/// Serialize the whole document, declaration included
pub fn to_xml(doc: &XmlDocument) -> String {
    let mut buf = String::with_capacity(doc.node_count() * 32);
    if let Some(decl) = doc.declaration() {
        buf.push_str(&decl.to_markup());
    }
    write_node(doc, doc.document_node_id(), &mut buf);
    buf
}

/// Serialize a single node and its subtree
pub fn node_to_xml<D: DocumentAccess>(doc: &D, node_id: NodeId) -> String {
    let mut buf = String::with_capacity(256);
    write_node(doc, node_id, &mut buf);
    buf
}

enum StackEntry {
    Enter(NodeId),
    Close(NodeId),
}

fn write_node<D: DocumentAccess>(doc: &D, node_id: NodeId, buf: &mut String) {
    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id));

    while let Some(entry) = stack.pop() {
        let current_id = match entry {
            StackEntry::Close(id) => {
                buf.push_str("</");
                buf.push_str(doc.node_name(id).unwrap_or(""));
                buf.push('>');
                continue;
            }
            StackEntry::Enter(id) => id,
        };
        let Some(node) = doc.get_node(current_id) else {
            continue;
        };
        let value = doc.node_value(current_id).unwrap_or("");

        match node.kind {
            NodeKind::Element => {
                buf.push('<');
                buf.push_str(doc.node_name(current_id).unwrap_or(""));
                for attr in node.attribute_range() {
                    buf.push(' ');
                    buf.push_str(doc.node_name(attr).unwrap_or(""));
                    buf.push_str("=\"");
                    buf.push_str(&escape_attribute(doc.node_value(attr).unwrap_or("")));
                    buf.push('"');
                }

                if node.first_child.is_none() {
                    buf.push_str("/>");
                } else {
                    buf.push('>');
                    stack.push(StackEntry::Close(current_id));
                    push_children(doc, node.last_child, &mut stack);
                }
            }
            NodeKind::Document => {
                push_children(doc, node.last_child, &mut stack);
            }
            NodeKind::Attribute => {
                buf.push_str(&escape_attribute(value));
            }
            NodeKind::Text => buf.push_str(&escape_text(value)),
            NodeKind::CData => {
                buf.push_str("<![CDATA[");
                buf.push_str(value);
                buf.push_str("]]>");
            }
            NodeKind::Comment => {
                buf.push_str("<!--");
                buf.push_str(value);
                buf.push_str("-->");
            }
            NodeKind::ProcessingInstruction => {
                buf.push_str("<?");
                buf.push_str(doc.node_name(current_id).unwrap_or(""));
                if !value.is_empty() {
                    buf.push(' ');
                    buf.push_str(value);
                }
                buf.push_str("?>");
            }
            NodeKind::DocumentType => {
                buf.push_str("<!DOCTYPE ");
                buf.push_str(value);
                buf.push('>');
            }
        }
    }
}

/// Push children last-to-first so the first child is popped first
fn push_children<D: DocumentAccess>(doc: &D, last_child: Option<NodeId>, stack: &mut Vec<StackEntry>) {
    let mut child_id = last_child;
    while let Some(cid) = child_id {
        stack.push(StackEntry::Enter(cid));
        child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
    }
}
