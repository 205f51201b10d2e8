//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes. Each axis returns its nodes in axis order:
//! reverse axes (parent, ancestor, ancestor-or-self, preceding,
//! preceding-sibling) list the nearest node first.

use super::compiler::CompiledNodeTest;
use super::namespaces::NamespaceContext;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => descendant_or_self_axis(doc, context),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => ancestor_or_self_axis(doc, context),
        Axis::FollowingSibling => sibling_axis(doc, context, |d, id| d.next_sibling_of(id)),
        Axis::PrecedingSibling => sibling_axis(doc, context, |d, id| d.prev_sibling_of(id)),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attribute_nodes(context),
        // Namespace nodes are not modelled
        Axis::Namespace => Vec::new(),
    }
}

/// The node kind a `*` or name test selects on this axis
pub fn principal_node_kind(axis: Axis) -> NodeKind {
    match axis {
        Axis::Attribute => NodeKind::Attribute,
        _ => NodeKind::Element,
    }
}

fn descendant_or_self_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let descendants = doc.descendants_vec(context);
    let mut result = Vec::with_capacity(1 + descendants.len());
    result.push(context);
    result.extend(descendants);
    result
}

fn ancestor_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

fn ancestor_or_self_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = vec![context];
    result.extend(ancestor_axis(doc, context));
    result
}

fn sibling_axis<D, F>(doc: &D, context: NodeId, next: F) -> Vec<NodeId>
where
    D: DocumentAccess,
    F: Fn(&D, NodeId) -> Option<NodeId>,
{
    let mut result = Vec::new();
    let mut sibling = next(doc, context);
    while let Some(id) = sibling {
        result.push(id);
        sibling = next(doc, id);
    }
    result
}

/// Attributes sit between their owner element and its first child
fn is_attribute<D: DocumentAccess>(doc: &D, id: NodeId) -> bool {
    doc.node_kind(id) == Some(NodeKind::Attribute)
}

/// following:: axis - everything after the context node that is not a descendant
fn following_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();

    let mut start = context;
    if is_attribute(doc, context) {
        let Some(owner) = doc.parent_of(context) else {
            return result;
        };
        result.extend(doc.descendants_vec(owner));
        start = owner;
    }

    let mut current = Some(start);
    while let Some(cur) = current {
        let mut sibling = doc.next_sibling_of(cur);
        while let Some(sib_id) = sibling {
            result.push(sib_id);
            result.extend(doc.descendants_vec(sib_id));
            sibling = doc.next_sibling_of(sib_id);
        }
        current = doc.parent_of(cur);
    }

    result
}

/// preceding:: axis - everything before the context node except its ancestors
fn preceding_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();

    let mut current = if is_attribute(doc, context) {
        doc.parent_of(context)
    } else {
        Some(context)
    };

    while let Some(cur) = current {
        let mut sibling = doc.prev_sibling_of(cur);
        while let Some(sib_id) = sibling {
            let descendants = doc.descendants_vec(sib_id);
            result.extend(descendants.into_iter().rev());
            result.push(sib_id);
            sibling = doc.prev_sibling_of(sib_id);
        }
        current = doc.parent_of(cur);
    }

    result
}

/// Check if a node matches a node test.
///
/// `principal` is the axis' principal node kind; prefixes resolve through
/// `namespaces` and an unbound prefix matches nothing.
pub fn matches_node_test<D: DocumentAccess>(
    doc: &D,
    node_id: NodeId,
    node_test: &CompiledNodeTest,
    principal: NodeKind,
    namespaces: &NamespaceContext,
) -> bool {
    let Some(kind) = doc.node_kind(node_id) else {
        return false;
    };

    let in_namespace = |uri: Option<&str>| doc.node_namespace_uri(node_id) == uri;
    let local_is = |local: &str| doc.node_local_name(node_id) == Some(local);

    match node_test {
        CompiledNodeTest::Any => kind == principal,
        CompiledNodeTest::Name(name) => kind == principal && in_namespace(None) && local_is(name),
        CompiledNodeTest::QName(prefix, local) => match namespaces.resolve(prefix) {
            Some(uri) => kind == principal && in_namespace(Some(uri)) && local_is(local),
            None => false,
        },
        CompiledNodeTest::NamespaceWildcard(prefix) => match namespaces.resolve(prefix) {
            Some(uri) => kind == principal && in_namespace(Some(uri)),
            None => false,
        },
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target
                    .as_deref()
                    .map_or(true, |t| doc.node_name(node_id) == Some(t))
        }
    }
}
