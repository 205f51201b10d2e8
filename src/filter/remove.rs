//! Select-then-detach removal of matched nodes

use crate::dom::{DocumentAccess, NodeId, XmlDocument};
use crate::error::XPathError;
use crate::xpath::{select_nodes, CompiledExpr, NamespaceContext};

/// Detach every node `expr` selects and return them in document order.
///
/// The full match list is computed before the tree changes. The root
/// element, the document node and attributes are never detached; a match
/// nested inside an already removed subtree is still detached and reported.
pub fn remove_matches(
    doc: &mut XmlDocument,
    expr: &CompiledExpr,
    namespaces: &NamespaceContext,
) -> Result<Vec<NodeId>, XPathError> {
    let matches = select_nodes(doc, expr, namespaces)?;
    let root = doc.root_element_id();

    let mut removed = Vec::with_capacity(matches.len());
    for id in matches {
        if Some(id) == root {
            tracing::debug!("xpath matched the root element, leaving it in place");
            continue;
        }
        if doc.detach(id) {
            removed.push(id);
        }
    }

    tracing::debug!(removed = removed.len(), "removed matched nodes");
    Ok(removed)
}
