//! RSS 1.0 sequence reconciliation
//!
//! An RSS 1.0 channel lists its items a second time, by URL, in
//! `channel/items/rdf:Seq`. Once item elements are removed, the `rdf:li`
//! entries pointing at them have to go as well.

use std::collections::HashSet;

use super::namespaces::DEFAULT_PREFIX;
use crate::dom::{DocumentAccess, NodeId, XmlDocument};
use crate::xpath::NamespaceContext;

pub const RDF_PREFIX: &str = "rdf";

/// Remove `rdf:Seq` entries whose `rdf:resource` is the `rdf:about` of a
/// removed node. Returns the number of entries removed.
///
/// Does nothing unless nodes were removed and both the `rdf` and default
/// namespaces are bound, and when the document has no
/// `/rdf:RDF/default:channel/default:items/rdf:Seq`.
pub fn reconcile_sequence(
    doc: &mut XmlDocument,
    removed: &[NodeId],
    namespaces: &NamespaceContext,
) -> usize {
    if removed.is_empty() {
        return 0;
    }
    let (Some(rdf), Some(rss)) = (namespaces.resolve(RDF_PREFIX), namespaces.resolve(DEFAULT_PREFIX)) else {
        tracing::trace!("rdf or default namespace missing, not an RSS 1.0 feed");
        return 0;
    };
    let Some(seq) = find_sequence(doc, rdf, rss) else {
        tracing::trace!("no rdf:Seq in channel items");
        return 0;
    };

    let deleted: HashSet<&str> = removed
        .iter()
        .filter_map(|&id| doc.get_attribute_ns(id, rdf, "about"))
        .collect();
    if deleted.is_empty() {
        return 0;
    }

    let stale: Vec<NodeId> = doc
        .children(seq)
        .filter(|&entry| {
            doc.get_attribute_ns(entry, rdf, "resource")
                .is_some_and(|resource| deleted.contains(resource))
        })
        .collect();

    let mut count = 0;
    for entry in stale {
        if doc.detach(entry) {
            count += 1;
        }
    }

    tracing::debug!(entries = count, "pruned rdf:Seq entries");
    count
}

/// `/rdf:RDF/default:channel/default:items/rdf:Seq`, first match per level
fn find_sequence(doc: &XmlDocument, rdf: &str, rss: &str) -> Option<NodeId> {
    let root = doc.root_element_id()?;
    if !is_element(doc, root, rdf, "RDF") {
        return None;
    }
    let channel = find_child(doc, root, rss, "channel")?;
    let items = find_child(doc, channel, rss, "items")?;
    find_child(doc, items, rdf, "Seq")
}

fn find_child(doc: &XmlDocument, parent: NodeId, uri: &str, local: &str) -> Option<NodeId> {
    doc.children(parent).find(|&id| is_element(doc, id, uri, local))
}

fn is_element(doc: &XmlDocument, id: NodeId, uri: &str, local: &str) -> bool {
    doc.get_node(id).is_some_and(|n| n.is_element())
        && doc.node_namespace_uri(id) == Some(uri)
        && doc.node_local_name(id) == Some(local)
}
