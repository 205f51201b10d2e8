//! Feed filtering pipeline
//!
//! namespaces → remove → rss1 (optional) → declaration, over a document the
//! caller parsed and will serialize. Nothing here performs I/O.

pub mod declaration;
pub mod namespaces;
pub mod remove;
pub mod rss1;
pub mod validate;

pub use declaration::normalize_declaration;
pub use namespaces::{resolve_namespaces, DEFAULT_PREFIX};
pub use remove::remove_matches;
pub use rss1::reconcile_sequence;
pub use validate::{validate_feed_url, validate_xpath, ValidationErrors};

use crate::dom::{to_xml, XmlDocument};
use crate::error::FilterError;
use crate::xpath::{CompiledExpr, NamespaceContext};

/// What a filter run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Nodes detached because the expression matched them
    pub removed: usize,
    /// `rdf:Seq` entries pruned along with removed RSS 1.0 items
    pub reconciled: usize,
}

/// A filtered document, serialized
#[derive(Debug, Clone)]
pub struct FilteredFeed {
    /// UTF-8 XML
    pub xml: String,
    pub outcome: FilterOutcome,
}

/// Remove every node `xpath` matches, reconcile the RSS 1.0 sequence when
/// `apply_rss1` is set, and normalize the declaration.
pub fn filter(
    doc: &mut XmlDocument,
    xpath: &CompiledExpr,
    namespaces: &NamespaceContext,
    apply_rss1: bool,
) -> Result<FilterOutcome, FilterError> {
    let removed = remove_matches(doc, xpath, namespaces)?;

    let reconciled = if apply_rss1 {
        reconcile_sequence(doc, &removed, namespaces)
    } else {
        0
    };

    normalize_declaration(doc);

    Ok(FilterOutcome {
        removed: removed.len(),
        reconciled,
    })
}

/// Parse feed bytes, filter them and serialize the result
pub fn filter_feed(
    bytes: &[u8],
    xpath: &CompiledExpr,
    apply_rss1: bool,
) -> Result<FilteredFeed, FilterError> {
    let mut doc = XmlDocument::parse(bytes)?;
    let namespaces = resolve_namespaces(&doc);
    let outcome = filter(&mut doc, xpath, &namespaces, apply_rss1)?;
    Ok(FilteredFeed {
        xml: to_xml(&doc),
        outcome,
    })
}
