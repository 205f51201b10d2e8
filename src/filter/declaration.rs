//! Output declaration
//!
//! Output is always UTF-8, so a declaration naming the source encoding
//! would be wrong once the document is written back out.

use crate::dom::XmlDocument;

/// Rewrite the declaration, if the document had one, to `encoding="UTF-8"`.
/// Version and standalone are kept; a document without one stays without.
pub fn normalize_declaration(doc: &mut XmlDocument) {
    let Some(decl) = doc.declaration() else {
        return;
    };
    let mut decl = decl.clone();
    decl.encoding = Some("UTF-8".to_string());
    doc.set_declaration(Some(decl));
}
