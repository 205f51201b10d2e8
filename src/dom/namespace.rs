//! Namespace Resolution
//!
//! Stack-based resolver used while building the tree: every element and
//! attribute gets its namespace URI from the declarations in scope at the
//! point it was parsed.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u32,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u32,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
    xml_uri_id: u32,
    xmlns_uri_id: u32,
}

impl NamespaceResolver {
    /// Create a resolver with the `xml` and `xmlns` prefixes pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
            xml_uri_id,
            xmlns_uri_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a prefixed binding for the current scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> Result<(), String> {
        if prefix_id == self.xmlns_prefix_id {
            return Err("The 'xmlns' prefix must not be declared".to_string());
        }
        if prefix_id == self.xml_prefix_id {
            if uri_id != self.xml_uri_id {
                return Err("The 'xml' prefix cannot be rebound".to_string());
            }
            return Ok(());
        }
        if uri_id == 0 {
            return Err("A prefixed namespace declaration cannot be empty".to_string());
        }
        if uri_id == self.xml_uri_id || uri_id == self.xmlns_uri_id {
            return Err("Reserved namespace URI bound to another prefix".to_string());
        }

        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
        Ok(())
    }

    /// Declare the default namespace; `uri_id` 0 undeclares it
    pub fn declare_default(&mut self, uri_id: u32) {
        self.bindings.push(NsBinding {
            prefix_id: 0,
            uri_id,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace (0 when none is in scope)
    pub fn resolve_default(&self) -> u32 {
        self.resolve(0).unwrap_or(0)
    }

    /// URI id that namespace declaration attributes belong to
    pub fn xmlns_uri_id(&self) -> u32 {
        self.xmlns_uri_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    const RSS1: &str = "http://purl.org/rss/1.0/";

    fn setup() -> (StringPool, NamespaceResolver) {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        (strings, resolver)
    }

    #[test]
    fn test_xml_prefix_prebound() {
        let (mut strings, resolver) = setup();
        let xml = strings.intern("xml");
        assert_eq!(resolver.resolve(xml), strings.find(ns::XML));
        assert_eq!(resolver.resolve_default(), 0);
    }

    #[test]
    fn test_bindings_end_with_their_element() {
        let (mut strings, mut resolver) = setup();
        let rdf = strings.intern("rdf");
        let rdf_uri = strings.intern(RDF);

        resolver.push_scope();
        resolver.declare(rdf, rdf_uri).unwrap();
        resolver.push_scope();
        assert_eq!(resolver.resolve(rdf), Some(rdf_uri));
        resolver.pop_scope();
        resolver.pop_scope();
        assert_eq!(resolver.resolve(rdf), None);
    }

    #[test]
    fn test_inner_default_shadows_outer() {
        let (mut strings, mut resolver) = setup();
        let rss = strings.intern(RSS1);
        let atom = strings.intern("http://www.w3.org/2005/Atom");

        resolver.push_scope();
        resolver.declare_default(rss);
        resolver.push_scope();
        resolver.declare_default(atom);
        assert_eq!(resolver.resolve_default(), atom);
        resolver.push_scope();
        resolver.declare_default(0);
        assert_eq!(resolver.resolve_default(), 0);

        resolver.pop_scope();
        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), rss);
    }

    #[test]
    fn test_reserved_prefixes_and_uris() {
        let (mut strings, mut resolver) = setup();
        let xmlns = strings.intern("xmlns");
        let xml = strings.intern("xml");
        let xml_uri = strings.intern(ns::XML);
        let p = strings.intern("p");
        let other = strings.intern("urn:other");

        resolver.push_scope();
        assert!(resolver.declare(xmlns, other).is_err());
        assert!(resolver.declare(xml, other).is_err());
        assert!(resolver.declare(xml, xml_uri).is_ok());
        assert!(resolver.declare(p, 0).is_err());
        assert!(resolver.declare(p, xml_uri).is_err());
    }
}
