//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Converting a node-set needs the document, so those conversions take it.

use crate::dom::{node_string_value, DocumentAccess, NodeId};

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes in document order, no duplicates
    NodeSet(Vec<NodeId>),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    /// Create a node set with a single node
    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// Convert to number (XPath number() function semantics)
    pub fn to_number<D: DocumentAccess>(&self, doc: &D) -> f64 {
        match self {
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::NodeSet(_) => string_to_number(&self.to_string_value(doc)),
        }
    }

    /// Convert to string (XPath string() function semantics).
    ///
    /// A node-set converts to the string-value of its first node.
    pub fn to_string_value<D: DocumentAccess>(&self, doc: &D) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&first| node_string_value(doc, first))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    /// Get as node set, or None
    pub fn as_nodeset(&self) -> Option<&Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
        }
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for XPathValue {
    fn from(nodes: Vec<NodeId>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}

/// XPath string-to-number: optional surrounding whitespace, an optional
/// minus sign and digits with at most one decimal point. Anything else,
/// exponents and a leading `+` included, is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);

    let mut seen_digit = false;
    let mut seen_point = false;
    for b in digits.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// XPath number-to-string: integers without a fraction, never an exponent
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        // Display for f64 never uses scientific notation
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::NodeSet(vec![1]).to_boolean());
        assert!(!XPathValue::NodeSet(vec![]).to_boolean());
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(!XPathValue::Boolean(false).to_boolean());
        assert!(XPathValue::Number(1.0).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::String("hello".to_string()).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
    }

    #[test]
    fn test_number_conversion() {
        let doc = XmlDocument::parse_str("<r>  12.5 </r>").unwrap();
        assert_eq!(XPathValue::Boolean(true).to_number(&doc), 1.0);
        assert_eq!(XPathValue::Boolean(false).to_number(&doc), 0.0);
        assert_eq!(XPathValue::String("42".to_string()).to_number(&doc), 42.0);
        assert!(XPathValue::String("abc".to_string()).to_number(&doc).is_nan());
        let root = doc.root_element_id().unwrap();
        assert_eq!(XPathValue::single_node(root).to_number(&doc), 12.5);
        assert!(XPathValue::empty_nodeset().to_number(&doc).is_nan());
    }

    #[test]
    fn test_string_to_number_grammar() {
        assert_eq!(string_to_number(" -3 "), -3.0);
        assert_eq!(string_to_number(".5"), 0.5);
        assert_eq!(string_to_number("5."), 5.0);
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("+1").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("").is_nan());
        assert!(string_to_number("-").is_nan());
        assert!(string_to_number("1.2.3").is_nan());
    }

    #[test]
    fn test_string_conversion() {
        let doc = XmlDocument::parse_str("<r>text</r>").unwrap();
        assert_eq!(XPathValue::Boolean(true).to_string_value(&doc), "true");
        assert_eq!(XPathValue::Boolean(false).to_string_value(&doc), "false");
        assert_eq!(XPathValue::Number(42.0).to_string_value(&doc), "42");
        assert_eq!(XPathValue::Number(3.25).to_string_value(&doc), "3.25");
        assert_eq!(XPathValue::single_node(0).to_string_value(&doc), "text");
        assert_eq!(XPathValue::empty_nodeset().to_string_value(&doc), "");
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(-2.0), "-2");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(1e21), "1000000000000000000000");
        assert_eq!(number_to_string(0.000001), "0.000001");
    }
}
