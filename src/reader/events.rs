//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(&'a str),
    /// Text content between tags, references decoded
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(&'a str),
    Comment(&'a str),
    /// Processing instruction: <?target data?>
    ProcessingInstruction { target: &'a str, data: &'a str },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration(XmlDeclaration),
    /// DOCTYPE declaration body, everything between `<!DOCTYPE` and `>`
    DocType(&'a str),
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Qualified name as written
    pub name: &'a str,
    pub attributes: Vec<Attribute<'a>>,
}

/// The `<?xml ...?>` prolog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

impl XmlDeclaration {
    /// Render as markup, e.g. `<?xml version="1.0" encoding="UTF-8"?>`
    pub fn to_markup(&self) -> String {
        let mut out = format!("<?xml version=\"{}\"", self.version);
        if let Some(encoding) = &self.encoding {
            out.push_str(" encoding=\"");
            out.push_str(encoding);
            out.push('"');
        }
        if let Some(standalone) = self.standalone {
            out.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        out.push_str("?>");
        out
    }
}
