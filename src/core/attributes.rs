//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag with full well-formedness checks.

use super::entities::{decode_text, EntityTable};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use crate::error::ParseError;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written
    pub name: &'a str,
    /// Value with references decoded and whitespace normalized
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// True for `xmlns` and `xmlns:*` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.prefix() == Some("xmlns")
    }
}

/// Split a qualified name into prefix and local name at the first colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(colon) => (Some(&name[..colon]), &name[colon + 1..]),
        None => (None, name),
    }
}

/// Parse attributes from the content between the element name and `>` / `/>`
///
/// Error positions are relative to `input`.
pub fn parse_attributes<'a>(
    input: &'a str,
    entities: &EntityTable,
) -> Result<Vec<Attribute<'a>>, ParseError> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'a>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if pos == ws_start {
            return Err(ParseError::new("Whitespace required before attribute", pos));
        }

        let name_start = pos;
        if !is_name_start_char(bytes[pos]) {
            return Err(ParseError::new("Invalid attribute name", pos));
        }
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(ParseError::new(
                format!("Attribute '{}' is missing a value", name),
                pos,
            ));
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => {
                return Err(ParseError::new(
                    format!("Value of attribute '{}' must be quoted", name),
                    pos,
                ))
            }
        };
        pos += 1;
        let value_start = pos;
        let value_end = memchr(quote, &bytes[value_start..])
            .map(|i| value_start + i)
            .ok_or_else(|| ParseError::new("Unterminated attribute value", value_start))?;
        let raw = &input[value_start..value_end];
        pos = value_end + 1;

        if let Some(lt) = memchr(b'<', raw.as_bytes()) {
            return Err(ParseError::new(
                "'<' is not allowed in attribute values",
                value_start + lt,
            ));
        }
        if attrs.iter().any(|a| a.name == name) {
            return Err(ParseError::new(
                format!("Duplicate attribute '{}'", name),
                name_start,
            ));
        }

        let value = normalize_value(raw, entities)
            .map_err(|message| ParseError::new(message, value_start))?;
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}

/// Literal whitespace becomes a space before references are expanded
fn normalize_value<'a>(raw: &'a str, entities: &EntityTable) -> Result<Cow<'a, str>, String> {
    if !raw.bytes().any(|b| matches!(b, b'\t' | b'\n' | b'\r')) {
        return decode_text(raw, entities);
    }
    let spaced: String = raw
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    Ok(Cow::Owned(decode_text(&spaced, entities)?.into_owned()))
}
