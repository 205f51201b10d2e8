//! XML Entity Decoding and Escaping
//!
//! Handles decoding of XML references:
//! - Predefined entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - General entities declared in the internal DTD subset
//!
//! Uses Cow for zero-copy when no references are present. Anything the
//! decoder does not recognise is an error; feeds never get undeclared
//! entities passed through silently.

use memchr::memchr;
use std::borrow::Cow;
use std::cell::Cell;
use std::collections::HashMap;

/// Ceiling on bytes produced by declared entities over one document,
/// declarations included
pub const MAX_ENTITY_EXPANSION: usize = 10 * 1024 * 1024;

/// General entities declared by the document
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    declared: HashMap<String, String>,
    expanded: Cell<usize>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. The first declaration of a name is binding.
    pub fn declare(&mut self, name: &str, replacement: String) {
        self.declared.entry(name.to_string()).or_insert(replacement);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declared.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Bytes expanded from declared entities so far
    pub fn expanded(&self) -> usize {
        self.expanded.get()
    }

    fn charge(&self, len: usize) -> Result<(), String> {
        let total = self.expanded.get().saturating_add(len);
        if total > MAX_ENTITY_EXPANSION {
            return Err(format!(
                "Entity expansion exceeds {} bytes",
                MAX_ENTITY_EXPANSION
            ));
        }
        self.expanded.set(total);
        Ok(())
    }
}

/// Decode references in text or attribute content
///
/// Returns Borrowed if no references present, Owned otherwise.
pub fn decode_text<'a>(input: &'a str, entities: &EntityTable) -> Result<Cow<'a, str>, String> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = memchr(b';', after.as_bytes())
            .ok_or_else(|| "Unterminated entity reference".to_string())?;
        let reference = &after[..semi];

        if let Some(numeric) = reference.strip_prefix('#') {
            result.push(decode_char_ref(numeric)?);
        } else if let Some(c) = predefined(reference) {
            result.push(c);
        } else if let Some(value) = entities.get(reference) {
            entities.charge(value.len())?;
            result.push_str(value);
        } else if reference.is_empty() {
            return Err("Empty entity reference".to_string());
        } else {
            return Err(format!("Reference to undeclared entity '{}'", reference));
        }
        rest = &after[semi + 1..];
    }
    result.push_str(rest);

    Ok(Cow::Owned(result))
}

#[inline]
fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode the part of a character reference after `&#`
fn decode_char_ref(reference: &str) -> Result<char, String> {
    let codepoint = match reference.strip_prefix('x') {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).ok()
        }
        Some(_) => None,
        None if !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) => {
            reference.parse::<u32>().ok()
        }
        None => None,
    };

    codepoint
        .filter(|&cp| is_valid_xml_char(cp))
        .and_then(char::from_u32)
        .ok_or_else(|| format!("Invalid character reference '&#{};'", reference))
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Find the first character that XML 1.0 does not allow, as a byte offset
pub fn find_invalid_char(content: &str) -> Option<(usize, char)> {
    content
        .char_indices()
        .find(|&(_, c)| !is_valid_xml_char(c as u32))
}

/// Escape character data for element content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape an attribute value for output inside double quotes
///
/// Literal tab/newline/carriage return are written as character references
/// so a reparse yields the same value.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    if !input
        .bytes()
        .any(|b| matches!(b, b'<' | b'&' | b'"' | b'\t' | b'\n' | b'\r'))
    {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\t' => result.push_str("&#x9;"),
            '\n' => result.push_str("&#xA;"),
            '\r' => result.push_str("&#xD;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
