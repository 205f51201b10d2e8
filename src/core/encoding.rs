//! XML Encoding Detection and Conversion
//!
//! Detects UTF-16 from the byte order mark or the `<\0` pattern, otherwise
//! reads the `encoding` pseudo-attribute of the XML declaration and decodes
//! through `encoding_rs`. The result is always UTF-8 with line endings
//! normalized to `\n`.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::ParseError;

/// Encoding family detected from the first bytes of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            _ => XmlEncoding::Utf8,
        }
    }
}

/// Decode raw document bytes into normalized UTF-8 text
pub fn decode_document(input: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let text = match XmlEncoding::detect(input) {
        XmlEncoding::Utf16Le => decode_with(UTF_16LE, strip_bom(input, &[0xFF, 0xFE]))?,
        XmlEncoding::Utf16Be => decode_with(UTF_16BE, strip_bom(input, &[0xFE, 0xFF]))?,
        XmlEncoding::Utf8 => {
            let body = strip_bom(input, &[0xEF, 0xBB, 0xBF]);
            match declared_encoding(body) {
                Some(label) => {
                    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                        ParseError::new(format!("Unsupported encoding '{}'", label), 0)
                    })?;
                    if encoding == UTF_16LE || encoding == UTF_16BE {
                        decode_utf8(body)?
                    } else {
                        decode_with(encoding, body)?
                    }
                }
                None => decode_utf8(body)?,
            }
        }
    };

    Ok(normalize_line_endings(text))
}

fn strip_bom<'a>(input: &'a [u8], bom: &[u8]) -> &'a [u8] {
    input.strip_prefix(bom).unwrap_or(input)
}

fn decode_utf8(input: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    std::str::from_utf8(input)
        .map(Cow::Borrowed)
        .map_err(|e| ParseError::new("Invalid UTF-8 sequence", e.valid_up_to()))
}

fn decode_with<'a>(encoding: &'static Encoding, input: &'a [u8]) -> Result<Cow<'a, str>, ParseError> {
    if encoding == UTF_8 {
        return decode_utf8(input);
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(input)
        .ok_or_else(|| ParseError::new(format!("Input is not valid {}", encoding.name()), 0))
}

/// Read the encoding label from an ASCII-compatible XML declaration
fn declared_encoding(input: &[u8]) -> Option<String> {
    if !input.starts_with(b"<?xml") {
        return None;
    }
    let end = memchr::memmem::find(input, b"?>")?;
    let decl = std::str::from_utf8(&input[5..end]).ok()?;
    let at = decl.find("encoding")?;
    let rest = decl[at + "encoding".len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let close = value.find(quote)?;
    Some(value[..close].trim().to_string())
}

/// XML line-end handling: `\r\n` and lone `\r` both become `\n`
fn normalize_line_endings(text: Cow<'_, str>) -> Cow<'_, str> {
    if !text.contains('\r') {
        return text;
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}
