//! Zero-Copy Slice Parser
//!
//! Strict XML 1.0 pull parser over a UTF-8 string. Names, comments, CDATA
//! and PI bodies are borrowed straight from the input; text is only copied
//! when it carries references. Every well-formedness violation is reported
//! as a `ParseError` with the byte offset where it was detected.

use memchr::memmem;

use super::events::{StartElement, XmlDeclaration, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::dtd::collect_entities;
use crate::core::entities::{decode_text, EntityTable};
use crate::core::scanner::{is_whitespace, Scanner};
use crate::error::ParseError;

/// Strict XML reader over a string slice
pub struct SliceReader<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    entities: EntityTable,
    /// Names of currently open elements
    open: Vec<&'a str>,
    seen_root: bool,
    seen_doctype: bool,
    event_start: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            input,
            scanner: Scanner::new(input),
            entities: EntityTable::new(),
            open: Vec::with_capacity(16),
            seen_root: false,
            seen_doctype: false,
            event_start: 0,
        }
    }

    /// Byte offset where the most recent event began
    #[inline]
    pub fn event_start(&self) -> usize {
        self.event_start
    }

    /// Number of currently open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    #[inline]
    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError::new(message, position)
    }

    /// Get the next XML event, or `None` once the document is complete
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        loop {
            let start = self.scanner.position();
            self.event_start = start;

            if self.scanner.is_eof() {
                return self.finish().map(|_| None);
            }

            if self.scanner.peek() != Some(b'<') {
                match self.read_text(start)? {
                    Some(event) => return Ok(Some(event)),
                    None => continue,
                }
            }

            return match self.scanner.peek_at(1) {
                Some(b'?') => self.read_processing_instruction(start).map(Some),
                Some(b'!') => {
                    if self.scanner.starts_with(b"<!--") {
                        self.read_comment(start).map(Some)
                    } else if self.scanner.starts_with(b"<![CDATA[") {
                        self.read_cdata(start).map(Some)
                    } else if self.scanner.starts_with(b"<!DOCTYPE") {
                        self.read_doctype(start).map(Some)
                    } else {
                        Err(self.error("Unsupported markup declaration", start))
                    }
                }
                Some(b'/') => self.read_end_tag(start).map(Some),
                _ => self.read_start_tag(start).map(Some),
            };
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        let end = self.input.len();
        if let Some(name) = self.open.last() {
            return Err(self.error(format!("Unclosed element <{}>", name), end));
        }
        if !self.seen_root {
            return Err(self.error("Document has no root element", end));
        }
        Ok(())
    }

    /// Character data up to the next '<'. Whitespace between top-level
    /// constructs is consumed without producing an event.
    fn read_text(&mut self, start: usize) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let end = self.scanner.find_byte(b'<').unwrap_or(self.input.len());
        let raw = self.scanner.slice(start, end);
        self.scanner.set_position(end);

        if self.open.is_empty() {
            if raw.bytes().all(is_whitespace) {
                return Ok(None);
            }
            return Err(self.error("Text is not allowed outside the root element", start));
        }
        if let Some(i) = memmem::find(raw.as_bytes(), b"]]>") {
            return Err(self.error("']]>' is not allowed in character data", start + i));
        }

        let text = decode_text(raw, &self.entities).map_err(|m| self.error(m, start))?;
        Ok(Some(XmlEvent::Text(text)))
    }

    fn read_processing_instruction(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("Invalid processing instruction target", start))?;
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_sequence(b"?>")
            .ok_or_else(|| self.error("Unterminated processing instruction", start))?;
        let body = self.scanner.slice(body_start, end);
        self.scanner.set_position(end + 2);

        if target.eq_ignore_ascii_case("xml") {
            if target != "xml" || start != 0 {
                return Err(self.error(
                    "XML declaration is only allowed at the start of the document",
                    start,
                ));
            }
            return self.parse_declaration(body, body_start).map(XmlEvent::XmlDeclaration);
        }

        let data = match body.as_bytes().first() {
            None => "",
            Some(&b) if is_whitespace(b) => body.trim_start_matches([' ', '\t', '\n']),
            Some(_) => {
                return Err(self.error(
                    "Whitespace required after processing instruction target",
                    body_start,
                ))
            }
        };

        Ok(XmlEvent::ProcessingInstruction { target, data })
    }

    fn parse_declaration(&self, body: &str, offset: usize) -> Result<XmlDeclaration, ParseError> {
        let attrs = parse_attributes(body, &EntityTable::new())
            .map_err(|e| self.error(e.message, offset + e.position))?;
        let mut attrs = attrs.into_iter();

        let version = match attrs.next() {
            Some(a) if a.name == "version" => a.value.into_owned(),
            _ => return Err(self.error("XML declaration must start with version", offset)),
        };

        let mut encoding = None;
        let mut standalone = None;
        for attr in attrs {
            match attr.name {
                "encoding" if encoding.is_none() && standalone.is_none() => {
                    encoding = Some(attr.value.into_owned());
                }
                "standalone" if standalone.is_none() => {
                    standalone = Some(match attr.value.as_ref() {
                        "yes" => true,
                        "no" => false,
                        other => {
                            return Err(self.error(
                                format!("Invalid standalone value '{}'", other),
                                offset,
                            ))
                        }
                    });
                }
                other => {
                    return Err(self.error(
                        format!("Unexpected '{}' in XML declaration", other),
                        offset,
                    ))
                }
            }
        }

        Ok(XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }

    fn read_comment(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(4);
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_sequence(b"-->")
            .ok_or_else(|| self.error("Unterminated comment", start))?;
        let content = self.scanner.slice(body_start, end);
        self.scanner.set_position(end + 3);

        if let Some(i) = memmem::find(content.as_bytes(), b"--") {
            return Err(self.error("'--' is not allowed inside comments", body_start + i));
        }
        if content.ends_with('-') {
            return Err(self.error("Comment must not end with '-'", end - 1));
        }
        Ok(XmlEvent::Comment(content))
    }

    fn read_cdata(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        if self.open.is_empty() {
            return Err(self.error("CDATA section outside the root element", start));
        }
        self.scanner.advance(b"<![CDATA[".len());
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_sequence(b"]]>")
            .ok_or_else(|| self.error("Unterminated CDATA section", start))?;
        let content = self.scanner.slice(body_start, end);
        self.scanner.set_position(end + 3);
        Ok(XmlEvent::CData(content))
    }

    fn read_doctype(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        if self.seen_root || self.seen_doctype {
            return Err(self.error(
                "DOCTYPE must appear once, before the root element",
                start,
            ));
        }
        self.scanner.advance(b"<!DOCTYPE".len());
        let body_start = self.scanner.position();
        if self.scanner.skip_whitespace() == 0 {
            return Err(self.error("Whitespace required after <!DOCTYPE", body_start));
        }
        self.scanner.set_position(body_start);
        let end = self
            .scanner
            .find_doctype_end()
            .ok_or_else(|| self.error("Unterminated DOCTYPE", start))?;
        let body = self.scanner.slice(body_start, end);
        self.scanner.set_position(end + 1);
        self.seen_doctype = true;

        if let (Some(open), Some(close)) = (body.find('['), body.rfind(']')) {
            if open < close {
                collect_entities(&body[open + 1..close], &mut self.entities)
                    .map_err(|m| self.error(m, body_start + open + 1))?;
            }
        }

        Ok(XmlEvent::DocType(body.trim()))
    }

    fn read_end_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("Invalid end tag", start))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(self.error(
                format!("Expected '>' to close </{}>", name),
                self.scanner.position(),
            ));
        }
        self.scanner.advance(1);

        match self.open.pop() {
            Some(expected) if expected == name => Ok(XmlEvent::EndElement(name)),
            Some(expected) => Err(self.error(
                format!(
                    "Mismatched end tag: expected </{}>, found </{}>",
                    expected, name
                ),
                start,
            )),
            None => Err(self.error(format!("Unexpected end tag </{}>", name), start)),
        }
    }

    fn read_start_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        if self.open.is_empty() && self.seen_root {
            return Err(self.error("Only one root element is allowed", start));
        }
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("Invalid element name", start))?;
        let name_end = self.scanner.position();
        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| self.error(format!("Unclosed start tag <{}>", name), start))?;

        let empty = end > name_end && self.input.as_bytes()[end - 1] == b'/';
        let content_end = if empty { end - 1 } else { end };
        let content = self.scanner.slice(name_end, content_end);
        let attributes = parse_attributes(content, &self.entities)
            .map_err(|e| self.error(e.message, name_end + e.position))?;
        self.scanner.set_position(end + 1);
        self.seen_root = true;

        let element = StartElement { name, attributes };
        if empty {
            Ok(XmlEvent::EmptyElement(element))
        } else {
            self.open.push(name);
            Ok(XmlEvent::StartElement(element))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn collect(input: &str) -> Result<Vec<XmlEvent<'_>>, ParseError> {
        let mut reader = SliceReader::new(input);
        let mut events = Vec::new();
        while let Some(event) = reader.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_simple_document() {
        let events = collect("<rss><channel>hi</channel></rss>").unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name == "rss"));
        assert!(matches!(&events[2], XmlEvent::Text(t) if t == "hi"));
        assert!(matches!(events[4], XmlEvent::EndElement("rss")));
    }

    #[test]
    fn test_declaration() {
        let events = collect(r#"<?xml version="1.0" encoding="ISO-8859-1" standalone="no"?><a/>"#)
            .unwrap();
        match &events[0] {
            XmlEvent::XmlDeclaration(decl) => {
                assert_eq!(decl.version, "1.0");
                assert_eq!(decl.encoding.as_deref(), Some("ISO-8859-1"));
                assert_eq!(decl.standalone, Some(false));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&events[1], XmlEvent::EmptyElement(e) if e.name == "a"));
    }

    #[test]
    fn test_declaration_not_first() {
        let err = collect(r#" <?xml version="1.0"?><a/>"#).unwrap_err();
        assert!(err.message.contains("start of the document"));
    }

    #[test]
    fn test_top_level_whitespace_skipped() {
        let events = collect("\n<!-- c -->\n<a/>\n").unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], XmlEvent::Comment(" c ")));
    }

    #[test]
    fn test_whitespace_text_inside_root_kept() {
        let events = collect("<a>\n  <b/>\n</a>").unwrap();
        assert!(matches!(&events[1], XmlEvent::Text(t) if t == "\n  "));
    }

    #[test]
    fn test_entities_in_text() {
        let events = collect("<a>fish &amp; chips</a>").unwrap();
        assert!(matches!(&events[1], XmlEvent::Text(Cow::Owned(t)) if t == "fish & chips"));
    }

    #[test]
    fn test_doctype_entities() {
        let events = collect(r#"<!DOCTYPE a [<!ENTITY who "world">]><a>hello &who;</a>"#).unwrap();
        assert!(matches!(events[0], XmlEvent::DocType(body) if body.starts_with("a [")));
        assert!(matches!(&events[2], XmlEvent::Text(t) if t == "hello world"));
    }

    #[test]
    fn test_cdata_and_pi() {
        let events = collect("<a><![CDATA[<b>&]]><?php echo 1; ?></a>").unwrap();
        assert!(matches!(events[1], XmlEvent::CData("<b>&")));
        assert!(matches!(
            events[2],
            XmlEvent::ProcessingInstruction { target: "php", data: "echo 1; " }
        ));
    }

    #[test]
    fn test_gt_inside_attribute() {
        let events = collect(r#"<a title="x > y"/>"#).unwrap();
        match &events[0] {
            XmlEvent::EmptyElement(e) => assert_eq!(e.attributes[0].value, "x > y"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = collect("<a><b></a></b>").unwrap_err();
        assert!(err.message.contains("Mismatched"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_unclosed_element() {
        let err = collect("<a><b></b>").unwrap_err();
        assert!(err.message.contains("Unclosed element <a>"));
    }

    #[test]
    fn test_multiple_roots() {
        assert!(collect("<a/><b/>").is_err());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(collect("<a/>trailing").is_err());
        assert!(collect("leading<a/>").is_err());
    }

    #[test]
    fn test_empty_document() {
        let err = collect("   ").unwrap_err();
        assert!(err.message.contains("no root"));
    }

    #[test]
    fn test_double_hyphen_in_comment() {
        assert!(collect("<a><!-- a -- b --></a>").is_err());
        assert!(collect("<a><!-- a ---></a>").is_err());
    }

    #[test]
    fn test_undeclared_entity() {
        assert!(collect("<a>&nbsp;</a>").is_err());
    }

    #[test]
    fn test_html_is_rejected() {
        let html = "<!DOCTYPE html><html><head><meta charset=utf-8></head><body><br></body></html>";
        assert!(collect(html).is_err());
    }

    #[test]
    fn test_doctype_after_root() {
        assert!(collect("<a/><!DOCTYPE a>").is_err());
    }

    #[test]
    fn test_cdata_terminator_in_text() {
        assert!(collect("<a>x ]]> y</a>").is_err());
    }
}
