//! SIMD-accelerated XML scanning using memchr
//!
//! The scanner walks UTF-8 text by byte. Every delimiter it stops on is
//! ASCII, so any slice it hands back starts and ends on a char boundary.

use memchr::{memchr, memmem};

/// Cursor over validated UTF-8 input
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    /// Text between two byte offsets (both must sit on ASCII delimiters)
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip XML whitespace, returning how many bytes were consumed
    #[inline]
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !is_whitespace(b) {
                break;
            }
            self.pos += 1;
        }
        self.pos - start
    }

    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.bytes()[self.pos..].starts_with(needle)
    }

    /// Find next occurrence of a byte, as an absolute offset
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.bytes()[self.pos..]).map(|i| self.pos + i)
    }

    /// Find a multi-byte terminator such as `-->` or `]]>`
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.bytes()[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Find the '>' that closes a tag, ignoring any inside quoted values
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.bytes()[self.pos..].iter().enumerate() {
            match (quote, b) {
                (None, b'"' | b'\'') => quote = Some(b),
                (Some(q), _) if q == b => quote = None,
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Find the '>' that closes a DOCTYPE, skipping over an internal subset
    pub fn find_doctype_end(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        let mut brackets = 0usize;
        for (i, &b) in self.bytes()[self.pos..].iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if q == b => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => brackets += 1,
                (None, b']') => brackets = brackets.saturating_sub(1),
                (None, b'>') if brackets == 0 => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Read an XML name and advance past it
    pub fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if !self.peek().is_some_and(is_name_start_char) {
            return None;
        }
        self.pos += 1;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Name start characters: ASCII letters, underscore, colon, and any non-ASCII byte
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// Whole-string name check used for entity and PI target names
pub fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if is_name_start_char(first) => bytes.all(is_name_char),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new("<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_find_tag_end_mixed_quotes() {
        let scanner = Scanner::new("<a x='\"' y=\"'>'\">");
        assert_eq!(scanner.find_tag_end_quoted(), Some(16));
    }

    #[test]
    fn test_find_doctype_end_with_subset() {
        let scanner = Scanner::new("<!DOCTYPE r [<!ENTITY e \"a>b\">]>tail");
        assert_eq!(scanner.find_doctype_end(), Some(31));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new("dc:creator>");
        assert_eq!(scanner.read_name(), Some("dc:creator"));
        assert_eq!(scanner.position(), 10);
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new("1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_find_sequence() {
        let scanner = Scanner::new("<!-- note -->");
        assert_eq!(scanner.find_sequence(b"-->"), Some(10));
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new("  \t\n hello");
        assert_eq!(scanner.skip_whitespace(), 5);
        assert_eq!(scanner.peek(), Some(b'h'));
    }
}
