//! Internal DTD subset
//!
//! Only internal general entity declarations are collected. Parameter
//! entities, external entities, element and attribute-list declarations are
//! skipped; nothing external is ever loaded.

use super::entities::{decode_text, EntityTable};
use super::scanner::{is_valid_name, Scanner};

/// Collect `<!ENTITY name "value">` declarations from an internal subset
pub fn collect_entities(subset: &str, table: &mut EntityTable) -> Result<(), String> {
    let mut scanner = Scanner::new(subset);

    while !scanner.is_eof() {
        if scanner.starts_with(b"<!--") {
            let end = scanner
                .find_sequence(b"-->")
                .ok_or_else(|| "Unterminated comment in DTD".to_string())?;
            scanner.set_position(end + 3);
        } else if scanner.starts_with(b"<!ENTITY") {
            scanner.advance(b"<!ENTITY".len());
            read_entity_decl(&mut scanner, table)?;
        } else if scanner.starts_with(b"<") {
            let end = scanner
                .find_tag_end_quoted()
                .ok_or_else(|| "Unterminated markup declaration in DTD".to_string())?;
            scanner.set_position(end + 1);
        } else {
            scanner.advance(1);
        }
    }

    Ok(())
}

fn read_entity_decl(scanner: &mut Scanner<'_>, table: &mut EntityTable) -> Result<(), String> {
    if scanner.skip_whitespace() == 0 {
        return Err("Whitespace required after <!ENTITY".to_string());
    }

    let parameter = scanner.peek() == Some(b'%');
    if parameter {
        scanner.advance(1);
        scanner.skip_whitespace();
    }

    let name = scanner
        .read_name()
        .filter(|n| is_valid_name(n))
        .ok_or_else(|| "Invalid entity name".to_string())?;
    scanner.skip_whitespace();

    let literal = match scanner.peek() {
        Some(q) if q == b'"' || q == b'\'' => {
            scanner.advance(1);
            let start = scanner.position();
            let end = scanner
                .find_byte(q)
                .ok_or_else(|| format!("Unterminated value for entity '{}'", name))?;
            scanner.set_position(end + 1);
            Some(scanner.slice(start, end))
        }
        _ => None,
    };

    let close = scanner
        .find_tag_end_quoted()
        .ok_or_else(|| format!("Unterminated declaration of entity '{}'", name))?;
    scanner.set_position(close + 1);

    if let (false, Some(raw)) = (parameter, literal) {
        let value = decode_text(raw, table)?.into_owned();
        table.declare(name, value);
    }

    Ok(())
}
