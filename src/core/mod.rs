//! Core XML parsing primitives
//!
//! - Scanner: memchr-accelerated delimiter detection and name classes
//! - Entities: entity and character reference decoding, output escaping
//! - Attributes: attribute list parsing and QName splitting
//! - Encoding: BOM sniffing and transcoding to UTF-8
//! - DTD: internal subset scanning for general entity declarations

pub mod attributes;
pub mod dtd;
pub mod encoding;
pub mod entities;
pub mod scanner;
