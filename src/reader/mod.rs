//! XML pull reader
//!
//! - SliceReader: strict pull parser over a UTF-8 buffer
//! - Events: the event types it yields

pub mod events;
pub mod slice;

pub use events::{StartElement, XmlDeclaration, XmlEvent};
pub use slice::SliceReader;
