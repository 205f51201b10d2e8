//! rff - XPath feed filter
//!
//! Fetches an RSS or Atom feed, removes every node an XPath expression
//! selects and returns the rest as UTF-8 XML.
//!
//! Layers:
//! - core / reader: strict XML 1.0 pull parsing
//! - dom: arena document with detach and serialization
//! - xpath: XPath 1.0 compiler and evaluator
//! - filter: namespace resolution, removal, RSS 1.0 reconciliation
//! - fetch / server / config: the HTTP service around it

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod reader;
pub mod server;
pub mod xpath;

pub use config::Config;
pub use dom::XmlDocument;
pub use error::{FailureKind, FilterError, ParseError, XPathError};
pub use fetch::{FeedFetcher, FetchConfig, FetchError, HttpFetcher};
pub use filter::{filter, filter_feed, FilterOutcome, FilteredFeed};
pub use server::{router, AppState};
pub use xpath::{ExpressionCache, NamespaceContext};
