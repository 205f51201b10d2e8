//! XPath 1.0 Engine
//!
//! Full XPath 1.0 implementation with:
//! - All 13 axes (the namespace axis is always empty)
//! - Namespace-aware name tests resolved through a [`NamespaceContext`]
//! - The core function library, `id()` excepted
//! - Compiled expression caching

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod namespaces;
pub mod parser;
pub mod value;

pub use cache::ExpressionCache;
pub use compiler::{compile, CompiledExpr};
pub use eval::{check_prefixes, evaluate, select_nodes};
pub use namespaces::NamespaceContext;
pub use value::XPathValue;
