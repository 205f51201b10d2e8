//! Error types shared by the parser, the XPath engine and the filter pipeline.

use thiserror::Error;

use crate::fetch::FetchError;

/// A well-formedness or encoding failure while reading XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the UTF-8 converted input
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Failures raised while compiling or evaluating an XPath expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("XPath syntax error: {0}")]
    Syntax(String),
    #[error("namespace prefix '{0}' is not defined")]
    UndefinedPrefix(String),
    #[error("expression must evaluate to a node-set, not a {0}")]
    NotANodeSet(&'static str),
    #[error("XPath evaluation error: {0}")]
    Evaluation(String),
}

/// Classified failure of a filter request.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to fetch source feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to parse XML: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid XPath: {0}")]
    XPath(#[from] XPathError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// The four outcomes a caller distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    FetchFailure,
    ParseFailure,
    XPathFailure,
    UnexpectedFailure,
}

impl FilterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FilterError::Fetch(_) => FailureKind::FetchFailure,
            FilterError::Parse(_) => FailureKind::ParseFailure,
            FilterError::XPath(_) => FailureKind::XPathFailure,
            FilterError::Unexpected(_) => FailureKind::UnexpectedFailure,
        }
    }
}
