//! Request parameter validation
//!
//! Runs before anything is fetched. XPath validation is a pure syntax check:
//! prefixes are not looked up here, an undeclared one only fails once the
//! expression is evaluated against a feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::XPathError;
use crate::xpath::{self, CompiledExpr};

/// Field name → messages, serialized as the `errors` member of a problem body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Compile `xpath`, reporting only syntax errors
pub fn validate_xpath(xpath: &str) -> Result<CompiledExpr, XPathError> {
    xpath::compile(xpath)
}

/// Parse `raw` as an absolute http or https URL
pub fn validate_feed_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

pub fn required_message(field: &str) -> String {
    format!("The {} field is required.", field)
}

pub fn invalid_xpath_message(field: &str) -> String {
    format!("The {} field is not a valid XPath.", field)
}

pub fn invalid_url_message(field: &str) -> String {
    format!("The {} field is not a valid URL.", field)
}
