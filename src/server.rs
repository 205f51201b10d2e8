//! HTTP surface
//!
//! `GET /api/feed/filter` validates its query, fetches the feed, runs the
//! filter pipeline on a blocking thread and answers with the filtered XML or
//! an RFC 7807 problem document. Other paths fall through to static files.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::error::{FailureKind, FilterError};
use crate::fetch::FeedFetcher;
use crate::filter::{self, validate, ValidationErrors};
use crate::xpath::{CompiledExpr, ExpressionCache};

pub const FILTER_ROUTE: &str = "/api/feed/filter";

const FEED_URL_FIELD: &str = "feedUrl";
const XPATH_FIELD: &str = "xpath";
const RSS1_FIELD: &str = "executePostProcessForRss1";

const BAD_REQUEST_TYPE: &str = "https://tools.ietf.org/html/rfc7231#section-6.5.1";
const SERVER_ERROR_TYPE: &str = "https://tools.ietf.org/html/rfc7231#section-6.6.1";

/// Shared per-process state; cheap to clone into every request
pub struct AppState<F> {
    pub fetcher: Arc<F>,
    pub cache: ExpressionCache,
}

impl<F> AppState<F> {
    pub fn new(fetcher: F, cache: ExpressionCache) -> Self {
        AppState {
            fetcher: Arc::new(fetcher),
            cache,
        }
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        AppState {
            fetcher: Arc::clone(&self.fetcher),
            cache: self.cache.clone(),
        }
    }
}

/// Build the application router
pub fn router<F: FeedFetcher>(state: AppState<F>, web_root: impl AsRef<Path>) -> Router {
    let static_files = ServeDir::new(web_root.as_ref()).append_index_html_on_directories(true);

    Router::new()
        .route(FILTER_ROUTE, get(filter_handler::<F>))
        .route("/healthz", get(healthz))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Raw query string values; validated by hand so every field is reported
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(rename = "feedUrl")]
    pub feed_url: Option<String>,
    pub xpath: Option<String>,
    #[serde(rename = "executePostProcessForRss1")]
    pub execute_post_process_for_rss1: Option<String>,
}

struct FilterRequest {
    feed_url: Url,
    xpath: Arc<CompiledExpr>,
    apply_rss1: bool,
}

impl FilterParams {
    fn validate(&self, cache: &ExpressionCache) -> Result<FilterRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let feed_url = match present(&self.feed_url) {
            None => {
                errors.add(FEED_URL_FIELD, validate::required_message(FEED_URL_FIELD));
                None
            }
            Some(raw) => {
                let url = validate::validate_feed_url(raw);
                if url.is_none() {
                    errors.add(FEED_URL_FIELD, validate::invalid_url_message(FEED_URL_FIELD));
                }
                url
            }
        };

        let xpath = match present(&self.xpath) {
            None => {
                errors.add(XPATH_FIELD, validate::required_message(XPATH_FIELD));
                None
            }
            Some(raw) => match cache.get_or_compile(raw) {
                Ok(compiled) => Some(compiled),
                Err(err) => {
                    tracing::debug!(xpath = raw, error = %err, "rejected xpath");
                    errors.add(XPATH_FIELD, validate::invalid_xpath_message(XPATH_FIELD));
                    None
                }
            },
        };

        let apply_rss1 = match self.execute_post_process_for_rss1.as_deref() {
            None | Some("") => Some(true),
            Some(raw) => {
                let parsed = parse_bool(raw);
                if parsed.is_none() {
                    errors.add(
                        RSS1_FIELD,
                        format!("The value '{}' is not valid for {}.", raw, RSS1_FIELD),
                    );
                }
                parsed
            }
        };

        match (feed_url, xpath, apply_rss1) {
            (Some(feed_url), Some(xpath), Some(apply_rss1)) if errors.is_empty() => {
                Ok(FilterRequest {
                    feed_url,
                    xpath,
                    apply_rss1,
                })
            }
            _ => Err(errors),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

async fn filter_handler<F: FeedFetcher>(
    State(state): State<AppState<F>>,
    Query(params): Query<FilterParams>,
) -> Response {
    let request = match params.validate(&state.cache) {
        Ok(request) => request,
        Err(errors) => {
            tracing::warn!(fields = errors.len(), "invalid filter request");
            return Problem::validation(errors).into_response();
        }
    };

    match run_filter(&state, request).await {
        Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(err) => Problem::from_filter_error(&err).into_response(),
    }
}

async fn run_filter<F: FeedFetcher>(
    state: &AppState<F>,
    request: FilterRequest,
) -> Result<String, FilterError> {
    let started = Instant::now();
    let FilterRequest {
        feed_url,
        xpath,
        apply_rss1,
    } = request;

    let bytes = state.fetcher.fetch(&feed_url).await?;

    // Parsing and evaluation are CPU bound
    let feed = tokio::task::spawn_blocking(move || filter::filter_feed(&bytes, &xpath, apply_rss1))
        .await
        .map_err(|err| FilterError::Unexpected(err.to_string()))??;

    tracing::info!(
        url = %feed_url,
        removed = feed.outcome.removed,
        reconciled = feed.outcome.reconciled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "filtered feed"
    );
    Ok(feed.xml)
}

/// `application/problem+json` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl Problem {
    fn validation(errors: ValidationErrors) -> Self {
        Problem {
            type_uri: BAD_REQUEST_TYPE.to_string(),
            title: "One or more validation errors occurred.".to_string(),
            status: StatusCode::BAD_REQUEST.as_u16(),
            detail: None,
            errors: Some(errors),
        }
    }

    fn from_filter_error(err: &FilterError) -> Self {
        let (status, title) = match err.kind() {
            FailureKind::FetchFailure => (
                StatusCode::BAD_REQUEST,
                "An error occurred while fetching source feed.",
            ),
            FailureKind::ParseFailure => {
                (StatusCode::BAD_REQUEST, "An error occurred while parsing XML.")
            }
            FailureKind::XPathFailure => (
                StatusCode::BAD_REQUEST,
                "The xpath field is not a valid XPath.",
            ),
            FailureKind::UnexpectedFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred.",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "filter request failed");
        } else {
            tracing::warn!(error = %err, "filter request rejected");
        }

        let type_uri = if status.is_server_error() {
            SERVER_ERROR_TYPE
        } else {
            BAD_REQUEST_TYPE
        };

        Problem {
            type_uri: type_uri.to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail: Some(err.to_string()),
            errors: None,
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, XPathError};
    use crate::fetch::FetchError;

    fn params(feed_url: Option<&str>, xpath: Option<&str>, rss1: Option<&str>) -> FilterParams {
        FilterParams {
            feed_url: feed_url.map(str::to_string),
            xpath: xpath.map(str::to_string),
            execute_post_process_for_rss1: rss1.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_ok() {
        let cache = ExpressionCache::new(4);
        let request = params(Some("https://example.com/feed.rss"), Some("//item"), None)
            .validate(&cache)
            .ok()
            .unwrap();
        assert_eq!(request.feed_url.as_str(), "https://example.com/feed.rss");
        assert!(request.apply_rss1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_validate_reports_every_field() {
        let cache = ExpressionCache::new(4);
        let errors = params(Some("ftp://example.com/feed"), Some("["), Some("maybe"))
            .validate(&cache)
            .err()
            .unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.get("feedUrl").unwrap(),
            ["The feedUrl field is not a valid URL."]
        );
        assert_eq!(
            errors.get("xpath").unwrap(),
            ["The xpath field is not a valid XPath."]
        );
        assert_eq!(
            errors.get("executePostProcessForRss1").unwrap(),
            ["The value 'maybe' is not valid for executePostProcessForRss1."]
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_validate_required() {
        let errors = params(None, Some("  "), None)
            .validate(&ExpressionCache::new(0))
            .err()
            .unwrap();
        assert_eq!(errors.get("feedUrl").unwrap(), ["The feedUrl field is required."]);
        assert_eq!(errors.get("xpath").unwrap(), ["The xpath field is required."]);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), None);
    }

    #[test]
    fn test_problem_titles() {
        let fetch = FilterError::Fetch(FetchError::Status {
            url: "http://x/".to_string(),
            status: 404,
        });
        let problem = Problem::from_filter_error(&fetch);
        assert_eq!(problem.status, 400);
        assert_eq!(problem.title, "An error occurred while fetching source feed.");

        let parse = FilterError::Parse(ParseError::new("Expected '<'", 0));
        assert_eq!(
            Problem::from_filter_error(&parse).title,
            "An error occurred while parsing XML."
        );

        let xpath = FilterError::XPath(XPathError::UndefinedPrefix("foo".to_string()));
        let problem = Problem::from_filter_error(&xpath);
        assert_eq!(problem.title, "The xpath field is not a valid XPath.");
        assert!(problem.detail.unwrap().contains("foo"));

        let other = Problem::from_filter_error(&FilterError::Unexpected("boom".to_string()));
        assert_eq!(other.status, 500);
        assert_eq!(other.type_uri, SERVER_ERROR_TYPE);
    }

    #[test]
    fn test_problem_serialization() {
        let mut errors = ValidationErrors::new();
        errors.add("xpath", "The xpath field is required.");
        let json = serde_json::to_value(Problem::validation(errors)).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["errors"]["xpath"][0], "The xpath field is required.");
        assert!(json.get("detail").is_none());
    }
}
