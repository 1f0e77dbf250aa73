//! Shared scraping helpers for provider modules.
//!
//! `scraper::Html` is not `Send`, so providers parse inside plain functions
//! that return owned data and never hold a document across an `.await`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::ResolutionError;

/// Compiles a CSS selector at static init; panics on invalid selector.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\d+"));

/// Collapsed, trimmed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `selector`.
///
/// # Errors
///
/// Returns [`ResolutionError::MissingElement`] if nothing matches.
pub(crate) fn first_text(
    document: &Html,
    selector: &Selector,
    css: &str,
    page: &Url,
) -> Result<String, ResolutionError> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .ok_or_else(|| ResolutionError::missing_element(page.as_str(), css))
}

/// Parses the first run of digits in `text` ("24 pages" gives 24).
///
/// # Errors
///
/// Returns [`ResolutionError::Parse`] when `text` holds no number.
pub(crate) fn parse_count(text: &str, page: &Url) -> Result<usize, ResolutionError> {
    LEADING_NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| {
            ResolutionError::parse(page.as_str(), format!("expected a number, found '{text}'"))
        })
}

/// Resolves an attribute value into an absolute URL.
///
/// Protocol-relative values (`//cdn/...`) get `https:`; relative values are
/// joined onto `page`.
///
/// # Errors
///
/// Returns [`ResolutionError::Parse`] when the value is not a valid URL.
pub(crate) fn absolute_url(value: &str, page: &Url) -> Result<Url, ResolutionError> {
    let value = value.trim();
    let parsed = if value.starts_with("//") {
        Url::parse(&format!("https:{value}"))
    } else {
        page.join(value)
    };
    parsed.map_err(|e| ResolutionError::parse(page.as_str(), format!("invalid URL '{value}': {e}")))
}

/// Attribute `name` of `element` as an absolute URL.
///
/// # Errors
///
/// Returns [`ResolutionError::Parse`] when the attribute is missing or invalid.
pub(crate) fn attr_url(
    element: ElementRef<'_>,
    name: &str,
    page: &Url,
) -> Result<Url, ResolutionError> {
    let value = element.value().attr(name).ok_or_else(|| {
        ResolutionError::parse(
            page.as_str(),
            format!("<{}> has no '{name}' attribute", element.value().name()),
        )
    })?;
    absolute_url(value, page)
}
