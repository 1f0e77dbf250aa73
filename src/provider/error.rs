//! Error types for page resolution.
//!
//! Every variant names the page or sub-page it refers to, because the
//! orchestrator records the rendered message under the page URI that was
//! being resolved.

use thiserror::Error;

/// Errors that can occur while turning a page URI into resource descriptors.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No provider is registered for the page's host.
    #[error("host '{host}' is not supported: no provider registered for {page}")]
    UnsupportedHost {
        /// The page URI that was submitted.
        page: String,
        /// The host that had no provider.
        host: String,
    },

    /// Network-level failure fetching a page.
    #[error("network error fetching {url}: {source}")]
    Fetch {
        /// The page or sub-page URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// A page answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The page or sub-page URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// An element the provider relies on is absent from the markup.
    #[error("expected element '{selector}' not found on {url}")]
    MissingElement {
        /// The page or sub-page URL.
        url: String,
        /// The CSS selector that matched nothing.
        selector: String,
    },

    /// Markup was found but its content could not be interpreted.
    #[error("could not parse {url}: {reason}")]
    Parse {
        /// The page or sub-page URL.
        url: String,
        /// What was wrong with the content.
        reason: String,
    },

    /// The page renderer failed or did not finish in time.
    #[error("rendering {url} failed: {reason}")]
    Render {
        /// The page URL.
        url: String,
        /// Why rendering failed.
        reason: String,
    },

    /// The descriptor channel was closed while the provider was still emitting.
    #[error("descriptor channel closed while resolving {page}")]
    SinkClosed {
        /// The page being resolved.
        page: String,
    },
}

impl ResolutionError {
    /// Creates an `UnsupportedHost` error.
    #[must_use]
    pub fn unsupported_host(page: &str, host: &str) -> Self {
        Self::UnsupportedHost {
            page: page.to_string(),
            host: host.to_string(),
        }
    }

    /// Creates a `Fetch` error from a reqwest error.
    #[must_use]
    pub fn fetch(url: &str, source: reqwest::Error) -> Self {
        Self::Fetch {
            url: url.to_string(),
            source,
        }
    }

    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(url: &str, status: u16) -> Self {
        Self::HttpStatus {
            url: url.to_string(),
            status,
        }
    }

    /// Creates a `MissingElement` error.
    #[must_use]
    pub fn missing_element(url: &str, selector: &str) -> Self {
        Self::MissingElement {
            url: url.to_string(),
            selector: selector.to_string(),
        }
    }

    /// Creates a `Parse` error.
    #[must_use]
    pub fn parse(url: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Render` error.
    #[must_use]
    pub fn render(url: &str, reason: impl Into<String>) -> Self {
        Self::Render {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `SinkClosed` error.
    #[must_use]
    pub fn sink_closed(page: &str) -> Self {
        Self::SinkClosed {
            page: page.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_host_message() {
        let error = ResolutionError::unsupported_host("https://example.org/a", "example.org");
        let msg = error.to_string();
        assert!(msg.contains("not supported"), "Expected 'not supported' in: {msg}");
        assert!(msg.contains("example.org"));
    }

    #[test]
    fn test_missing_element_message_names_selector() {
        let error = ResolutionError::missing_element("https://host/p", "h1.titl");
        assert_eq!(
            error.to_string(),
            "expected element 'h1.titl' not found on https://host/p"
        );
    }

    #[test]
    fn test_parse_and_render_messages() {
        let parse = ResolutionError::parse("https://host/p", "page count 'x' is not a number");
        assert!(parse.to_string().contains("not a number"));

        let render = ResolutionError::render("https://host/v/1", "timed out after 20s");
        assert!(render.to_string().contains("timed out after 20s"));
    }
}
