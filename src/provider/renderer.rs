//! Scripted-browser seam for hosts whose media URLs only appear at runtime.
//!
//! The crate ships no browser. Callers that need such hosts supply a
//! [`PageRenderer`] backed by whatever headless browser they run, and pass it
//! to [`ProviderRegistry::with_defaults`](super::ProviderRegistry::with_defaults).

use async_trait::async_trait;
use url::Url;

use super::ResolutionError;

/// Opens pages in a scripted browser.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url` and waits until the page has finished loading.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::Render`] if the page cannot be loaded.
    async fn open(&self, url: &Url) -> Result<Box<dyn RenderedPage>, ResolutionError>;
}

/// A loaded page. Dropping it closes the page.
#[async_trait]
pub trait RenderedPage: Send {
    /// Evaluates a JavaScript expression and returns its JSON value.
    async fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, ResolutionError>;

    /// Returns the current serialized DOM.
    async fn content(&mut self) -> Result<String, ResolutionError>;

    /// Runs `trigger_script` and returns the body of the first XHR response
    /// the page receives afterwards.
    async fn intercept_response(&mut self, trigger_script: &str) -> Result<String, ResolutionError>;
}
