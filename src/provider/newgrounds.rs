//! Provider for `www.newgrounds.com` art and movie portals.
//!
//! Media URLs on this host are only produced by page scripts, so pages are
//! opened through a [`PageRenderer`]. Image posts expose the file in the
//! rendered DOM. Movie posts fetch their sources over XHR once the player is
//! started; the provider starts the player and reads that response.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};
use url::Url;

use super::html::{attr_url, compile_static_selector, first_text};
use super::{DescriptorSink, PageRenderer, ResolutionError, UriProvider};
use crate::download::ResourceDescriptor;
use crate::download::filename::sanitize_file_name;

const IMAGE_CSS: &str = "div.image img";
const IMAGE_TITLE_CSS: &str = "div.pod-head h2";

static IMAGE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGE_CSS));
static IMAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGE_TITLE_CSS));

const IS_VIDEO_SCRIPT: &str = "document.querySelectorAll('div.play-wrapper').length == 1";
const IS_IMAGE_SCRIPT: &str = "document.querySelectorAll('div.image').length == 1";

/// Time allowed for one page to render and yield its media URL.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Pages rendered at once by one provider instance.
const MAX_OPEN_PAGES: usize = 1;

#[derive(Debug, Deserialize)]
struct MovieResponse {
    author: Option<String>,
    title: Option<String>,
    sources: Option<HashMap<String, Vec<MovieSource>>>,
}

#[derive(Debug, Deserialize)]
struct MovieSource {
    src: Option<String>,
}

/// Media provider for `www.newgrounds.com`.
pub struct NewgroundsProvider {
    renderer: Arc<dyn PageRenderer>,
    open_pages: Semaphore,
    render_timeout: Duration,
}

impl std::fmt::Debug for NewgroundsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewgroundsProvider")
            .field("render_timeout", &self.render_timeout)
            .finish_non_exhaustive()
    }
}

impl NewgroundsProvider {
    /// Host this provider is registered under.
    pub const HOST: &'static str = "www.newgrounds.com";

    /// Creates a provider rendering pages with `renderer`.
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self::with_render_timeout(renderer, RENDER_TIMEOUT)
    }

    /// Creates a provider with a custom render timeout.
    #[must_use]
    pub fn with_render_timeout(renderer: Arc<dyn PageRenderer>, render_timeout: Duration) -> Self {
        Self {
            renderer,
            open_pages: Semaphore::new(MAX_OPEN_PAGES),
            render_timeout,
        }
    }

    async fn render(&self, page: &Url) -> Result<(Url, String), ResolutionError> {
        let mut rendered = self.renderer.open(page).await?;

        let is_video = rendered.evaluate(IS_VIDEO_SCRIPT).await?.as_bool().unwrap_or(false);
        if is_video {
            let movie_id = movie_id(page)?;
            debug!(movie_id, "starting movie player");
            let script = format!(
                "ngutils.components.video.global_player.initialized = true;\
                 ngutils.components.video.global_player.loadMovieByID({movie_id})"
            );
            let body = rendered.intercept_response(&script).await?;
            return parse_movie_response(&body, page);
        }

        let is_image = rendered.evaluate(IS_IMAGE_SCRIPT).await?.as_bool().unwrap_or(false);
        if is_image {
            let html = rendered.content().await?;
            return parse_image_page(&html, page);
        }

        Err(ResolutionError::render(
            page.as_str(),
            "page holds neither a movie player nor an image",
        ))
    }
}

#[async_trait]
impl UriProvider for NewgroundsProvider {
    fn name(&self) -> &str {
        "newgrounds"
    }

    async fn number_of_items(&self, _page: &Url) -> Result<usize, ResolutionError> {
        Ok(1)
    }

    #[instrument(level = "debug", skip(self, _output_root, sink), fields(page = %page))]
    async fn get_uris(
        &self,
        page: &Url,
        _output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError> {
        // The semaphore is owned by the provider and never closed.
        let _slot = self.open_pages.acquire().await.ok();

        let (media_url, name) = tokio::time::timeout(self.render_timeout, self.render(page))
            .await
            .map_err(|_| {
                ResolutionError::render(
                    page.as_str(),
                    format!("timed out after {}s", self.render_timeout.as_secs()),
                )
            })??;

        sink.send(ResourceDescriptor::new(page.clone(), media_url).with_file_name_hint(name))
    }
}

fn movie_id(page: &Url) -> Result<&str, ResolutionError> {
    page.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(|| ResolutionError::parse(page.as_str(), "no movie id in URL"))
}

/// Picks the highest resolution source and names the file `[author] title`.
fn parse_movie_response(body: &str, page: &Url) -> Result<(Url, String), ResolutionError> {
    if body.trim().is_empty() {
        return Err(ResolutionError::render(page.as_str(), "movie response was empty"));
    }
    let response: MovieResponse = serde_json::from_str(body).map_err(|e| {
        ResolutionError::parse(page.as_str(), format!("unexpected movie response: {e}"))
    })?;
    let sources = response.sources.ok_or_else(|| {
        ResolutionError::parse(page.as_str(), "movie response has no sources")
    })?;

    let src = sources
        .iter()
        .filter_map(|(label, candidates)| {
            let resolution: u32 = label.trim_end_matches('p').parse().ok()?;
            let src = candidates.first()?.src.as_deref()?;
            Some((resolution, src))
        })
        .max_by_key(|(resolution, _)| *resolution)
        .map(|(_, src)| src)
        .ok_or_else(|| ResolutionError::parse(page.as_str(), "movie response lists no usable source"))?;

    let url = Url::parse(src).map_err(|e| {
        ResolutionError::parse(page.as_str(), format!("invalid source URL '{src}': {e}"))
    })?;
    let name = sanitize_file_name(&format!(
        "[{}] {}",
        response.author.unwrap_or_default(),
        response.title.unwrap_or_default()
    ));
    Ok((url, name))
}

fn parse_image_page(html: &str, page: &Url) -> Result<(Url, String), ResolutionError> {
    let document = Html::parse_document(html);
    let image = document
        .select(&IMAGE)
        .next()
        .ok_or_else(|| ResolutionError::missing_element(page.as_str(), IMAGE_CSS))?;
    let url = attr_url(image, "src", page)?;
    let title = first_text(&document, &IMAGE_TITLE, IMAGE_TITLE_CSS, page)?;
    Ok((url, sanitize_file_name(&title)))
}
