//! Provider for `nhentai.net` galleries.
//!
//! The host rejects clients that open many connections at once, so every
//! page fetch made by this provider goes through one shared [`RequestGate`]:
//! at most three requests in flight, each slot held for 350 to 700 ms
//! afterwards. File transfers are not gated.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::html::{attr_url, compile_static_selector, element_text, parse_count};
use super::{DescriptorSink, RequestGate, ResolutionError, UriProvider};
use crate::download::filename::comic_directory;
use crate::download::{HttpClient, ResourceDescriptor};

const COUNT_CSS: &str = "a.tag span";
const TITLE_CSS: &str = "h1.title span";
const IMAGE_CSS: &str = "div#content img";

static COUNT: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(COUNT_CSS));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(TITLE_CSS));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGE_CSS));

const MAX_SIMULTANEOUS_REQUESTS: usize = 3;
const MIN_PAUSE: Duration = Duration::from_millis(350);
const MAX_PAUSE: Duration = Duration::from_millis(700);

/// Gallery provider for `nhentai.net`.
#[derive(Debug)]
pub struct NHentaiProvider {
    client: HttpClient,
    gate: RequestGate,
}

impl NHentaiProvider {
    /// Host this provider is registered under.
    pub const HOST: &'static str = "nhentai.net";

    /// Creates a provider with the host's default request gate.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_gate(
            client,
            RequestGate::new(MAX_SIMULTANEOUS_REQUESTS, MIN_PAUSE, MAX_PAUSE),
        )
    }

    /// Creates a provider with a custom request gate.
    #[must_use]
    pub fn with_gate(client: HttpClient, gate: RequestGate) -> Self {
        Self { client, gate }
    }

    async fn fetch(&self, url: &Url) -> Result<String, ResolutionError> {
        self.gate.run(self.client.fetch_text(url)).await
    }
}

#[async_trait]
impl UriProvider for NHentaiProvider {
    fn name(&self) -> &str {
        "nhentai"
    }

    #[instrument(level = "debug", skip(self), fields(page = %page))]
    async fn number_of_items(&self, page: &Url) -> Result<usize, ResolutionError> {
        let html = self.fetch(page).await?;
        parse_page_count(&Html::parse_document(&html), page)
    }

    #[instrument(level = "debug", skip(self, output_root, sink), fields(page = %page))]
    async fn get_uris(
        &self,
        page: &Url,
        output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError> {
        let html = self.fetch(page).await?;
        let (directory, count) = parse_gallery(&html, page, output_root)?;
        let base = gallery_base(page);
        debug!(count, "resolving image pages");

        for number in 1..=count {
            let image_page = base.join(&number.to_string()).map_err(|e| {
                ResolutionError::parse(page.as_str(), format!("cannot build image page {number}: {e}"))
            })?;
            let html = self.fetch(&image_page).await?;
            let image_url = parse_image(&html, &image_page)?;
            sink.send(
                ResourceDescriptor::new(page.clone(), image_url)
                    .with_output_directory(&directory)
                    .with_file_name_hint(number - 1),
            )?;
        }
        Ok(())
    }
}

/// The gallery URL with a trailing slash, so image pages join beneath it.
fn gallery_base(page: &Url) -> Url {
    let mut base = page.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn parse_page_count(document: &Html, page: &Url) -> Result<usize, ResolutionError> {
    let count = document
        .select(&COUNT)
        .last()
        .map(element_text)
        .ok_or_else(|| ResolutionError::missing_element(page.as_str(), COUNT_CSS))?;
    parse_count(&count, page)
}

fn parse_gallery(
    html: &str,
    page: &Url,
    output_root: &Path,
) -> Result<(PathBuf, usize), ResolutionError> {
    let document = Html::parse_document(html);
    let parts: Vec<String> = document
        .select(&TITLE)
        .map(element_text)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(ResolutionError::missing_element(page.as_str(), TITLE_CSS));
    }
    let count = parse_page_count(&document, page)?;
    Ok((comic_directory(output_root, &parts.join(" ")), count))
}

fn parse_image(html: &str, image_page: &Url) -> Result<Url, ResolutionError> {
    let document = Html::parse_document(html);
    let image = document
        .select(&IMAGE)
        .next()
        .ok_or_else(|| ResolutionError::missing_element(image_page.as_str(), IMAGE_CSS))?;
    attr_url(image, "src", image_page)
}
