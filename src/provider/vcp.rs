//! Provider for `vercomicsporno.com` comic pages.
//!
//! Every image of a comic is linked from the comic page itself, so the whole
//! comic is resolved from one fetch and released as a single batch.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::html::{attr_url, compile_static_selector, first_text};
use super::{DescriptorSink, ResolutionError, UriProvider};
use crate::download::filename::comic_directory;
use crate::download::{HttpClient, ResourceDescriptor};

const IMAGES_CSS: &str = "div.wp-content img";
const TITLE_CSS: &str = "h1.titl";

static IMAGES: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGES_CSS));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(TITLE_CSS));

/// Comic provider for `vercomicsporno.com`.
#[derive(Debug, Clone)]
pub struct VcpProvider {
    client: HttpClient,
}

impl VcpProvider {
    /// Host this provider is registered under.
    pub const HOST: &'static str = "vercomicsporno.com";

    /// Creates a provider fetching pages through `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UriProvider for VcpProvider {
    fn name(&self) -> &str {
        "vcp"
    }

    #[instrument(level = "debug", skip(self), fields(page = %page))]
    async fn number_of_items(&self, page: &Url) -> Result<usize, ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        Ok(Html::parse_document(&html).select(&IMAGES).count())
    }

    #[instrument(level = "debug", skip(self, output_root, sink), fields(page = %page))]
    async fn get_uris(
        &self,
        page: &Url,
        output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        let batch = parse_comic(&html, page, output_root)?;
        debug!(images = batch.len(), "releasing comic batch");
        sink.send_all(batch)
    }
}

/// Builds every descriptor of the comic before any is released.
fn parse_comic(
    html: &str,
    page: &Url,
    output_root: &Path,
) -> Result<Vec<ResourceDescriptor>, ResolutionError> {
    let document = Html::parse_document(html);
    let title = first_text(&document, &TITLE, TITLE_CSS, page)?;
    let directory = comic_directory(output_root, &title);

    document
        .select(&IMAGES)
        .enumerate()
        .map(|(index, image)| {
            let image_url = attr_url(image, "src", page)?;
            Ok(ResourceDescriptor::new(page.clone(), image_url)
                .with_output_directory(&directory)
                .with_file_name_hint(index))
        })
        .collect()
}
