//! Provider for `vermangasporno.com` manga pages.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;
use url::Url;

use super::html::{absolute_url, compile_static_selector, first_text};
use super::{DescriptorSink, ResolutionError, UriProvider};
use crate::download::filename::comic_directory;
use crate::download::{HttpClient, ResourceDescriptor, SHORT_FILE_DEADLINE};

const IMAGES_CSS: &str = "div.comicimg img";
const TITLE_CSS: &str = "div.comicimg p";

static IMAGES: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGES_CSS));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(TITLE_CSS));

/// Manga provider for `vermangasporno.com`.
///
/// Lazy-loaded placeholders (anything whose `src` is not an absolute
/// `http` URL) are skipped. Image links on this host expire quickly, so
/// descriptors carry the short deadline.
#[derive(Debug, Clone)]
pub struct VmpProvider {
    client: HttpClient,
}

impl VmpProvider {
    /// Host this provider is registered under.
    pub const HOST: &'static str = "vermangasporno.com";

    /// Creates a provider fetching pages through `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UriProvider for VmpProvider {
    fn name(&self) -> &str {
        "vmp"
    }

    #[instrument(level = "debug", skip(self), fields(page = %page))]
    async fn number_of_items(&self, page: &Url) -> Result<usize, ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        let document = Html::parse_document(&html);
        Ok(real_images(&document).count())
    }

    #[instrument(level = "debug", skip(self, output_root, sink), fields(page = %page))]
    async fn get_uris(
        &self,
        page: &Url,
        output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        let (directory, images) = parse_manga(&html, page, output_root)?;

        for (index, image_url) in images.into_iter().enumerate() {
            sink.send(
                ResourceDescriptor::new(page.clone(), image_url)
                    .with_output_directory(&directory)
                    .with_file_name_hint(index)
                    .with_deadline(SHORT_FILE_DEADLINE),
            )?;
        }
        Ok(())
    }
}

fn real_images(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.select(&IMAGES).filter(|image| {
        image
            .value()
            .attr("src")
            .is_some_and(|src| src.trim_start().starts_with("http"))
    })
}

fn parse_manga(
    html: &str,
    page: &Url,
    output_root: &Path,
) -> Result<(std::path::PathBuf, Vec<Url>), ResolutionError> {
    let document = Html::parse_document(html);
    let title = first_text(&document, &TITLE, TITLE_CSS, page)?;
    let images = real_images(&document)
        .filter_map(|image| image.value().attr("src"))
        .map(|src| absolute_url(src, page))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((comic_directory(output_root, &title), images))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const MANGA: &str = r#"
        <div class="comicimg">
          <p>Night Shift</p>
          <img src="data:image/gif;base64,R0lGOD">
          <img src="https://img.example/1.jpg">
          <img src="/relative/skip.jpg">
          <img src="https://img.example/2.webp">
        </div>
    "#;

    #[test]
    fn test_parse_manga_skips_placeholders() {
        let page = Url::parse("https://vermangasporno.com/night/").unwrap();
        let (directory, images) = parse_manga(MANGA, &page, Path::new("/out")).unwrap();
        assert_eq!(directory, Path::new("/out/Night Shift"));
        let urls: Vec<&str> = images.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://img.example/1.jpg", "https://img.example/2.webp"]);
    }

    #[tokio::test]
    async fn test_provider_streams_short_deadline_descriptors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/night/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MANGA))
            .mount(&server)
            .await;

        let page = Url::parse(&format!("{}/night/", server.uri())).unwrap();
        let provider = VmpProvider::new(HttpClient::new());
        assert_eq!(provider.number_of_items(&page).await.unwrap(), 2);

        let (sink, mut receiver) = DescriptorSink::unbounded();
        provider.get_uris(&page, Path::new("/out"), &sink).await.unwrap();
        drop(sink);

        let mut received = Vec::new();
        while let Some(descriptor) = receiver.recv().await {
            assert_eq!(descriptor.deadline(), SHORT_FILE_DEADLINE);
            received.push(descriptor);
        }
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].file_name_hint(), Some("1"));
    }

    #[tokio::test]
    async fn test_provider_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let page = Url::parse(&format!("{}/gone/", server.uri())).unwrap();
        let err = VmpProvider::new(HttpClient::new())
            .number_of_items(&page)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::HttpStatus { status: 503, .. }));
    }
}
