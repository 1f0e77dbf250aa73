//! Provider for `e-hentai.org` galleries.
//!
//! A gallery is split over several index pages. Each index page links to one
//! detail page per image, and only the detail page carries the image URL.
//! Detail pages of one index page are fetched concurrently, and the
//! resulting descriptors are released together in thumbnail order.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::html::{attr_url, compile_static_selector, element_text, first_text, parse_count};
use super::{DescriptorSink, ResolutionError, UriProvider};
use crate::download::filename::comic_directory;
use crate::download::{HttpClient, ResourceDescriptor, SHORT_FILE_DEADLINE};

const LENGTH_LABEL_CSS: &str = "td.gdt1";
const TITLE_CSS: &str = "h1#gn";
const PAGER_CELLS_CSS: &str = "table.ptt td";
const DETAIL_LINKS_CSS: &str = "div#gdt a";
const IMAGE_CSS: &str = "img#img";

static LENGTH_LABEL: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(LENGTH_LABEL_CSS));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(TITLE_CSS));
static PAGER_CELLS: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(PAGER_CELLS_CSS));
static DETAIL_LINKS: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(DETAIL_LINKS_CSS));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(IMAGE_CSS));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));

/// Detail pages fetched at once while resolving one index page.
const DETAIL_FETCH_CONCURRENCY: usize = 4;

/// Gallery provider for `e-hentai.org`.
#[derive(Debug, Clone)]
pub struct EHentaiProvider {
    client: HttpClient,
}

/// What one index page contributes.
#[derive(Debug)]
struct IndexPage {
    detail_pages: Vec<Url>,
    next: Option<Url>,
}

impl EHentaiProvider {
    /// Host this provider is registered under.
    pub const HOST: &'static str = "e-hentai.org";

    /// Creates a provider fetching pages through `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn image_url(&self, detail_page: Url) -> Result<Url, ResolutionError> {
        let html = self.client.fetch_text(&detail_page).await?;
        let document = Html::parse_document(&html);
        let image = document
            .select(&IMAGE)
            .next()
            .ok_or_else(|| ResolutionError::missing_element(detail_page.as_str(), IMAGE_CSS))?;
        attr_url(image, "src", &detail_page)
    }
}

#[async_trait]
impl UriProvider for EHentaiProvider {
    fn name(&self) -> &str {
        "e-hentai"
    }

    #[instrument(level = "debug", skip(self), fields(page = %page))]
    async fn number_of_items(&self, page: &Url) -> Result<usize, ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        parse_length(&html, page)
    }

    #[instrument(level = "debug", skip(self, output_root, sink), fields(page = %page))]
    async fn get_uris(
        &self,
        page: &Url,
        output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError> {
        let html = self.client.fetch_text(page).await?;
        let (directory, index_pages) = parse_gallery(&html, page, output_root)?;
        let mut index = parse_index_page(&html, page)?;
        let mut image_count = 0;

        for index_page in 1..=index_pages {
            debug!(index_page, detail_pages = index.detail_pages.len(), "resolving index page");
            let detail_pages = std::mem::take(&mut index.detail_pages);
            let resolved: Vec<Result<Url, ResolutionError>> = stream::iter(detail_pages)
                .map(|detail_page| self.image_url(detail_page))
                .buffered(DETAIL_FETCH_CONCURRENCY)
                .collect()
                .await;

            let resolved_count = resolved.len();
            let mut batch = Vec::with_capacity(resolved_count);
            let mut first_error = None;
            for (offset, result) in resolved.into_iter().enumerate() {
                match result {
                    Ok(image_url) => batch.push(descriptor(
                        page,
                        image_url,
                        &directory,
                        image_count + offset,
                    )),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            image_count += resolved_count;
            sink.send_all(batch)?;
            if let Some(e) = first_error {
                return Err(e);
            }

            if index_page == index_pages {
                break;
            }
            let next = index.next.take().ok_or_else(|| {
                ResolutionError::missing_element(page.as_str(), "table.ptt td:last-child a")
            })?;
            let html = self.client.fetch_text(&next).await?;
            index = parse_index_page(&html, &next)?;
        }
        Ok(())
    }
}

fn descriptor(page: &Url, image_url: Url, directory: &Path, number: usize) -> ResourceDescriptor {
    ResourceDescriptor::new(page.clone(), image_url)
        .with_output_directory(directory)
        .with_file_name_hint(number)
        .with_deadline(SHORT_FILE_DEADLINE)
}

/// Reads the "Length:" row of the gallery metadata table.
fn parse_length(html: &str, page: &Url) -> Result<usize, ResolutionError> {
    let document = Html::parse_document(html);
    let value = document
        .select(&LENGTH_LABEL)
        .find(|label| element_text(*label) == "Length:")
        .and_then(|label| label.next_siblings().find_map(ElementRef::wrap))
        .map(element_text)
        .ok_or_else(|| ResolutionError::missing_element(page.as_str(), "td.gdt1 (Length:) + td.gdt2"))?;
    parse_count(&value, page)
}

/// Title directory and number of index pages.
fn parse_gallery(
    html: &str,
    page: &Url,
    output_root: &Path,
) -> Result<(PathBuf, usize), ResolutionError> {
    let document = Html::parse_document(html);
    let title = first_text(&document, &TITLE, TITLE_CSS, page)?;

    // Pager cells are "<", 1, 2, ..., n, ">"; the page count sits second to last.
    let cells: Vec<ElementRef<'_>> = document.select(&PAGER_CELLS).collect();
    let count_cell = cells
        .len()
        .checked_sub(2)
        .and_then(|i| cells.get(i))
        .ok_or_else(|| ResolutionError::missing_element(page.as_str(), PAGER_CELLS_CSS))?;
    let index_pages = parse_count(&element_text(*count_cell), page)?;

    Ok((comic_directory(output_root, &title), index_pages))
}

fn parse_index_page(html: &str, page: &Url) -> Result<IndexPage, ResolutionError> {
    let document = Html::parse_document(html);
    let detail_pages = document
        .select(&DETAIL_LINKS)
        .map(|link| attr_url(link, "href", page))
        .collect::<Result<Vec<_>, _>>()?;
    let next = document
        .select(&PAGER_CELLS)
        .last()
        .and_then(|cell| cell.select(&ANCHOR).next())
        .map(|link| attr_url(link, "href", page))
        .transpose()?;
    Ok(IndexPage { detail_pages, next })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn index_html(base: &str, title: &str, details: &[&str], next: Option<&str>) -> String {
        let links: String = details
            .iter()
            .map(|d| format!(r#"<div class="gdtm"><a href="{base}{d}"><img></a></div>"#))
            .collect();
        let next_cell = next.map_or_else(
            || "<td>&gt;</td>".to_string(),
            |n| format!(r#"<td><a href="{base}{n}">&gt;</a></td>"#),
        );
        format!(
            r#"<html><body>
              <h1 id="gn">{title}</h1>
              <table><tr><td class="gdt1">Posted:</td><td class="gdt2">2020-01-01</td></tr>
                     <tr><td class="gdt1">Length:</td><td class="gdt2">3 pages</td></tr></table>
              <table class="ptt"><tr><td>&lt;</td><td>1</td><td>2</td>{next_cell}</tr></table>
              <div id="gdt">{links}</div>
            </body></html>"#
        )
    }

    fn detail_html(src: &str) -> String {
        format!(r#"<html><body><div id="i3"><img id="img" src="{src}"></div></body></html>"#)
    }

    #[test]
    fn test_parse_length_reads_gdt2_sibling() {
        let html = index_html("https://e-hentai.org", "T", &[], None);
        let page = Url::parse("https://e-hentai.org/g/1/a/").unwrap();
        assert_eq!(parse_length(&html, &page).unwrap(), 3);
    }

    #[test]
    fn test_parse_length_missing_row() {
        let page = Url::parse("https://e-hentai.org/g/1/a/").unwrap();
        let err = parse_length("<table></table>", &page).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingElement { .. }));
    }

    #[test]
    fn test_parse_gallery_title_and_page_count() {
        let html = index_html("https://e-hentai.org", "My / Gallery", &[], Some("/g/1/a/?p=1"));
        let page = Url::parse("https://e-hentai.org/g/1/a/").unwrap();
        let (directory, pages) = parse_gallery(&html, &page, Path::new("/out")).unwrap();
        assert_eq!(directory, Path::new("/out/My  Gallery"));
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn test_provider_walks_index_pages_in_order() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/g/1/a/"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index_html(
                &base,
                "Gallery",
                &["/s/3"],
                None,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/g/1/a/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index_html(
                &base,
                "Gallery",
                &["/s/1", "/s/2"],
                Some("/g/1/a/?p=1"),
            )))
            .mount(&server)
            .await;
        for n in 1..=3 {
            Mock::given(method("GET"))
                .and(path(format!("/s/{n}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(detail_html(&format!("{base}/img/{n}.jpg"))),
                )
                .mount(&server)
                .await;
        }

        let page = Url::parse(&format!("{base}/g/1/a/")).unwrap();
        let provider = EHentaiProvider::new(HttpClient::new());
        assert_eq!(provider.number_of_items(&page).await.unwrap(), 3);

        let (sink, mut receiver) = DescriptorSink::unbounded();
        provider.get_uris(&page, Path::new("/out"), &sink).await.unwrap();
        drop(sink);

        let mut received = Vec::new();
        while let Some(descriptor) = receiver.recv().await {
            received.push((
                descriptor.file_name_hint().unwrap().to_string(),
                descriptor.download_uri().path().to_string(),
            ));
        }
        assert_eq!(
            received,
            vec![
                ("0".to_string(), "/img/1.jpg".to_string()),
                ("1".to_string(), "/img/2.jpg".to_string()),
                ("2".to_string(), "/img/3.jpg".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_releases_resolved_images_before_failing() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(method("GET"))
            .and(path("/g/2/b/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                index_html(&base, "Broken", &["/s/ok", "/s/bad"], None)
                    .replace("<td>2</td>", ""),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/ok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(detail_html(&format!("{base}/img/ok.jpg"))),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let page = Url::parse(&format!("{base}/g/2/b/")).unwrap();
        let (sink, mut receiver) = DescriptorSink::unbounded();
        let err = EHentaiProvider::new(HttpClient::new())
            .get_uris(&page, Path::new("/out"), &sink)
            .await
            .unwrap_err();
        drop(sink);

        assert!(matches!(err, ResolutionError::MissingElement { .. }));
        let first = receiver.recv().await.unwrap();
        assert_eq!(first.download_uri().path(), "/img/ok.jpg");
        assert!(receiver.recv().await.is_none());
    }
}
