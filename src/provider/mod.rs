//! Host-specific page resolution.
//!
//! A [`UriProvider`] knows how one host lays out its gallery or media pages.
//! Given a page URI it reports how many files the page holds and emits one
//! [`ResourceDescriptor`](crate::download::ResourceDescriptor) per file into
//! a [`DescriptorSink`]. The [`ProviderRegistry`] maps hosts to providers.
//!
//! # Architecture
//!
//! - [`UriProvider`] - Async trait each host implements
//! - [`ProviderRegistry`] - Host name to provider lookup
//! - [`DescriptorSink`] - Producer handle onto the batch's descriptor channel
//! - [`RequestGate`] - Bounded, jittered access to hosts that throttle clients
//! - [`PageRenderer`] - Seam for hosts that only work in a scripted browser
//!
//! # Example
//!
//! ```no_run
//! use media_downloader::download::HttpClient;
//! use media_downloader::provider::{DescriptorSink, ProviderRegistry};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProviderRegistry::with_defaults(HttpClient::new(), None);
//! let page = url::Url::parse("https://vercomicsporno.com/some-comic/")?;
//! let provider = registry.resolve("vercomicsporno.com").expect("registered");
//!
//! let (sink, mut descriptors) = DescriptorSink::unbounded();
//! let count = provider.number_of_items(&page).await?;
//! provider.get_uris(&page, Path::new("./downloads"), &sink).await?;
//! drop(sink);
//! while let Some(descriptor) = descriptors.recv().await {
//!     println!("{}", descriptor.download_uri());
//! }
//! println!("{count} files");
//! # Ok(())
//! # }
//! ```

mod ehentai;
mod error;
mod gate;
mod html;
mod newgrounds;
mod nhentai;
mod registry;
mod renderer;
mod sink;
mod vcp;
mod vmp;

pub use ehentai::EHentaiProvider;
pub use error::ResolutionError;
pub use gate::RequestGate;
pub use newgrounds::NewgroundsProvider;
pub use nhentai::NHentaiProvider;
pub use registry::ProviderRegistry;
pub use renderer::{PageRenderer, RenderedPage};
pub use sink::DescriptorSink;
pub use vcp::VcpProvider;
pub use vmp::VmpProvider;

use std::path::Path;

use async_trait::async_trait;
use url::Url;

/// Resolves pages of one host into resource descriptors.
///
/// Implementations are shared across concurrent resolution tasks, so both
/// methods take `&self` and must tolerate being called for many pages at once.
#[async_trait]
pub trait UriProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns how many files `page` will yield.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] if the page cannot be fetched or the count
    /// cannot be found in it.
    async fn number_of_items(&self, page: &Url) -> Result<usize, ResolutionError>;

    /// Emits one descriptor per file on `page` into `sink`.
    ///
    /// `output_root` is the batch output root; providers that group files
    /// per gallery create their directory beneath it. Descriptors may be
    /// emitted as they are discovered or in batches, and remain valid even
    /// if this call later fails.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] on any fetch, parse, or render failure.
    async fn get_uris(
        &self,
        page: &Url,
        output_root: &Path,
        sink: &DescriptorSink,
    ) -> Result<(), ResolutionError>;
}
