//! Batch orchestration and streaming file transfers.
//!
//! This module owns the second half of the pipeline: taking the
//! [`ResourceDescriptor`]s emitted by providers and writing each resource to
//! disk under a bounded number of concurrent transfers.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large videos)
//! - Per-descriptor deadline, partial files removed on failure
//! - Progress reports delivered in one total order
//! - Errors collected per page instead of aborting the batch
//!
//! # Example
//!
//! ```no_run
//! use media_downloader::download::{Downloader, HttpClient};
//! use media_downloader::provider::ProviderRegistry;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let downloader = Downloader::new(
//!     client.clone(),
//!     ProviderRegistry::with_defaults(client, None),
//!     4,
//! )?;
//! let mut progress = downloader.subscribe();
//! tokio::spawn(async move {
//!     while let Some(report) = progress.recv().await {
//!         println!("{}/{}", report.current_count, report.total_count);
//!     }
//! });
//! let pages = vec![url::Url::parse("https://nhentai.net/g/1/")?];
//! let report = downloader.download_all(&pages, Path::new("./downloads")).await;
//! assert!(report.is_empty());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod descriptor;
mod engine;
mod error;
pub mod filename;
mod progress;
mod report;

pub use client::HttpClient;
pub use constants::{DEFAULT_CONCURRENCY, DEFAULT_FILE_DEADLINE, SHORT_FILE_DEADLINE};
pub use descriptor::ResourceDescriptor;
pub use engine::{BatchOutcome, BatchStats, ConfigurationError, Downloader};
pub use error::TransferError;
pub use progress::{ProgressReport, ProgressTracker};
pub use report::{ErrorReport, ErrorSink};
