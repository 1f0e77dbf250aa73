//! Two-stage batch pipeline: resolve pages into descriptors, transfer them.
//!
//! Stage 1 runs one resolution task per distinct page URI. Each task looks
//! up the provider for the page's host, reports the provider's item count to
//! the [`ProgressTracker`], and lets the provider emit
//! [`ResourceDescriptor`]s into a shared unbounded channel.
//!
//! Stage 2 is a single consumer draining that channel. For every descriptor
//! it acquires a semaphore permit and spawns a transfer task, so at most
//! `max_concurrent_transfers` files are in flight. The channel closes when
//! every resolution task has dropped its sender; the consumer then waits for
//! the outstanding transfers and the batch returns its [`ErrorReport`].
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
//! let registry = ProviderRegistry::with_defaults(client.clone(), None);
//! let downloader = Downloader::new(client, registry, 10)?;
//! let pages = vec![url::Url::parse("https://vercomicsporno.com/some-comic/")?];
//! let report = downloader.download_all(&pages, Path::new("./downloads")).await;
//! for (page, messages) in report.iter() {
//!     eprintln!("{page}: {} error(s)", messages.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::MIN_CONCURRENCY;
use super::descriptor::ResourceDescriptor;
use super::filename::destination_path;
use super::progress::{ProgressReport, ProgressTracker};
use super::report::{ErrorReport, ErrorSink};
use super::{HttpClient, TransferError};
use crate::provider::{DescriptorSink, ProviderRegistry, ResolutionError, UriProvider};

/// Error type for invalid downloader construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Concurrency limit outside the accepted range.
    #[error("invalid concurrency value {value}: must be at least {MIN_CONCURRENCY}")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },
}

/// Counters for one batch, captured after every transfer has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Descriptors taken off the channel.
    pub dequeued: usize,
    /// Transfers that wrote their file.
    pub succeeded: usize,
    /// Transfers that ended with an error (including panics).
    pub failed: usize,
    /// Highest number of transfers observed running at once.
    pub peak_in_flight: usize,
}

/// Error report plus transfer counters for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Errors keyed by page URI.
    pub report: ErrorReport,
    /// Transfer counters.
    pub stats: BatchStats,
}

/// Live counters shared by transfer tasks.
#[derive(Debug, Default)]
struct TransferCounters {
    dequeued: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl TransferCounters {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { counters: self }
    }

    fn stats(&self) -> BatchStats {
        BatchStats {
            dequeued: self.dequeued.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }
}

/// Decrements the in-flight count when a transfer ends, even on panic.
struct InFlightGuard<'a> {
    counters: &'a TransferCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State shared by the consumer loop and every transfer task of a batch.
struct TransferContext {
    client: HttpClient,
    progress: Arc<ProgressTracker>,
    errors: Arc<ErrorSink>,
    counters: TransferCounters,
    semaphore: Arc<Semaphore>,
    output_root: PathBuf,
}

/// Batch orchestrator.
///
/// One `Downloader` may run many batches over its lifetime, but batches are
/// serialized: a second `download_all` call waits for the first to finish,
/// because progress counters are reset at the start of each batch.
///
/// # Concurrency Model
///
/// - Each page URI resolves in its own Tokio task
/// - Each descriptor transfers in its own Tokio task
/// - A semaphore permit is acquired before a transfer task is spawned
/// - Permits are released when the transfer task ends (RAII)
pub struct Downloader {
    client: HttpClient,
    registry: Arc<ProviderRegistry>,
    concurrency: usize,
    progress: Arc<ProgressTracker>,
    batch: Mutex<()>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("concurrency", &self.concurrency)
            .field("hosts", &self.registry.hosts())
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader over `registry` with at most
    /// `max_concurrent_transfers` transfers in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConcurrency`] if the value is 0.
    #[instrument(level = "debug", skip(client, registry))]
    pub fn new(
        client: HttpClient,
        registry: ProviderRegistry,
        max_concurrent_transfers: usize,
    ) -> Result<Self, ConfigurationError> {
        if max_concurrent_transfers < MIN_CONCURRENCY {
            return Err(ConfigurationError::InvalidConcurrency {
                value: max_concurrent_transfers,
            });
        }

        debug!(
            concurrency = max_concurrent_transfers,
            providers = registry.len(),
            "creating downloader"
        );

        Ok(Self {
            client,
            registry: Arc::new(registry),
            concurrency: max_concurrent_transfers,
            progress: Arc::new(ProgressTracker::new()),
            batch: Mutex::new(()),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Subscribes to progress reports for this and every later batch.
    pub fn subscribe(&self) -> UnboundedReceiver<ProgressReport> {
        self.progress.subscribe()
    }

    /// Returns the progress counters of the current or last batch.
    #[must_use]
    pub fn progress(&self) -> ProgressReport {
        self.progress.snapshot()
    }

    /// Downloads every resource reachable from `page_uris` into `output_root`.
    ///
    /// Never fails: every per-page and per-file failure ends up in the
    /// returned report, keyed by the page URI it belongs to.
    pub async fn download_all(&self, page_uris: &[Url], output_root: &Path) -> ErrorReport {
        self.download_all_with_stats(page_uris, output_root)
            .await
            .report
    }

    /// Like [`download_all`](Self::download_all), also returning transfer counters.
    #[instrument(skip(self, page_uris), fields(pages = page_uris.len(), output_root = %output_root.display()))]
    pub async fn download_all_with_stats(
        &self,
        page_uris: &[Url],
        output_root: &Path,
    ) -> BatchOutcome {
        let _batch = self.batch.lock().await;
        self.progress.reset();

        let pages: BTreeSet<&Url> = page_uris.iter().collect();
        if pages.len() < page_uris.len() {
            debug!(
                duplicates = page_uris.len() - pages.len(),
                "ignoring duplicate page URIs"
            );
        }

        if let Err(e) = tokio::fs::create_dir_all(output_root).await {
            warn!(output_root = %output_root.display(), error = %e, "failed to create output root");
        }

        info!(pages = pages.len(), concurrency = self.concurrency, "starting batch");

        let errors = Arc::new(ErrorSink::new());
        let context = Arc::new(TransferContext {
            client: self.client.clone(),
            progress: Arc::clone(&self.progress),
            errors: Arc::clone(&errors),
            counters: TransferCounters::default(),
            semaphore: Arc::new(Semaphore::new(self.concurrency)),
            output_root: output_root.to_path_buf(),
        });

        let (sink, receiver) = DescriptorSink::unbounded();
        let consumer = tokio::spawn(consume_descriptors(receiver, Arc::clone(&context)));

        let mut resolutions = JoinSet::new();
        let mut pages_by_task = HashMap::new();
        for page in pages {
            let handle = resolutions.spawn(resolve_page(
                page.clone(),
                Arc::clone(&self.registry),
                Arc::clone(&self.progress),
                Arc::clone(&errors),
                sink.clone(),
                output_root.to_path_buf(),
            ));
            pages_by_task.insert(handle.id(), page.clone());
        }
        // Consumer sees end-of-stream once every resolution task drops its clone.
        drop(sink);

        while let Some(joined) = resolutions.join_next_with_id().await {
            if let Err(e) = joined {
                record_panic(&errors, pages_by_task.get(&e.id()), &e, "resolution");
            }
        }
        debug!("resolution stage finished");

        if let Err(e) = consumer.await {
            warn!(error = %e, "transfer consumer ended abnormally");
        }

        let stats = context.counters.stats();
        let report = errors.snapshot();
        info!(
            dequeued = stats.dequeued,
            succeeded = stats.succeeded,
            failed = stats.failed,
            pages_with_errors = report.len(),
            "batch finished"
        );

        BatchOutcome { report, stats }
    }
}

/// Stage 1 for one page: count, then emit descriptors.
#[instrument(level = "debug", skip_all, fields(page = %page))]
async fn resolve_page(
    page: Url,
    registry: Arc<ProviderRegistry>,
    progress: Arc<ProgressTracker>,
    errors: Arc<ErrorSink>,
    sink: DescriptorSink,
    output_root: PathBuf,
) {
    let host = page.host_str().unwrap_or_default();
    let Some(provider) = registry.resolve(host) else {
        let error = ResolutionError::unsupported_host(page.as_str(), host);
        warn!(error = %error, "no provider for page");
        errors.record(&page, error.to_string());
        return;
    };

    if let Err(error) = resolve_with(provider.as_ref(), &page, &progress, &sink, &output_root).await
    {
        warn!(provider = provider.name(), error = %error, "page resolution failed");
        errors.record(&page, error.to_string());
    }
}

async fn resolve_with(
    provider: &dyn UriProvider,
    page: &Url,
    progress: &ProgressTracker,
    sink: &DescriptorSink,
    output_root: &Path,
) -> Result<(), ResolutionError> {
    let count = provider.number_of_items(page).await?;
    debug!(provider = provider.name(), count, "item count resolved");
    progress.record_total(count);
    provider.get_uris(page, output_root, sink).await
}

/// Stage 2: drain the channel, one transfer task per descriptor.
async fn consume_descriptors(
    mut receiver: UnboundedReceiver<ResourceDescriptor>,
    context: Arc<TransferContext>,
) {
    let mut transfers = JoinSet::new();
    let mut pages_by_task = HashMap::new();

    while let Some(descriptor) = receiver.recv().await {
        context.counters.dequeued.fetch_add(1, Ordering::SeqCst);
        debug!(url = %descriptor.download_uri(), "dequeued descriptor");

        // Blocks while max_concurrent_transfers transfers are running.
        let Ok(permit) = Arc::clone(&context.semaphore).acquire_owned().await else {
            context.errors.record(
                descriptor.source_page(),
                format!("transfer of {} was never started", descriptor.download_uri()),
            );
            context.counters.failed.fetch_add(1, Ordering::SeqCst);
            context.progress.record_completion();
            continue;
        };

        let page = descriptor.source_page().clone();
        let task_context = Arc::clone(&context);
        let handle = transfers.spawn(async move {
            let _permit = permit;
            run_transfer(&task_context, descriptor).await;
        });
        pages_by_task.insert(handle.id(), page);
    }

    debug!("descriptor channel closed, waiting for transfers");

    while let Some(joined) = transfers.join_next_with_id().await {
        if let Err(e) = joined {
            record_panic(&context.errors, pages_by_task.get(&e.id()), &e, "transfer");
            context.counters.failed.fetch_add(1, Ordering::SeqCst);
            context.progress.record_completion();
        }
    }
}

async fn run_transfer(context: &TransferContext, descriptor: ResourceDescriptor) {
    let _in_flight = context.counters.enter();

    match transfer_file(&context.client, &descriptor, &context.output_root).await {
        Ok(path) => {
            info!(url = %descriptor.download_uri(), path = %path.display(), "download completed");
            context.counters.succeeded.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            warn!(
                page = %descriptor.source_page(),
                url = %descriptor.download_uri(),
                error = %e,
                "download failed"
            );
            context.counters.failed.fetch_add(1, Ordering::SeqCst);
            context.errors.record(descriptor.source_page(), e.to_string());
        }
    }

    context.progress.record_completion();
}

async fn transfer_file(
    client: &HttpClient,
    descriptor: &ResourceDescriptor,
    output_root: &Path,
) -> Result<PathBuf, TransferError> {
    let directory = descriptor.directory_or(output_root);
    let path = destination_path(
        directory,
        descriptor.download_uri(),
        descriptor.file_name_hint(),
    )?;

    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|e| TransferError::io(directory, e))?;

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        warn!(path = %path.display(), "overwriting existing file");
    }

    client
        .download_to_path(descriptor.download_uri(), &path, descriptor.deadline())
        .await?;
    Ok(path)
}

fn record_panic(errors: &ErrorSink, page: Option<&Url>, error: &JoinError, stage: &str) {
    warn!(stage, error = %error, "task ended abnormally");
    if let Some(page) = page {
        errors.record(page, format!("{stage} task ended abnormally: {error}"));
    }
}
