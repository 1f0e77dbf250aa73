//! Media Downloader Library
//!
//! Turns a list of gallery or media page URIs into files on disk. Each page
//! is handed to the provider registered for its host, which discovers the
//! files the page references; the discovered files are then downloaded with
//! a bounded number of concurrent transfers.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`provider`] - Host-specific page resolution and the provider registry
//! - [`download`] - Batch orchestration, streaming transfers, progress and error reporting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod provider;
mod user_agent;

// Re-export commonly used types
pub use download::{
    BatchOutcome, BatchStats, ConfigurationError, DEFAULT_CONCURRENCY, Downloader, ErrorReport,
    HttpClient, ProgressReport, ResourceDescriptor, TransferError,
};
pub use provider::{DescriptorSink, PageRenderer, ProviderRegistry, ResolutionError, UriProvider};
