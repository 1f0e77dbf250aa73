//! Per-page error collection.
//!
//! [`ErrorSink`] is written concurrently by resolution tasks and transfer
//! workers during a batch. Once every task has finished, the orchestrator
//! freezes it into an [`ErrorReport`].

use std::collections::BTreeMap;

use dashmap::DashMap;
use url::Url;

/// Concurrent, append-only collector of error messages keyed by page URI.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: DashMap<Url, Vec<String>>,
}

impl ErrorSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to the errors recorded for `page`.
    pub fn record(&self, page: &Url, message: impl Into<String>) {
        self.errors
            .entry(page.clone())
            .or_default()
            .push(message.into());
    }

    /// Copies the collected errors into an immutable report.
    #[must_use]
    pub fn snapshot(&self) -> ErrorReport {
        let errors = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        ErrorReport { errors }
    }
}

/// Immutable result of a batch: page URI to the messages recorded for it.
///
/// A page absent from the report had no errors. Message order within a page
/// carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    errors: BTreeMap<Url, Vec<String>>,
}

impl ErrorReport {
    /// Returns true when no page recorded an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of pages with at least one error.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Total number of messages across all pages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Messages recorded for `page`, if any.
    #[must_use]
    pub fn get(&self, page: &Url) -> Option<&[String]> {
        self.errors.get(page).map(Vec::as_slice)
    }

    /// Iterates pages and their messages in URI order.
    pub fn iter(&self) -> impl Iterator<Item = (&Url, &[String])> {
        self.errors.iter().map(|(page, messages)| (page, messages.as_slice()))
    }

    /// Consumes the report, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<Url, Vec<String>> {
        self.errors
    }
}
