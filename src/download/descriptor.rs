//! The unit of work passed from providers to transfer workers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::constants::DEFAULT_FILE_DEADLINE;

/// Describes one file to fetch.
///
/// Created by a provider while resolving a page, consumed exactly once by a
/// transfer worker. The only mutation after creation is defaulting the
/// output directory to the batch output root when the provider left it unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    source_page: Url,
    download_uri: Url,
    output_directory: Option<PathBuf>,
    file_name_hint: Option<String>,
    deadline: Duration,
}

impl ResourceDescriptor {
    /// Creates a descriptor with the default deadline and no directory or name override.
    #[must_use]
    pub fn new(source_page: Url, download_uri: Url) -> Self {
        Self {
            source_page,
            download_uri,
            output_directory: None,
            file_name_hint: None,
            deadline: DEFAULT_FILE_DEADLINE,
        }
    }

    /// Sets the directory the file is written to.
    #[must_use]
    pub fn with_output_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(directory.into());
        self
    }

    /// Sets the file name (without extension).
    #[must_use]
    pub fn with_file_name_hint(mut self, hint: impl ToString) -> Self {
        self.file_name_hint = Some(hint.to_string());
        self
    }

    /// Overrides the transfer deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The page this descriptor was discovered on. Errors are reported against it.
    #[must_use]
    pub fn source_page(&self) -> &Url {
        &self.source_page
    }

    /// The URI of the binary resource.
    #[must_use]
    pub fn download_uri(&self) -> &Url {
        &self.download_uri
    }

    /// The explicit output directory, if the provider set one.
    #[must_use]
    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }

    /// The file name override, if any.
    #[must_use]
    pub fn file_name_hint(&self) -> Option<&str> {
        self.file_name_hint.as_deref()
    }

    /// Time after which the transfer is abandoned.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Directory the file is written to: its own, else the batch `root`.
    #[must_use]
    pub fn directory_or<'a>(&'a self, root: &'a Path) -> &'a Path {
        self.output_directory.as_deref().unwrap_or(root)
    }
}
