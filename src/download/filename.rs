//! File name sanitization and destination path construction.

use std::path::{Path, PathBuf};

use url::Url;

use super::error::TransferError;

/// Removes characters that are invalid in file names on common filesystems.
///
/// Strips `/ \ : * ? " < > |` and control characters. The result may be empty.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect()
}

/// Builds the folder a gallery is downloaded into: `root/<sanitized title>`.
#[must_use]
pub fn comic_directory(root: &Path, title: &str) -> PathBuf {
    root.join(sanitize_file_name(title.trim()))
}

/// Computes where a file downloaded from `download_uri` is written.
///
/// The name is `hint` when given, otherwise the last path segment of the URI
/// without its extension. The extension always comes from the URI path; query
/// strings and fragments never contribute.
///
/// # Errors
///
/// Returns [`TransferError::InvalidUrl`] when no usable name can be derived.
pub fn destination_path(
    directory: &Path,
    download_uri: &Url,
    hint: Option<&str>,
) -> Result<PathBuf, TransferError> {
    let segment = last_path_segment(download_uri).unwrap_or_default();
    let segment_path = Path::new(&segment);

    let extension = segment_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let name = match hint {
        Some(hint) => sanitize_file_name(hint),
        None => segment_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .unwrap_or_default(),
    };

    if name.is_empty() {
        return Err(TransferError::invalid_url(download_uri.as_str()));
    }

    let name = if matches!(name.as_str(), "." | "..") {
        name.replace('.', "_")
    } else {
        name
    };

    Ok(directory.join(format!("{name}{extension}")))
}

/// Last non-empty path segment, percent-decoded and sanitized.
fn last_path_segment(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    Some(sanitize_file_name(&decoded))
}
