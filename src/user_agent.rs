//! User-Agent string shared by page fetches and file transfers.

/// Default User-Agent for every request made by the crate.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("media-downloader/{version}")
}
