//! Constants for the download module (timeouts, deadlines, concurrency bounds).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout: longest idle gap between reads (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Deadline applied to a descriptor when its provider does not set one.
pub const DEFAULT_FILE_DEADLINE: Duration = Duration::from_secs(10 * 60);

/// Deadline for hosts whose file links expire quickly.
pub const SHORT_FILE_DEADLINE: Duration = Duration::from_secs(90);

/// Minimum transfer concurrency accepted by [`Downloader`](super::Downloader).
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound accepted from the command line and config file.
pub const MAX_CONCURRENCY: usize = 100;

/// Default number of simultaneous transfers.
pub const DEFAULT_CONCURRENCY: usize = 10;
