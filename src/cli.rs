//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download every image or video referenced by gallery and media pages.
///
/// Page URLs are read from the arguments, or one per line from stdin when
/// no argument is given.
#[derive(Parser, Debug)]
#[command(name = "media-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Page URLs to download from
    pub urls: Vec<String>,

    /// Directory downloads are written under [default: current directory]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent file transfers (1-100) [default: 10]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// HTTP connect timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds (1-3600) [default: 300]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["media-downloader"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.concurrency.is_none());
        assert!(args.output_dir.is_none());
    }

    #[test]
    fn test_cli_positional_urls() {
        let args = Args::try_parse_from([
            "media-downloader",
            "https://nhentai.net/g/1/",
            "https://e-hentai.org/g/2/abc/",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 2);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["media-downloader", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["media-downloader", "-c", "100"]).unwrap();
        assert_eq!(args.concurrency, Some(100));

        let err = Args::try_parse_from(["media-downloader", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["media-downloader", "--concurrency", "101"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_output_and_timeouts() {
        let args = Args::try_parse_from([
            "media-downloader",
            "-o",
            "/tmp/comics",
            "--connect-timeout",
            "5",
            "--read-timeout",
            "60",
        ])
        .unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/comics")));
        assert_eq!(args.connect_timeout, Some(5));
        assert_eq!(args.read_timeout, Some(60));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["media-downloader", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["media-downloader", "--rate-limit", "5"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
