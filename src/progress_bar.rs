//! Terminal progress bar fed by the downloader's progress reports.

use indicatif::{ProgressBar, ProgressStyle};
use media_downloader::ProgressReport;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Renders reports until the sender side goes away.
///
/// Returns `None` when the bar is disabled; the receiver is dropped, which
/// unsubscribes it.
pub(crate) fn spawn_progress_bar(
    enabled: bool,
    mut reports: UnboundedReceiver<ProgressReport>,
) -> Option<JoinHandle<()>> {
    if !enabled {
        return None;
    }

    Some(tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        while let Some(report) = reports.recv().await {
            apply(&bar, report);
        }
        bar.finish_and_clear();
    }))
}

fn apply(bar: &ProgressBar, report: ProgressReport) {
    // Totals arrive while transfers are already completing.
    let total = report.total_count.max(report.current_count);
    bar.set_length(total as u64);
    bar.set_position(report.current_count as u64);
}
