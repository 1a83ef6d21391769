#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `org_map` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! status lines print above the progress bar instead of through it, and
//! [`IndicatifProgress`] renders a batch run's [`ProgressCallback`] updates.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use org_map_ingest::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `begin()` provides the row count.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a bar for a geocoding run.
    ///
    /// Starts as a spinner while the extract loads and becomes a full bar
    /// with ETA once [`ProgressCallback::begin()`] reports the row count.
    #[must_use]
    pub fn rows_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn begin(&self, total: u64, resume_at: u64) {
        self.bar.set_length(total);
        self.bar.set_position(resume_at);
        // ETA only counts rows processed by this run.
        self.bar.reset_eta();
        self.bar.set_style(self.bar_style.clone());
    }

    fn row_done(&self) {
        self.bar.inc(1);
    }

    fn status(&self, line: String) {
        self.bar.set_message(line);
    }

    fn finish(&self, summary: String) {
        self.bar.finish_with_message(summary);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// The level comes from `RUST_LOG`, defaulting to `info` so status lines
/// show without any setup. Returns the [`MultiProgress`] that every
/// progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    let logger = builder.parse_env("RUST_LOG").build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set in tests

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn resumed_runs_start_at_the_checkpoint_position() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = multi.add(ProgressBar::new_spinner());
        let progress = IndicatifProgress {
            bar: bar.clone(),
            bar_style: ProgressStyle::default_bar(),
        };

        progress.begin(10, 4);
        progress.row_done();
        progress.row_done();

        assert_eq!(bar.length(), Some(10));
        assert_eq!(bar.position(), 6);

        progress.finish("done".to_string());
        assert!(bar.is_finished());
    }
}
