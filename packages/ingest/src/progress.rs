//! Progress hooks for a batch run.
//!
//! [`BatchDriver`](crate::driver::BatchDriver) announces where a run starts,
//! each recorded row, its periodic status line, and how the run ended. The
//! CLI renders these with `indicatif`; headless runs use [`NullProgress`].

use std::sync::Arc;

/// Observer of one batch run.
pub trait ProgressCallback: Send + Sync {
    /// A run over `total` source rows is starting at row `resume_at`.
    ///
    /// `resume_at` is the checkpoint index (or skip offset), so a resumed
    /// run starts part-way through.
    fn begin(&self, total: u64, resume_at: u64);

    /// One more row was recorded, success or failure.
    fn row_done(&self);

    /// The latest status line (processed count and success rate).
    fn status(&self, line: String);

    /// The run ended; `summary` names the outcome and totals.
    fn finish(&self, summary: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn begin(&self, _total: u64, _resume_at: u64) {}
    fn row_done(&self) {}
    fn status(&self, _line: String) {}
    fn finish(&self, _summary: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
