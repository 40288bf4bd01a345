//! Progress reporting for split and restore.
//!
//! Pipelines receive a reporter as an explicit argument and call it once per completed stripe with the cumulative
//! number of original bytes processed so far and the object's total size.

/// Receives cumulative progress of a pipeline run.
pub trait ProgressReporter {
    fn report(&mut self, processed: u64, total: u64);
}

/// Discards every progress update.
#[derive(Default, Debug, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&mut self, _processed: u64, _total: u64) {}
}

impl<F: FnMut(u64, u64)> ProgressReporter for F {
    fn report(&mut self, processed: u64, total: u64) {
        self(processed, total)
    }
}
