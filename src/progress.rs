#![warn(missing_docs)]
//! Progress reporting of long running calculations
use log::info;

/// Observer of the progress of a hybrid calculation.
///
/// The observer is called synchronously between the calculation stages.
pub trait ProgressObserver {
    /// Report the progress in percent together with a short description of the current stage.
    fn progress(&self, percent: u8, message: &str);
}

/// Progress observer reporting through the log facade (level `info`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn progress(&self, percent: u8, message: &str) {
        info!("{:>3}% {message}", percent.min(100));
    }
}

/// Progress observer ignoring all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn progress(&self, _percent: u8, _message: &str) {}
}
