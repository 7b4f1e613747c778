use super::cancel::CancellationToken;
use super::config::DockingConfig;
use super::error::EngineError;
use super::progress::ProgressReporter;

/// Everything a step of one target's run needs besides its tools.
#[derive(Clone, Copy)]
pub struct TargetContext<'a> {
    pub config: &'a DockingConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub cancel: &'a CancellationToken,
}

impl<'a> TargetContext<'a> {
    pub fn new(
        config: &'a DockingConfig,
        reporter: &'a ProgressReporter<'a>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            reporter,
            cancel,
        }
    }

    /// Fails with [`EngineError::Cancelled`] once the caller has cancelled.
    pub fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
