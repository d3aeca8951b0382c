use std::io;

use thiserror::Error;

/// Blocks the runtime until it should stop.
pub trait ShutdownSignal {
    /// Returns once shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The platform has no termination signals to wait on.
    #[error("shutdown signals are not supported on this platform")]
    Unsupported,
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
        use signal_hook::iterator::Signals;
        use tracing::info;

        use super::PROCESS_TARGET;

        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            );
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        Err(ShutdownError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(unix))]
    #[test]
    fn reports_missing_signal_support() {
        let error = SystemShutdownSignal::new()
            .wait()
            .expect_err("no signals to wait on");
        assert!(matches!(error, ShutdownError::Unsupported));
    }

    #[test]
    fn unsupported_platforms_name_the_problem() {
        assert_eq!(
            ShutdownError::Unsupported.to_string(),
            "shutdown signals are not supported on this platform"
        );
    }
}
