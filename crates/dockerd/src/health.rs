//! Structured reporting for launcher lifecycle events.

use std::sync::Arc;

use dockerd_config::ExecutionMode;

use crate::command::DaemonOptions;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface launch events to telemetry sinks.
///
/// Failures are not reported here: the executor prints them to standard
/// error, and logging them as well would duplicate the line on terminals.
pub trait LaunchReporter: Send + Sync {
    /// Invoked once the execution mode is known and logging is available.
    fn mode_detected(&self, mode: ExecutionMode);

    /// Invoked after the command description has been assembled.
    fn command_built(&self, flag_count: usize);

    /// Invoked before control passes to the daemon runtime.
    fn daemon_starting(&self, options: &DaemonOptions);

    /// Invoked when the daemon runtime returns successfully.
    fn daemon_stopped(&self);
}

impl<T> LaunchReporter for Arc<T>
where
    T: LaunchReporter + ?Sized,
{
    fn mode_detected(&self, mode: ExecutionMode) {
        (**self).mode_detected(mode);
    }

    fn command_built(&self, flag_count: usize) {
        (**self).command_built(flag_count);
    }

    fn daemon_starting(&self, options: &DaemonOptions) {
        (**self).daemon_starting(options);
    }

    fn daemon_stopped(&self) {
        (**self).daemon_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLaunchReporter;

impl StructuredLaunchReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LaunchReporter for StructuredLaunchReporter {
    fn mode_detected(&self, mode: ExecutionMode) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "mode_detected",
            mode = %mode,
            "execution mode detected"
        );
    }

    fn command_built(&self, flag_count: usize) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "command_built",
            flags = flag_count,
            "daemon command assembled"
        );
    }

    fn daemon_starting(&self, options: &DaemonOptions) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "daemon_starting",
            config_file = %options.config_file().display(),
            explicit_flags = options.flags().explicit().len(),
            "starting daemon"
        );
    }

    fn daemon_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "daemon_stopped",
            "daemon shut down"
        );
    }
}
