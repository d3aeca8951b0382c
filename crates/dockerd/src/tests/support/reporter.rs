//! Test double for [`LaunchReporter`] that records lifecycle events for assertions.

use std::sync::Mutex;

use dockerd_config::ExecutionMode;

use crate::command::DaemonOptions;
use crate::health::LaunchReporter;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    /// The execution mode was detected.
    ModeDetected(ExecutionMode),
    /// The command was assembled with this many flags.
    CommandBuilt(usize),
    /// The runtime was about to start with these explicit flags.
    DaemonStarting(Vec<String>),
    /// The runtime returned successfully.
    DaemonStopped,
}

/// Records launch events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLaunchReporter {
    events: Mutex<Vec<LaunchEvent>>,
}

impl RecordingLaunchReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LaunchEvent> {
        self.events
            .lock()
            .expect("launch reporter mutex poisoned")
            .clone()
    }

    /// Returns true when a command was assembled.
    #[must_use]
    pub fn command_was_built(&self) -> bool {
        self.events()
            .iter()
            .any(|event| matches!(event, LaunchEvent::CommandBuilt(_)))
    }

    fn record(&self, event: LaunchEvent) {
        self.events
            .lock()
            .expect("launch reporter mutex poisoned")
            .push(event);
    }
}

impl LaunchReporter for RecordingLaunchReporter {
    fn mode_detected(&self, mode: ExecutionMode) {
        self.record(LaunchEvent::ModeDetected(mode));
    }

    fn command_built(&self, flag_count: usize) {
        self.record(LaunchEvent::CommandBuilt(flag_count));
    }

    fn daemon_starting(&self, options: &DaemonOptions) {
        let explicit = options.flags().explicit().iter().cloned().collect();
        self.record(LaunchEvent::DaemonStarting(explicit));
    }

    fn daemon_stopped(&self) {
        self.record(LaunchEvent::DaemonStopped);
    }
}
