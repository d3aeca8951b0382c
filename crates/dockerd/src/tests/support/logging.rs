//! Logging bootstrap double that counts installs instead of touching globals.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::telemetry::{LoggingBootstrap, StdStreams, TelemetryError};

/// Counts install calls; optionally fails them.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogging {
    installs: Arc<AtomicUsize>,
    failure: Option<String>,
}

impl RecordingLogging {
    /// A bootstrap whose installs fail with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            installs: Arc::default(),
            failure: Some(message.to_owned()),
        }
    }

    /// Number of install attempts so far.
    #[must_use]
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl LoggingBootstrap for RecordingLogging {
    fn install(&self, _streams: &StdStreams) -> Result<(), TelemetryError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(TelemetryError::Filter(message.clone())),
            None => Ok(()),
        }
    }
}
