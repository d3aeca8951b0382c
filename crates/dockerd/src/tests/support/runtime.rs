//! Runtime double that records invocations.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::command::DaemonOptions;
use crate::reexec::{ReexecError, ReexecRegistry};
use crate::runtime::{DaemonRuntime, RuntimeError};

#[derive(Debug, Default)]
struct RuntimeState {
    runs: usize,
    failure: Option<String>,
    helper: Option<(String, u8)>,
    last_options: Option<DaemonOptions>,
}

/// Counts runs, captures the options it was given, and optionally fails.
///
/// Clones share state so a scenario can inspect the runtime after handing a
/// copy to the launcher.
#[derive(Debug, Clone, Default)]
pub struct RecordingRuntime {
    state: Arc<Mutex<RuntimeState>>,
    helper_calls: Arc<AtomicUsize>,
}

impl RecordingRuntime {
    /// Makes every run fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.lock().failure = Some(message.to_owned());
    }

    /// Registers a helper under `name` that exits with `code`.
    pub fn provide_helper(&self, name: &str, code: u8) {
        self.lock().helper = Some((name.to_owned(), code));
    }

    /// Number of completed or failed runs.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.lock().runs
    }

    /// Number of helper invocations.
    #[must_use]
    pub fn helper_calls(&self) -> usize {
        self.helper_calls.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent run.
    #[must_use]
    pub fn last_options(&self) -> Option<DaemonOptions> {
        self.lock().last_options.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().expect("runtime state mutex poisoned")
    }
}

impl DaemonRuntime for RecordingRuntime {
    fn register_helpers(&self, registry: &mut ReexecRegistry) -> Result<(), ReexecError> {
        let Some((name, code)) = self.lock().helper.clone() else {
            return Ok(());
        };
        let calls = Arc::clone(&self.helper_calls);
        registry.register(name, move |_args| {
            calls.fetch_add(1, Ordering::SeqCst);
            ExitCode::from(code)
        })
    }

    fn run(&mut self, options: &DaemonOptions) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        state.runs += 1;
        state.last_options = Some(options.clone());
        match &state.failure {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}
