//! Rootless/rootful execution mode detection.
//!
//! When the daemon runs under RootlessKit the system-wide directories are
//! unlikely to be accessible, so the XDG base directories become the
//! defaults. Running with `--rootless` outside RootlessKit still uses the
//! system-wide paths of the current mount namespace.

use once_cell::sync::OnceCell;
use strum::Display;

use crate::env::Environment;

/// Variable exported by RootlessKit to the supervised child.
pub const ROOTLESSKIT_STATE_DIR: &str = "ROOTLESSKIT_STATE_DIR";

/// Privilege mode the daemon runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionMode {
    /// Running with ordinary root privileges; system-wide paths apply.
    Rootful,
    /// Running under RootlessKit; user-scoped paths apply.
    Rootless,
}

impl ExecutionMode {
    /// Queries the environment for the RootlessKit marker.
    ///
    /// Prefer [`RootlessDetector::mode`], which guarantees the query runs
    /// once per detector.
    #[must_use]
    pub fn detect(env: &dyn Environment) -> Self {
        if cfg!(unix)
            && env
                .var_os(ROOTLESSKIT_STATE_DIR)
                .is_some_and(|value| !value.is_empty())
        {
            Self::Rootless
        } else {
            Self::Rootful
        }
    }

    /// Returns true for [`ExecutionMode::Rootless`].
    #[must_use]
    pub const fn is_rootless(self) -> bool {
        matches!(self, Self::Rootless)
    }
}

/// Write-once holder for the detected [`ExecutionMode`].
///
/// The first call to [`RootlessDetector::mode`] queries the environment;
/// every later call returns the cached value, even if the environment has
/// changed since.
#[derive(Debug, Default)]
pub struct RootlessDetector {
    mode: OnceCell<ExecutionMode>,
}

impl RootlessDetector {
    /// Builds a detector that has not queried the environment yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the execution mode, detecting it on first use.
    pub fn mode(&self, env: &dyn Environment) -> ExecutionMode {
        *self.mode.get_or_init(|| ExecutionMode::detect(env))
    }

    /// Returns the cached mode without querying the environment.
    #[must_use]
    pub fn get(&self) -> Option<ExecutionMode> {
        self.mode.get().copied()
    }
}
