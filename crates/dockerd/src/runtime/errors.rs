//! Defines the error surface of the stock daemon runtime.

use std::io;
use std::path::PathBuf;

use dockerd_config::SocketPreparationError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

use super::config_file::ConfigFileError;
use super::pidfile::PidFileError;
use super::shutdown::ShutdownError;

/// Errors surfaced while supervising the daemon.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The configuration file could not be applied.
    #[error(transparent)]
    Config(#[from] ConfigFileError),
    /// Logging could not be switched to the configured level or format.
    #[error(transparent)]
    Logging(#[from] TelemetryError),
    /// A state root could not be created.
    #[error("failed to create directory '{}': {source}", path.display())]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A socket directory could not be prepared.
    #[error(transparent)]
    Socket(#[from] SocketPreparationError),
    /// The pid file could not be acquired.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {0}")]
    Shutdown(#[from] ShutdownError),
    /// The validation verdict could not be written.
    #[error("failed to write diagnostics: {0}")]
    Diagnostics(#[source] io::Error),
}
