//! Loads `daemon.json` and merges it over the flag-derived configuration.

use std::fs;
use std::io;
use std::path::PathBuf;

use dockerd_config::{DaemonConfig, DirectiveError, FileDirectives};
use thiserror::Error;
use tracing::debug;

use crate::command::DaemonOptions;

use super::PROCESS_TARGET;

/// Errors raised while applying the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but could not be read, or was named explicitly and is missing.
    #[error("unable to configure the Docker daemon with file {}: {source}", path.display())]
    Read {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file's directives were invalid or conflicted with flags.
    #[error("unable to configure the Docker daemon with file {}: {source}", path.display())]
    Directives {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying directive error.
        #[source]
        source: DirectiveError,
    },
}

/// Returns the configuration with file directives applied.
///
/// A missing file is tolerated only when the path is the resolved default.
pub(super) fn load(options: &DaemonOptions) -> Result<DaemonConfig, ConfigFileError> {
    let mut config = options.config().clone();
    let path = options.config_file();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error)
            if error.kind() == io::ErrorKind::NotFound && !options.config_file_is_explicit() =>
        {
            debug!(
                target: PROCESS_TARGET,
                file = %path.display(),
                "no configuration file; using flags and defaults"
            );
            return Ok(config);
        }
        Err(source) => {
            return Err(ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let directives = FileDirectives::from_slice(&bytes).map_err(|source| {
        ConfigFileError::Directives {
            path: path.to_path_buf(),
            source,
        }
    })?;
    config
        .apply_directives(directives, options.flags().explicit())
        .map_err(|source| ConfigFileError::Directives {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        target: PROCESS_TARGET,
        file = %path.display(),
        "configuration file applied"
    );
    Ok(config)
}
