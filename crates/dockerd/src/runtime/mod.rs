//! The daemon runtime entrypoint and its stock foreground implementation.

use std::fs::DirBuilder;
use std::io::{self, Write};
use std::path::Path;

use dockerd_config::DaemonConfig;
use tracing::info;

use crate::command::DaemonOptions;
use crate::reexec::{ReexecError, ReexecRegistry};
use crate::telemetry;

mod config_file;
mod errors;
mod pidfile;
mod shutdown;

pub use config_file::ConfigFileError;
pub use errors::SupervisorError;
pub use pidfile::PidFileError;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Any error returned by the daemon runtime; reported verbatim.
pub type RuntimeError = Box<dyn std::error::Error + Send + Sync>;

/// The daemon proper, invoked once by the launcher.
pub trait DaemonRuntime {
    /// Contributes internal helpers selectable by `argv[0]`.
    ///
    /// Called before anything else happens in the process.
    fn register_helpers(&self, registry: &mut ReexecRegistry) -> Result<(), ReexecError> {
        let _ = registry;
        Ok(())
    }

    /// Runs the daemon until it shuts down.
    fn run(&mut self, options: &DaemonOptions) -> Result<(), RuntimeError>;
}

/// Foreground runtime: loads the configuration file, guards the pid file,
/// and blocks until a termination signal arrives.
#[derive(Debug)]
pub struct SupervisorRuntime<S, W> {
    shutdown: S,
    diagnostics: W,
}

impl SupervisorRuntime<SystemShutdownSignal, io::Stderr> {
    /// Runtime waiting on process signals and reporting to standard error.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemShutdownSignal::new(), io::stderr())
    }
}

impl<S, W> SupervisorRuntime<S, W>
where
    S: ShutdownSignal,
    W: Write,
{
    /// Builds a runtime from its collaborators.
    ///
    /// `diagnostics` receives the `--validate` verdict.
    pub fn new(shutdown: S, diagnostics: W) -> Self {
        Self {
            shutdown,
            diagnostics,
        }
    }

    /// Consumes the runtime, returning the diagnostics writer.
    pub fn into_diagnostics(self) -> W {
        self.diagnostics
    }

    fn supervise(&mut self, options: &DaemonOptions) -> Result<(), SupervisorError> {
        let config = config_file::load(options)?;
        if config.validate {
            writeln!(self.diagnostics, "configuration OK").map_err(SupervisorError::Diagnostics)?;
            return Ok(());
        }

        if let Some(handle) = telemetry::handle() {
            handle.reconfigure(config.effective_log_level(), config.log_format)?;
        }

        prepare_roots(&config)?;
        for host in &config.hosts {
            host.prepare_filesystem()?;
        }
        let _pidfile = pidfile::PidFile::acquire(&config.pidfile)?;

        info!(
            target: PROCESS_TARGET,
            hosts = ?config.hosts.iter().map(ToString::to_string).collect::<Vec<_>>(),
            data_root = %config.data_root.display(),
            tls = config.tls.active(),
            "daemon ready"
        );
        self.shutdown.wait()?;
        info!(target: PROCESS_TARGET, "shutdown sequence completed");
        Ok(())
    }
}

impl<S, W> DaemonRuntime for SupervisorRuntime<S, W>
where
    S: ShutdownSignal,
    W: Write,
{
    fn run(&mut self, options: &DaemonOptions) -> Result<(), RuntimeError> {
        self.supervise(options).map_err(Into::into)
    }
}

fn prepare_roots(config: &DaemonConfig) -> Result<(), SupervisorError> {
    create_root(&config.exec_root, 0o700)?;
    create_root(&config.data_root, 0o711)
}

fn create_root(path: &Path, mode: u32) -> Result<(), SupervisorError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
        .create(path)
        .map_err(|source| SupervisorError::Directory {
            path: path.to_path_buf(),
            source,
        })
}
