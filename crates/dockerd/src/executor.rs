//! Parses the command line, runs the handler, and maps the outcome to an exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use dockerd_config::BindError;
use thiserror::Error;

use crate::command::{COMMAND_NAME, CommandDescriptor, ConstructionError, VERSION_FLAG};
use crate::health::LaunchReporter;
use crate::reexec::ReexecError;
use crate::runtime::{DaemonRuntime, RuntimeError};
use crate::version::BuildInfo;

/// Errors in how the command was invoked.
#[derive(Debug, Error)]
pub enum UsageError {
    /// `clap` rejected the argument list.
    #[error("{}", first_line(.0))]
    Parse(#[source] clap::Error),
    /// Positional arguments were given to a command that takes none.
    #[error("\"{command}\" accepts no arguments. See '{command} --help'.")]
    UnexpectedArguments {
        /// Command name.
        command: String,
        /// Rejected arguments.
        arguments: Vec<String>,
    },
    /// Flag values could not be bound into the configuration.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Every failure the launcher reports.
#[derive(Debug, Error)]
pub enum AppError {
    /// A helper could not be registered.
    #[error(transparent)]
    Reexec(#[from] ReexecError),
    /// The command could not be assembled.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    /// The command was invoked incorrectly.
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// The daemon runtime failed.
    #[error("{0}")]
    Runtime(RuntimeError),
    /// Help or version output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Writes `error` as one line on `stderr` and returns the failure exit code.
pub fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "{error}");
    ExitCode::FAILURE
}

/// Drives one [`CommandDescriptor`] to completion.
pub struct Executor<R> {
    descriptor: CommandDescriptor<R>,
    build: BuildInfo,
    reporter: Arc<dyn LaunchReporter>,
}

impl<R: DaemonRuntime> Executor<R> {
    /// Wraps a descriptor.
    #[must_use]
    pub fn new(
        descriptor: CommandDescriptor<R>,
        build: BuildInfo,
        reporter: Arc<dyn LaunchReporter>,
    ) -> Self {
        Self {
            descriptor,
            build,
            reporter,
        }
    }

    /// Parses `args`, runs the handler, and reports any failure on `stderr`.
    pub fn execute<W, E>(
        mut self,
        args: Vec<OsString>,
        stdout: &mut W,
        stderr: &mut E,
    ) -> ExitCode
    where
        W: Write,
        E: Write,
    {
        match self.try_execute(args, stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => report(stderr, &error),
        }
    }

    fn try_execute<W: Write>(
        &mut self,
        args: Vec<OsString>,
        stdout: &mut W,
    ) -> Result<(), AppError> {
        let matches = match self.descriptor.clap_command().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(error) if error.kind() == ErrorKind::DisplayHelp => {
                return write!(stdout, "{}", error.render()).map_err(AppError::Output);
            }
            Err(error) => return Err(UsageError::Parse(error).into()),
        };

        let version = matches
            .try_get_one::<bool>(VERSION_FLAG)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false);
        if version {
            return writeln!(
                stdout,
                "{} version {}",
                self.build.product(),
                self.descriptor.version()
            )
            .map_err(AppError::Output);
        }

        if let Some(arguments) = self.descriptor.policy().violation(&matches) {
            return Err(UsageError::UnexpectedArguments {
                command: COMMAND_NAME.to_owned(),
                arguments,
            }
            .into());
        }

        let options = self.descriptor.bind(&matches).map_err(UsageError::Bind)?;
        self.reporter.daemon_starting(&options);
        self.descriptor.run(&options).map_err(AppError::Runtime)?;
        self.reporter.daemon_stopped();
        Ok(())
    }
}

/// First line of a `clap` error without its `error: ` prefix.
fn first_line(error: &clap::Error) -> String {
    let rendered = error.render().to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_owned()
}
