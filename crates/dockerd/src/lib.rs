//! Startup orchestration for the Docker daemon.
//!
//! The launcher owns everything that happens before the daemon runtime takes
//! over: dispatching re-executed helpers by `argv[0]`, detecting rootless
//! mode, installing logging, assembling the `dockerd` command line, and
//! mapping the outcome to a process exit code.
//!
//! [`launch`] wires the stock collaborators. [`launch_with`] accepts a
//! [`LaunchPlan`] so every stage can be substituted.

mod bootstrap;
mod command;
mod executor;
mod health;
pub mod reexec;
pub mod runtime;
mod telemetry;
mod version;

pub use bootstrap::{LaunchPlan, launch, launch_with};
pub use command::{
    ABOUT, ArgsPolicy, COMMAND_NAME, CONFIG_FILE_FLAG, CommandBuilder, CommandDescriptor,
    ConstructionError, DaemonOptions, ParsedFlags, USAGE, VERSION_FLAG,
};
pub use executor::{AppError, Executor, UsageError};
pub use health::{LaunchReporter, StructuredLaunchReporter};
pub use reexec::{ReexecError, ReexecRegistry};
pub use runtime::{DaemonRuntime, RuntimeError, SupervisorRuntime};
pub use telemetry::{LoggingBootstrap, LoggingHandle, StdStreams, SystemLogging, TelemetryError};
pub use version::BuildInfo;

#[cfg(test)]
mod tests;
