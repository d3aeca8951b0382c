//! Launch orchestration.
//!
//! The sequence is fixed: helper dispatch comes first so a re-executed helper
//! never touches logging or the command line, then mode detection, logging,
//! command assembly, and finally parsing and running.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use dockerd_config::{
    DaemonFlags, Environment, FlagInstaller, ProcessEnvironment, RootlessDetector,
    ServiceFlagInstaller, ServiceFlags,
};
use tracing::debug;

use crate::command::{CommandBuilder, ConstructionError};
use crate::executor::{AppError, Executor, report};
use crate::health::{LaunchReporter, StructuredLaunchReporter};
use crate::reexec::ReexecRegistry;
use crate::runtime::{DaemonRuntime, SupervisorRuntime};
use crate::telemetry::{LoggingBootstrap, StdStreams, SystemLogging};
use crate::version::BuildInfo;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Collaborators for one launch.
pub struct LaunchPlan<E, L, I, S, R> {
    /// Source of environment variables.
    pub environment: E,
    /// Installs the process-wide log subscriber.
    pub logging: L,
    /// Receives lifecycle events.
    pub reporter: Arc<dyn LaunchReporter>,
    /// Product name, version, and commit.
    pub build: BuildInfo,
    /// Installs the daemon configuration flags.
    pub flags: I,
    /// Installs the platform service flags.
    pub service_flags: S,
    /// The daemon proper.
    pub runtime: R,
}

/// Launches with the given collaborators and returns the process exit code.
pub fn launch_with<A, W, X, E, L, I, S, R>(
    plan: LaunchPlan<E, L, I, S, R>,
    args: A,
    stdout: &mut W,
    stderr: &mut X,
) -> ExitCode
where
    A: IntoIterator,
    A::Item: Into<OsString>,
    W: Write,
    X: Write,
    E: Environment,
    L: LoggingBootstrap,
    I: FlagInstaller,
    S: ServiceFlagInstaller,
    R: DaemonRuntime,
{
    let LaunchPlan {
        environment,
        logging,
        reporter,
        build,
        flags,
        service_flags,
        runtime,
    } = plan;
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let mut registry = ReexecRegistry::new();
    if let Err(error) = runtime.register_helpers(&mut registry) {
        return report(stderr, &AppError::from(error));
    }
    if let Some(code) = registry.dispatch(&args) {
        return code;
    }

    let mode = RootlessDetector::new().mode(&environment);
    let streams = StdStreams::resolve(&environment);
    if let Err(error) = logging.install(&streams) {
        return report(stderr, &ConstructionError::Logging(error).into());
    }
    reporter.mode_detected(mode);

    let descriptor = match CommandBuilder::new(&build, mode, &environment).build(
        &flags,
        &service_flags,
        runtime,
    ) {
        Ok(descriptor) => descriptor,
        Err(error) => return report(stderr, &error.into()),
    };
    reporter.command_built(descriptor.flags().len());
    debug!(
        target: LAUNCH_TARGET,
        version = descriptor.version(),
        "command ready"
    );

    Executor::new(descriptor, build, reporter).execute(args, stdout, stderr)
}

/// Launches the stock daemon.
pub fn launch<A, W, X>(args: A, stdout: &mut W, stderr: &mut X) -> ExitCode
where
    A: IntoIterator,
    A::Item: Into<OsString>,
    W: Write,
    X: Write,
{
    let plan = LaunchPlan {
        environment: ProcessEnvironment,
        logging: SystemLogging,
        reporter: Arc::new(StructuredLaunchReporter::new()),
        build: BuildInfo::current(),
        flags: DaemonFlags,
        service_flags: ServiceFlags,
        runtime: SupervisorRuntime::system(),
    };
    launch_with(plan, args, stdout, stderr)
}
