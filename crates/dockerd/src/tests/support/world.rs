//! BDD test world: holds the launch collaborators and the captured outcome.

use std::cell::RefCell;
use std::process::ExitCode;
use std::sync::Arc;

use dockerd_config::{MapEnvironment, ROOTLESSKIT_STATE_DIR, ServiceFlags};

use crate::bootstrap::{LaunchPlan, launch_with};
use crate::version::BuildInfo;

use super::installer::TestFlags;
use super::logging::RecordingLogging;
use super::reporter::RecordingLaunchReporter;
use super::runtime::RecordingRuntime;

/// Exit code and captured streams of one launch.
#[derive(Debug)]
pub struct Outcome {
    /// Process exit code.
    pub code: ExitCode,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub environment: MapEnvironment,
    pub logging: RecordingLogging,
    pub reporter: Arc<RecordingLaunchReporter>,
    pub flags: TestFlags,
    pub runtime: RecordingRuntime,
    outcome: Option<Outcome>,
}

impl TestWorld {
    /// Builds a world for a rootful launch with recording collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            environment: MapEnvironment::new(),
            logging: RecordingLogging::default(),
            reporter: Arc::new(RecordingLaunchReporter::default()),
            flags: TestFlags::default(),
            runtime: RecordingRuntime::default(),
            outcome: None,
        }
    }

    /// Marks the environment as running under RootlessKit.
    pub fn enter_rootless(&mut self) {
        self.environment
            .set_var(ROOTLESSKIT_STATE_DIR, "/run/user/1000/dockerd-rootless");
    }

    /// Launches with `args` following the program name.
    pub fn launch(&mut self, program: &str, args: &[&str]) {
        let plan = LaunchPlan {
            environment: self.environment.clone(),
            logging: self.logging.clone(),
            reporter: self.reporter.clone(),
            build: test_build(),
            flags: self.flags.clone(),
            service_flags: ServiceFlags,
            runtime: self.runtime.clone(),
        };
        let argv = std::iter::once(program).chain(args.iter().copied());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = launch_with(plan, argv, &mut stdout, &mut stderr);
        self.outcome = Some(Outcome {
            code,
            stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
        });
    }

    /// Outcome of the last launch.
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        self.outcome.as_ref().expect("dockerd has not been launched")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Build metadata used by every launcher test.
#[must_use]
pub fn test_build() -> BuildInfo {
    BuildInfo::new("Docker", "27.0.1", "abc1234")
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
