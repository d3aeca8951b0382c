//! Test doubles and scenario state for the launcher suites.

mod installer;
mod logging;
mod reporter;
mod runtime;
mod shutdown;
mod world;

pub use installer::TestFlags;
pub use logging::RecordingLogging;
pub use reporter::{LaunchEvent, RecordingLaunchReporter};
pub use runtime::RecordingRuntime;
pub use shutdown::{ObservingShutdown, SharedBuffer};
pub use world::{Outcome, TestWorld, test_build, world};
