//! Test suites for the launcher.

mod behaviour;
mod support;
