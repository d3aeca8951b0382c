//! Re-execution of the daemon binary as an internal helper.
//!
//! Some daemon subsystems need a fresh process image (for example to enter a
//! new namespace before doing any work). Rather than shipping extra binaries,
//! the daemon re-executes itself with `argv[0]` set to a helper name. The
//! launcher checks for such an invocation before it does anything else.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use thiserror::Error;

/// Entrypoint of an internal helper. Receives the full argument list.
pub type Helper = Box<dyn Fn(&[OsString]) -> ExitCode + Send + Sync>;

/// Errors raised while registering helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReexecError {
    /// A helper with the same name is already registered.
    #[error("reexec func already registered under name {name:?}")]
    AlreadyRegistered {
        /// Duplicate helper name.
        name: OsString,
    },
}

/// Helpers selectable by `argv[0]`.
#[derive(Default)]
pub struct ReexecRegistry {
    helpers: BTreeMap<OsString, Helper>,
}

impl ReexecRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `helper` under `name`.
    pub fn register<F>(&mut self, name: impl Into<OsString>, helper: F) -> Result<(), ReexecError>
    where
        F: Fn(&[OsString]) -> ExitCode + Send + Sync + 'static,
    {
        let name = name.into();
        if self.helpers.contains_key(&name) {
            return Err(ReexecError::AlreadyRegistered { name });
        }
        self.helpers.insert(name, Box::new(helper));
        Ok(())
    }

    /// Returns true when `name` selects a helper.
    #[must_use]
    pub fn is_registered(&self, name: &OsStr) -> bool {
        self.helpers.contains_key(name)
    }

    /// Runs the helper selected by `args[0]`, if any.
    ///
    /// Returns `None` when the invocation is an ordinary daemon launch. The
    /// match is exact; a path such as `/usr/bin/helper` does not select
    /// `helper`.
    pub fn dispatch(&self, args: &[OsString]) -> Option<ExitCode> {
        let helper = self.helpers.get(args.first()?)?;
        Some(helper(args))
    }
}

impl fmt::Debug for ReexecRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.helpers.keys())
            .finish()
    }
}

/// Path used to re-invoke the current binary.
///
/// On Linux this is `/proc/self/exe`, which stays valid even if the binary is
/// replaced on disk while the daemon runs.
pub fn self_path() -> io::Result<PathBuf> {
    if cfg!(target_os = "linux") {
        Ok(PathBuf::from("/proc/self/exe"))
    } else {
        std::env::current_exe()
    }
}

/// Builds a command that re-executes this binary as helper `name`.
pub fn command<I, A>(name: &str, args: I) -> io::Result<Command>
where
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let mut command = Command::new(self_path()?);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(name);
    }
    #[cfg(not(unix))]
    command.arg(name);
    command.args(args);
    Ok(command)
}
