//! Read-only view of the process environment used by path resolution.
//!
//! Every default the launcher derives from the environment goes through the
//! [`Environment`] trait so resolution can be exercised with an in-memory map
//! instead of mutating the real process environment.

use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Source of environment variables and user identity.
pub trait Environment {
    /// Returns the value of `key`, if set.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Returns the current user's home directory, if one can be resolved.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Returns the effective user id of the process.
    fn effective_uid(&self) -> u32;

    /// Returns `key` as an absolute path.
    ///
    /// Unset, empty, and relative values are treated as absent, matching the
    /// XDG base directory rules.
    fn absolute_path(&self, key: &str) -> Option<PathBuf> {
        self.var_os(key)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.is_absolute())
    }
}

/// Environment backed by the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var_os(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    #[cfg(unix)]
    fn effective_uid(&self) -> u32 {
        unsafe { libc::geteuid() }
    }

    #[cfg(not(unix))]
    fn effective_uid(&self) -> u32 {
        0
    }
}

/// Environment backed by an in-memory map.
///
/// The home directory is read from `HOME`; no fallback lookup is performed.
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    vars: HashMap<String, OsString>,
    uid: u32,
}

impl MapEnvironment {
    /// Builds an empty environment for uid 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, returning the updated environment.
    #[must_use]
    pub fn with_var(mut self, key: &str, value: impl AsRef<OsStr>) -> Self {
        self.set_var(key, value);
        self
    }

    /// Sets the effective uid, returning the updated environment.
    #[must_use]
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Sets a variable in place.
    pub fn set_var(&mut self, key: &str, value: impl AsRef<OsStr>) {
        self.vars
            .insert(key.to_owned(), value.as_ref().to_os_string());
    }

    /// Removes a variable in place.
    pub fn remove_var(&mut self, key: &str) {
        self.vars.remove(key);
    }
}

impl Environment for MapEnvironment {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.absolute_path("HOME")
    }

    fn effective_uid(&self) -> u32 {
        self.uid
    }
}
