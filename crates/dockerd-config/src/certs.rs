//! Default registry certificate directory.

use std::path::PathBuf;

use crate::env::Environment;
use crate::mode::ExecutionMode;
use crate::paths::{config_home, program_data};

/// System-wide registry certificate directory.
pub const ROOTFUL_CERTS_DIR: &str = "/etc/docker/certs.d";

/// Returns the default directory holding per-registry trust material.
///
/// Rootless daemons use `<config home>/docker/certs.d`. When no config home
/// can be resolved the system-wide default is kept rather than failing, so
/// the value is always available before flags are parsed. The function has no
/// side effects and may be called any number of times.
#[must_use]
pub fn certs_dir(mode: ExecutionMode, env: &dyn Environment) -> PathBuf {
    if cfg!(windows) {
        return program_data(env).join("docker").join("certs.d");
    }
    if mode.is_rootless()
        && let Some(home) = config_home(env)
    {
        return home.join("docker").join("certs.d");
    }
    PathBuf::from(ROOTFUL_CERTS_DIR)
}
