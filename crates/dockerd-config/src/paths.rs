//! Mode-aware default paths for the daemon.
//!
//! Rootful daemons use the system-wide locations. Under RootlessKit the
//! daemon is unlikely to have access to those, so the XDG base directories
//! (`XDG_CONFIG_HOME`, `XDG_DATA_HOME`, `XDG_RUNTIME_DIR`) take their place,
//! falling back to the locations the XDG specification documents when the
//! variables are unset.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::certs;
use crate::env::Environment;
use crate::mode::ExecutionMode;
use crate::socket::HostEndpoint;

/// Name of the daemon configuration file.
pub const CONFIG_FILE_NAME: &str = "daemon.json";

/// System-wide configuration directory used by rootful daemons.
pub const ROOTFUL_CONFIG_DIR: &str = "/etc/docker";

const PRODUCT_DIR: &str = "docker";
const ROOTFUL_DATA_ROOT: &str = "/var/lib/docker";
const ROOTFUL_EXEC_ROOT: &str = "/var/run/docker";
const ROOTFUL_PIDFILE: &str = "/var/run/docker.pid";
const ROOTFUL_SOCKET: &str = "/var/run/docker.sock";
const WINDOWS_PROGRAM_DATA: &str = r"C:\ProgramData";
const WINDOWS_PIPE: &str = "//./pipe/docker_engine";

/// Errors raised while deriving default paths.
#[derive(Debug, Error)]
pub enum PathResolutionError {
    /// Neither the XDG variable nor a home directory could be resolved.
    #[error("unable to resolve a home directory: set {variable} or HOME")]
    HomeUnavailable {
        /// XDG variable that would have provided the directory.
        variable: &'static str,
    },
}

/// Returns the default daemon configuration file for `mode`.
///
/// Rootful daemons always use `/etc/docker/daemon.json`; the environment is
/// not consulted. Rootless daemons use `$XDG_CONFIG_HOME/docker/daemon.json`,
/// falling back to `$HOME/.config/docker/daemon.json`.
pub fn config_file(
    mode: ExecutionMode,
    env: &dyn Environment,
) -> Result<PathBuf, PathResolutionError> {
    if cfg!(windows) {
        return Ok(program_data(env)
            .join(PRODUCT_DIR)
            .join("config")
            .join(CONFIG_FILE_NAME));
    }
    let dir = match mode {
        ExecutionMode::Rootful => PathBuf::from(ROOTFUL_CONFIG_DIR),
        ExecutionMode::Rootless => config_home(env)
            .ok_or(PathResolutionError::HomeUnavailable {
                variable: "XDG_CONFIG_HOME",
            })?
            .join(PRODUCT_DIR),
    };
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Read-only defaults derived from the execution mode and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    config_file: PathBuf,
    certs_dir: PathBuf,
    data_root: PathBuf,
    exec_root: PathBuf,
    pidfile: PathBuf,
    default_host: HostEndpoint,
    tls_cert_dir: PathBuf,
}

impl ResolvedPaths {
    /// Derives every default path.
    ///
    /// The configuration file is resolved first, so a missing home directory
    /// is reported against it before anything else is computed.
    pub fn resolve(mode: ExecutionMode, env: &dyn Environment) -> Result<Self, PathResolutionError> {
        let config_file = config_file(mode, env)?;
        let certs_dir = certs::certs_dir(mode, env);
        let layout = if cfg!(windows) {
            RootLayout::windows(env)
        } else {
            match mode {
                ExecutionMode::Rootful => RootLayout::rootful(),
                ExecutionMode::Rootless => RootLayout::rootless(env)?,
            }
        };
        let tls_cert_dir = tls_cert_dir(env, &config_file);
        Ok(Self {
            config_file,
            certs_dir,
            data_root: layout.data_root,
            exec_root: layout.exec_root,
            pidfile: layout.pidfile,
            default_host: layout.default_host,
            tls_cert_dir,
        })
    }

    /// Default daemon configuration file.
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Default registry certificate directory.
    #[must_use]
    pub fn certs_dir(&self) -> &Path {
        &self.certs_dir
    }

    /// Default root of persistent daemon state.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Default root of execution state.
    #[must_use]
    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    /// Default pid file.
    #[must_use]
    pub fn pidfile(&self) -> &Path {
        &self.pidfile
    }

    /// Default API endpoint.
    #[must_use]
    pub fn default_host(&self) -> &HostEndpoint {
        &self.default_host
    }

    /// Default directory holding the daemon's TLS material.
    #[must_use]
    pub fn tls_cert_dir(&self) -> &Path {
        &self.tls_cert_dir
    }
}

struct RootLayout {
    data_root: PathBuf,
    exec_root: PathBuf,
    pidfile: PathBuf,
    default_host: HostEndpoint,
}

impl RootLayout {
    fn rootful() -> Self {
        Self {
            data_root: PathBuf::from(ROOTFUL_DATA_ROOT),
            exec_root: PathBuf::from(ROOTFUL_EXEC_ROOT),
            pidfile: PathBuf::from(ROOTFUL_PIDFILE),
            default_host: HostEndpoint::unix(ROOTFUL_SOCKET),
        }
    }

    fn rootless(env: &dyn Environment) -> Result<Self, PathResolutionError> {
        let data_home = data_home(env).ok_or(PathResolutionError::HomeUnavailable {
            variable: "XDG_DATA_HOME",
        })?;
        let runtime = runtime_dir(env);
        Ok(Self {
            data_root: data_home.join(PRODUCT_DIR),
            exec_root: runtime.join(PRODUCT_DIR),
            pidfile: runtime.join("docker.pid"),
            default_host: HostEndpoint::unix(runtime.join("docker.sock")),
        })
    }

    fn windows(env: &dyn Environment) -> Self {
        let root = program_data(env).join(PRODUCT_DIR);
        Self {
            exec_root: root.join("exec-root"),
            pidfile: root.join("docker.pid"),
            data_root: root,
            default_host: HostEndpoint::NamedPipe {
                path: WINDOWS_PIPE.to_owned(),
            },
        }
    }
}

/// `$XDG_CONFIG_HOME`, else `$HOME/.config`.
pub(crate) fn config_home(env: &dyn Environment) -> Option<PathBuf> {
    env.absolute_path("XDG_CONFIG_HOME")
        .or_else(|| env.home_dir().map(|home| home.join(".config")))
}

/// `$XDG_DATA_HOME`, else `$HOME/.local/share`.
fn data_home(env: &dyn Environment) -> Option<PathBuf> {
    env.absolute_path("XDG_DATA_HOME")
        .or_else(|| env.home_dir().map(|home| home.join(".local").join("share")))
}

/// `$XDG_RUNTIME_DIR`, else the systemd-logind location `/run/user/<euid>`.
fn runtime_dir(env: &dyn Environment) -> PathBuf {
    env.absolute_path("XDG_RUNTIME_DIR")
        .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", env.effective_uid())))
}

pub(crate) fn program_data(env: &dyn Environment) -> PathBuf {
    env.absolute_path("ProgramData")
        .unwrap_or_else(|| PathBuf::from(WINDOWS_PROGRAM_DATA))
}

fn tls_cert_dir(env: &dyn Environment, config_file: &Path) -> PathBuf {
    if let Some(dir) = env.var_os("DOCKER_CERT_PATH").filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(home) = env.home_dir() {
        return home.join(".docker");
    }
    config_file
        .parent()
        .map_or_else(|| PathBuf::from(ROOTFUL_CONFIG_DIR), Path::to_path_buf)
}
