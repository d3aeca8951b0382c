//! The daemon configuration structure the flag installers bind into.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::logging::{LogFormat, LogLevel};
use crate::paths::ResolvedPaths;
use crate::socket::HostEndpoint;

/// Unix group granted access to the API socket by default.
pub const DEFAULT_SOCKET_GROUP: &str = "docker";

/// Service name used by the Windows service manager by default.
pub const DEFAULT_SERVICE_NAME: &str = "docker";

/// Configuration handed to the daemon runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Enables debug logging.
    pub debug: bool,
    /// Minimum severity logged.
    pub log_level: LogLevel,
    /// Log output format.
    pub log_format: LogFormat,
    /// API endpoints to listen on.
    pub hosts: Vec<HostEndpoint>,
    /// TLS settings for TCP endpoints.
    pub tls: TlsOptions,
    /// Root of persistent daemon state.
    pub data_root: PathBuf,
    /// Root of execution state.
    pub exec_root: PathBuf,
    /// Pid file written while the daemon runs.
    pub pidfile: PathBuf,
    /// Group owning the Unix API socket.
    pub group: String,
    /// Metadata labels attached to the daemon.
    pub labels: Vec<Label>,
    /// Directory holding per-registry certificates.
    pub registry_certs_dir: PathBuf,
    /// Validate the configuration and exit.
    pub validate: bool,
    /// Service manager integration.
    pub service: ServiceOptions,
}

impl DaemonConfig {
    /// Builds the default configuration from resolved paths.
    #[must_use]
    pub fn new(paths: &ResolvedPaths) -> Self {
        Self {
            debug: false,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            hosts: vec![paths.default_host().clone()],
            tls: TlsOptions::in_dir(paths.tls_cert_dir()),
            data_root: paths.data_root().to_path_buf(),
            exec_root: paths.exec_root().to_path_buf(),
            pidfile: paths.pidfile().to_path_buf(),
            group: DEFAULT_SOCKET_GROUP.to_owned(),
            labels: Vec::new(),
            registry_certs_dir: paths.certs_dir().to_path_buf(),
            validate: false,
            service: ServiceOptions::default(),
        }
    }

    /// Level the logger should use; `debug` overrides the configured level.
    #[must_use]
    pub const fn effective_log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }
}

/// TLS settings for the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Serve TLS on TCP endpoints.
    pub enabled: bool,
    /// Require and verify client certificates.
    pub verify: bool,
    /// Certificate authority bundle.
    pub ca_cert: PathBuf,
    /// Server certificate.
    pub cert: PathBuf,
    /// Server private key.
    pub key: PathBuf,
}

impl TlsOptions {
    /// Disabled TLS with the conventional file names under `dir`.
    #[must_use]
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self {
            enabled: false,
            verify: false,
            ca_cert: dir.join("ca.pem"),
            cert: dir.join("cert.pem"),
            key: dir.join("key.pem"),
        }
    }

    /// TLS is active when enabled or when verification is requested.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.enabled || self.verify
    }
}

/// Windows service manager actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Register the daemon as a service and exit.
    pub register: bool,
    /// Remove the service registration and exit.
    pub unregister: bool,
    /// Run under the service control manager.
    pub run: bool,
    /// Name of the service.
    pub name: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            register: false,
            unregister: false,
            run: false,
            name: DEFAULT_SERVICE_NAME.to_owned(),
        }
    }
}

/// A `key=value` daemon label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    key: String,
    value: String,
}

impl Label {
    /// Label key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Label value; may be empty.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}={}", self.key, self.value)
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
            _ => Err(LabelParseError(input.to_owned())),
        }
    }
}

/// Raised for labels that are not `key=value`.
#[derive(Debug, Error)]
#[error("bad attribute format: {0}")]
pub struct LabelParseError(pub String);
