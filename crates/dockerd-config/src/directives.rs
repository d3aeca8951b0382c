//! Configuration file directives.
//!
//! `daemon.json` is a JSON object whose keys mirror the long names of the
//! daemon flags. Repeatable flags use the plural form (`hosts`, `labels`).

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::config::{DaemonConfig, Label, LabelParseError};
use crate::installers::names;
use crate::logging::{LogFormat, LogLevel};
use crate::socket::{HostEndpoint, HostParseError};

/// Directives read from the daemon configuration file.
///
/// Every field is optional; absent keys leave the flag-derived value alone.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDirectives {
    /// `debug`
    pub debug: Option<bool>,
    /// `log-level`
    pub log_level: Option<LogLevel>,
    /// `log-format`
    pub log_format: Option<LogFormat>,
    /// `hosts`
    pub hosts: Option<Vec<String>>,
    /// `tls`
    pub tls: Option<bool>,
    /// `tlsverify`
    pub tlsverify: Option<bool>,
    /// `tlscacert`
    pub tlscacert: Option<PathBuf>,
    /// `tlscert`
    pub tlscert: Option<PathBuf>,
    /// `tlskey`
    pub tlskey: Option<PathBuf>,
    /// `data-root`
    pub data_root: Option<PathBuf>,
    /// `exec-root`
    pub exec_root: Option<PathBuf>,
    /// `pidfile`
    pub pidfile: Option<PathBuf>,
    /// `group`
    pub group: Option<String>,
    /// `labels`
    pub labels: Option<Vec<String>>,
    /// `registry-certs-dir`; has no flag counterpart.
    pub registry_certs_dir: Option<PathBuf>,
}

/// Errors raised while reading or applying configuration file directives.
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// The file is not a JSON object of known directives.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),
    /// Directives also given on the command line.
    #[error(
        "the following directives are specified both as a flag and in the configuration file: {}",
        .names.join(", ")
    )]
    Conflict {
        /// Conflicting directive names, in file order.
        names: Vec<String>,
    },
    /// A `hosts` entry is not a valid endpoint.
    #[error("invalid hosts directive: {0}")]
    Host(#[from] HostParseError),
    /// A `labels` entry is not `key=value`.
    #[error("invalid labels directive: {0}")]
    Label(#[from] LabelParseError),
    /// A root directory is relative.
    #[error("invalid {directive} directive: '{}' must be an absolute path", path.display())]
    RelativePath {
        /// Offending directive.
        directive: &'static str,
        /// Value from the file.
        path: PathBuf,
    },
}

impl FileDirectives {
    /// Parses the contents of a configuration file.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DirectiveError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pairs of (directive, flag identifier) for every key present in the file.
    ///
    /// Directives without a flag counterpart report `None`.
    #[must_use]
    pub fn present(&self) -> Vec<(&'static str, Option<&'static str>)> {
        let entries: [(&'static str, Option<&'static str>, bool); 15] = [
            ("debug", Some(names::DEBUG), self.debug.is_some()),
            ("log-level", Some(names::LOG_LEVEL), self.log_level.is_some()),
            ("log-format", Some(names::LOG_FORMAT), self.log_format.is_some()),
            ("hosts", Some(names::HOST), self.hosts.is_some()),
            ("tls", Some(names::TLS), self.tls.is_some()),
            ("tlsverify", Some(names::TLS_VERIFY), self.tlsverify.is_some()),
            ("tlscacert", Some(names::TLS_CA_CERT), self.tlscacert.is_some()),
            ("tlscert", Some(names::TLS_CERT), self.tlscert.is_some()),
            ("tlskey", Some(names::TLS_KEY), self.tlskey.is_some()),
            ("data-root", Some(names::DATA_ROOT), self.data_root.is_some()),
            ("exec-root", Some(names::EXEC_ROOT), self.exec_root.is_some()),
            ("pidfile", Some(names::PIDFILE), self.pidfile.is_some()),
            ("group", Some(names::GROUP), self.group.is_some()),
            ("labels", Some(names::LABEL), self.labels.is_some()),
            ("registry-certs-dir", None, self.registry_certs_dir.is_some()),
        ];
        entries
            .into_iter()
            .filter(|(_, _, present)| *present)
            .map(|(directive, flag, _)| (directive, flag))
            .collect()
    }

    /// Directive names that are also in `explicit`, the set of flags given
    /// on the command line.
    #[must_use]
    pub fn conflicts(&self, explicit: &BTreeSet<String>) -> Vec<String> {
        self.present()
            .into_iter()
            .filter(|(_, flag)| flag.is_some_and(|flag| explicit.contains(flag)))
            .map(|(directive, _)| directive.to_owned())
            .collect()
    }
}

impl DaemonConfig {
    /// Merges file directives over the flag-derived configuration.
    ///
    /// Fails without modifying `self` when any directive conflicts with an
    /// explicit flag or carries an invalid value.
    pub fn apply_directives(
        &mut self,
        directives: FileDirectives,
        explicit: &BTreeSet<String>,
    ) -> Result<(), DirectiveError> {
        let conflicts = directives.conflicts(explicit);
        if !conflicts.is_empty() {
            return Err(DirectiveError::Conflict { names: conflicts });
        }

        let mut merged = self.clone();
        let FileDirectives {
            debug,
            log_level,
            log_format,
            hosts,
            tls,
            tlsverify,
            tlscacert,
            tlscert,
            tlskey,
            data_root,
            exec_root,
            pidfile,
            group,
            labels,
            registry_certs_dir,
        } = directives;

        if let Some(debug) = debug {
            merged.debug = debug;
        }
        if let Some(level) = log_level {
            merged.log_level = level;
        }
        if let Some(format) = log_format {
            merged.log_format = format;
        }
        if let Some(hosts) = hosts {
            merged.hosts = hosts
                .iter()
                .map(|host| host.parse::<HostEndpoint>())
                .collect::<Result<_, _>>()?;
        }
        if let Some(tls) = tls {
            merged.tls.enabled = tls;
        }
        if let Some(verify) = tlsverify {
            merged.tls.verify = verify;
        }
        if let Some(path) = tlscacert {
            merged.tls.ca_cert = path;
        }
        if let Some(path) = tlscert {
            merged.tls.cert = path;
        }
        if let Some(path) = tlskey {
            merged.tls.key = path;
        }
        if let Some(path) = data_root {
            merged.data_root = absolute("data-root", path)?;
        }
        if let Some(path) = exec_root {
            merged.exec_root = absolute("exec-root", path)?;
        }
        if let Some(path) = pidfile {
            merged.pidfile = path;
        }
        if let Some(group) = group {
            merged.group = group;
        }
        if let Some(labels) = labels {
            merged.labels = labels
                .iter()
                .map(|label| label.parse::<Label>())
                .collect::<Result<_, _>>()?;
        }
        if let Some(path) = registry_certs_dir {
            merged.registry_certs_dir = path;
        }

        *self = merged;
        Ok(())
    }
}

fn absolute(directive: &'static str, path: PathBuf) -> Result<PathBuf, DirectiveError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(DirectiveError::RelativePath { directive, path })
    }
}
