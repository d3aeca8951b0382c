//! Stock installers for the daemon and service-management flags.

use std::path::{Path, PathBuf};

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, value_parser};

use crate::config::{DaemonConfig, Label};
use crate::flags::{BindError, FlagBinding, FlagError, FlagSetBuilder};
use crate::logging::{LogFormat, LogLevel};
use crate::socket::HostEndpoint;

/// Flag identifiers, shared with the configuration file directives.
pub mod names {
    /// `-D, --debug`
    pub const DEBUG: &str = "debug";
    /// `-l, --log-level`
    pub const LOG_LEVEL: &str = "log-level";
    /// `--log-format`
    pub const LOG_FORMAT: &str = "log-format";
    /// `-H, --host`
    pub const HOST: &str = "host";
    /// `--tls`
    pub const TLS: &str = "tls";
    /// `--tlsverify`
    pub const TLS_VERIFY: &str = "tlsverify";
    /// `--tlscacert`
    pub const TLS_CA_CERT: &str = "tlscacert";
    /// `--tlscert`
    pub const TLS_CERT: &str = "tlscert";
    /// `--tlskey`
    pub const TLS_KEY: &str = "tlskey";
    /// `--data-root`
    pub const DATA_ROOT: &str = "data-root";
    /// `--exec-root`
    pub const EXEC_ROOT: &str = "exec-root";
    /// `-p, --pidfile`
    pub const PIDFILE: &str = "pidfile";
    /// `-G, --group`
    pub const GROUP: &str = "group";
    /// `--label`
    pub const LABEL: &str = "label";
    /// `--validate`
    pub const VALIDATE: &str = "validate";
    /// `--register-service` (Windows)
    pub const REGISTER_SERVICE: &str = "register-service";
    /// `--unregister-service` (Windows)
    pub const UNREGISTER_SERVICE: &str = "unregister-service";
    /// `--run-service` (Windows)
    pub const RUN_SERVICE: &str = "run-service";
    /// `--service-name` (Windows)
    pub const SERVICE_NAME: &str = "service-name";
}

use names::*;

/// Installs daemon-configuration flags; may reject its inputs.
pub trait FlagInstaller {
    /// Pushes bindings whose defaults are read from `defaults`.
    fn install(&self, defaults: &DaemonConfig, flags: &mut FlagSetBuilder)
    -> Result<(), FlagError>;
}

/// Installs platform service-management flags; cannot fail.
pub trait ServiceFlagInstaller {
    /// Pushes the platform's service bindings, if any.
    fn install(&self, defaults: &DaemonConfig, flags: &mut FlagSetBuilder);
}

/// The stock daemon flag set.
#[derive(Debug, Default, Clone, Copy)]
pub struct DaemonFlags;

impl FlagInstaller for DaemonFlags {
    fn install(
        &self,
        defaults: &DaemonConfig,
        flags: &mut FlagSetBuilder,
    ) -> Result<(), FlagError> {
        require_absolute(DATA_ROOT, &defaults.data_root)?;
        require_absolute(EXEC_ROOT, &defaults.exec_root)?;
        for host in &defaults.hosts {
            host.to_string()
                .parse::<HostEndpoint>()
                .map_err(|error| FlagError::InvalidDefault {
                    flag: HOST.to_owned(),
                    reason: error.to_string(),
                })?;
        }

        flags
            .push(FlagBinding::new(
                switch(DEBUG).short('D').help("Enable debug mode"),
                |matches, config| {
                    config.debug = matches.get_flag(DEBUG);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(LOG_LEVEL)
                    .short('l')
                    .long(LOG_LEVEL)
                    .value_name("LEVEL")
                    .value_parser(value_parser!(LogLevel))
                    .default_value(defaults.log_level.to_string())
                    .help("Set the logging level (\"debug\"|\"info\"|\"warn\"|\"error\"|\"fatal\")"),
                |matches, config| {
                    if let Some(level) = matches.get_one::<LogLevel>(LOG_LEVEL) {
                        config.log_level = *level;
                    }
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(LOG_FORMAT)
                    .long(LOG_FORMAT)
                    .value_name("FORMAT")
                    .value_parser(value_parser!(LogFormat))
                    .default_value(defaults.log_format.to_string())
                    .help("Set the logging format (\"text\"|\"json\")"),
                |matches, config| {
                    if let Some(format) = matches.get_one::<LogFormat>(LOG_FORMAT) {
                        config.log_format = *format;
                    }
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(HOST)
                    .short('H')
                    .long(HOST)
                    .value_name("HOST")
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(HostEndpoint))
                    .default_values(defaults.hosts.iter().map(ToString::to_string))
                    .help("Daemon socket(s) to connect to"),
                apply_hosts,
            ))
            .push(FlagBinding::new(
                switch(TLS).help("Use TLS; implied by --tlsverify"),
                |matches, config| {
                    config.tls.enabled = matches.get_flag(TLS);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                switch(TLS_VERIFY).help("Use TLS and verify the remote"),
                |matches, config| {
                    config.tls.verify = matches.get_flag(TLS_VERIFY);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                path_flag(TLS_CA_CERT, &defaults.tls.ca_cert)
                    .help("Trust certs signed only by this CA"),
                |matches, config| {
                    assign_path(matches, TLS_CA_CERT, &mut config.tls.ca_cert);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                path_flag(TLS_CERT, &defaults.tls.cert).help("Path to TLS certificate file"),
                |matches, config| {
                    assign_path(matches, TLS_CERT, &mut config.tls.cert);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                path_flag(TLS_KEY, &defaults.tls.key).help("Path to TLS key file"),
                |matches, config| {
                    assign_path(matches, TLS_KEY, &mut config.tls.key);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                path_flag(DATA_ROOT, &defaults.data_root)
                    .help("Root directory of persistent Docker state"),
                |matches, config| {
                    assign_absolute(matches, DATA_ROOT, &mut config.data_root)
                },
            ))
            .push(FlagBinding::new(
                path_flag(EXEC_ROOT, &defaults.exec_root)
                    .help("Root directory for execution state files"),
                |matches, config| {
                    assign_absolute(matches, EXEC_ROOT, &mut config.exec_root)
                },
            ))
            .push(FlagBinding::new(
                path_flag(PIDFILE, &defaults.pidfile)
                    .short('p')
                    .help("Path to use for daemon PID file"),
                |matches, config| {
                    assign_path(matches, PIDFILE, &mut config.pidfile);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(GROUP)
                    .short('G')
                    .long(GROUP)
                    .value_name("GROUP")
                    .default_value(defaults.group.clone())
                    .help("Group for the unix socket"),
                |matches, config| {
                    if let Some(group) = matches.get_one::<String>(GROUP) {
                        config.group.clone_from(group);
                    }
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(LABEL)
                    .long(LABEL)
                    .value_name("KEY=VALUE")
                    .action(ArgAction::Append)
                    .help("Set key=value labels to the daemon"),
                apply_labels,
            ))
            .push(FlagBinding::new(
                switch(VALIDATE).help("Validate daemon configuration and exit"),
                |matches, config| {
                    config.validate = matches.get_flag(VALIDATE);
                    Ok(())
                },
            ));
        Ok(())
    }
}

/// Service-management flags; only Windows installs any.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceFlags;

impl ServiceFlagInstaller for ServiceFlags {
    fn install(&self, defaults: &DaemonConfig, flags: &mut FlagSetBuilder) {
        if !cfg!(windows) {
            return;
        }
        flags
            .push(FlagBinding::new(
                switch(REGISTER_SERVICE).help("Register the service and exit"),
                |matches, config| {
                    config.service.register = matches.get_flag(REGISTER_SERVICE);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                switch(UNREGISTER_SERVICE).help("Unregister the service and exit"),
                |matches, config| {
                    config.service.unregister = matches.get_flag(UNREGISTER_SERVICE);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                switch(RUN_SERVICE).hide(true),
                |matches, config| {
                    config.service.run = matches.get_flag(RUN_SERVICE);
                    Ok(())
                },
            ))
            .push(FlagBinding::new(
                Arg::new(SERVICE_NAME)
                    .long(SERVICE_NAME)
                    .value_name("NAME")
                    .default_value(defaults.service.name.clone())
                    .help("Set the Windows service name"),
                |matches, config| {
                    if let Some(name) = matches.get_one::<String>(SERVICE_NAME) {
                        config.service.name.clone_from(name);
                    }
                    Ok(())
                },
            ));
    }
}

fn switch(name: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue)
}

fn path_flag(name: &'static str, default: &Path) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("PATH")
        .value_parser(value_parser!(PathBuf))
        .default_value(default.as_os_str().to_owned())
}

fn assign_path(matches: &ArgMatches, name: &str, target: &mut PathBuf) {
    if let Some(path) = matches.get_one::<PathBuf>(name) {
        target.clone_from(path);
    }
}

fn assign_absolute(matches: &ArgMatches, name: &str, target: &mut PathBuf) -> Result<(), BindError> {
    if let Some(path) = matches.get_one::<PathBuf>(name) {
        if !path.is_absolute() {
            return Err(BindError::Invalid {
                flag: name.to_owned(),
                reason: format!("'{}' must be an absolute path", path.display()),
            });
        }
        target.clone_from(path);
    }
    Ok(())
}

/// Only command-line hosts are copied; the resolved defaults are kept as
/// values rather than re-read from their rendered form.
fn apply_hosts(matches: &ArgMatches, config: &mut DaemonConfig) -> Result<(), BindError> {
    if matches.value_source(HOST) != Some(ValueSource::CommandLine) {
        return Ok(());
    }
    if let Some(hosts) = matches.get_many::<HostEndpoint>(HOST) {
        config.hosts = hosts.cloned().collect();
    }
    Ok(())
}

fn apply_labels(matches: &ArgMatches, config: &mut DaemonConfig) -> Result<(), BindError> {
    if let Some(labels) = matches.get_many::<String>(LABEL) {
        config.labels = labels
            .map(|label| label.parse::<Label>())
            .collect::<Result<_, _>>()?;
    }
    Ok(())
}

fn require_absolute(flag: &str, path: &Path) -> Result<(), FlagError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(FlagError::InvalidDefault {
            flag: flag.to_owned(),
            reason: format!("'{}' is not an absolute path", path.display()),
        })
    }
}
