//! Assembly of the `dockerd` command description.
//!
//! [`CommandBuilder::build`] composes the flag set in a fixed order: the
//! `--version` switch, `--config-file` (whose default needs the mode-aware
//! path resolution), the daemon configuration flags, and finally the platform
//! service flags. The batch is validated once; any failure aborts construction
//! and nothing is run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use dockerd_config::{
    BindError, DaemonConfig, Environment, ExecutionMode, FlagBinding, FlagError, FlagInstaller,
    FlagSet, FlagSetBuilder, PathResolutionError, ResolvedPaths, ServiceFlagInstaller,
};
use thiserror::Error;

use crate::runtime::{DaemonRuntime, RuntimeError};
use crate::telemetry::TelemetryError;
use crate::version::BuildInfo;

/// Name of the root command.
pub const COMMAND_NAME: &str = "dockerd";
/// Usage line shown in help output.
pub const USAGE: &str = "dockerd [OPTIONS]";
/// One-line description shown in help output.
pub const ABOUT: &str = "A self-sufficient runtime for containers.";
/// Identifier of the `--version` switch.
pub const VERSION_FLAG: &str = "version";
/// Identifier of the `--config-file` flag.
pub const CONFIG_FILE_FLAG: &str = "config-file";

const ARGUMENTS: &str = "arguments";

/// Errors that abort command construction.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// Default paths could not be resolved.
    #[error(transparent)]
    Paths(#[from] PathResolutionError),
    /// The flag set was rejected.
    #[error(transparent)]
    Flags(#[from] FlagError),
    /// Logging could not be installed.
    #[error(transparent)]
    Logging(#[from] TelemetryError),
}

/// Positional arguments the command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsPolicy {
    /// Any positional argument is a usage error.
    NoArgs,
}

impl ArgsPolicy {
    /// Checks the positional arguments captured in `matches`.
    ///
    /// Returns the offending arguments when the policy rejects them.
    #[must_use]
    pub fn violation(self, matches: &ArgMatches) -> Option<Vec<String>> {
        match self {
            Self::NoArgs => {
                let arguments: Vec<String> = matches
                    .try_get_many::<String>(ARGUMENTS)
                    .ok()
                    .flatten()
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                (!arguments.is_empty()).then_some(arguments)
            }
        }
    }
}

/// Flags as parsed from the command line.
#[derive(Debug, Clone)]
pub struct ParsedFlags {
    matches: ArgMatches,
    explicit: BTreeSet<String>,
}

impl ParsedFlags {
    /// Raw `clap` matches.
    #[must_use]
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    /// Identifiers of flags given explicitly on the command line.
    #[must_use]
    pub fn explicit(&self) -> &BTreeSet<String> {
        &self.explicit
    }

    /// Returns true when `id` was given on the command line.
    #[must_use]
    pub fn is_explicit(&self, id: &str) -> bool {
        self.explicit.contains(id)
    }
}

/// Options handed to the daemon runtime.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    config_file: PathBuf,
    flags: ParsedFlags,
    config: DaemonConfig,
}

impl DaemonOptions {
    /// Configuration file to load.
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Returns true when `--config-file` was given explicitly.
    #[must_use]
    pub fn config_file_is_explicit(&self) -> bool {
        self.flags.is_explicit(CONFIG_FILE_FLAG)
    }

    /// Parsed flag state.
    #[must_use]
    pub fn flags(&self) -> &ParsedFlags {
        &self.flags
    }

    /// Configuration bound from the flags.
    #[must_use]
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }
}

/// Immutable description of the root command and its run handler.
#[derive(Debug)]
pub struct CommandDescriptor<R> {
    version: String,
    policy: ArgsPolicy,
    flags: FlagSet,
    defaults: DaemonConfig,
    default_config_file: PathBuf,
    runtime: R,
}

impl<R> CommandDescriptor<R> {
    /// `"{version}, build {commit}"`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Positional-argument policy.
    #[must_use]
    pub const fn policy(&self) -> ArgsPolicy {
        self.policy
    }

    /// Validated flag set.
    #[must_use]
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Configuration the flag bindings apply over.
    #[must_use]
    pub fn defaults(&self) -> &DaemonConfig {
        &self.defaults
    }

    /// `clap` command parsing this description.
    ///
    /// Positional arguments are always captured so the policy can reject
    /// them with its own message.
    #[must_use]
    pub fn clap_command(&self) -> Command {
        Command::new(COMMAND_NAME)
            .about(ABOUT)
            .override_usage(USAGE)
            .disable_version_flag(true)
            .args(self.flags.args().cloned())
            .arg(
                Arg::new(ARGUMENTS)
                    .action(ArgAction::Append)
                    .num_args(1..)
                    .value_parser(value_parser!(String))
                    .hide(true),
            )
    }

    /// Runtime invoked by the run handler.
    #[must_use]
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Binds parsed flags into the options handed to the runtime.
    pub fn bind(&self, matches: &ArgMatches) -> Result<DaemonOptions, BindError> {
        let explicit = self.flags.explicit(matches);
        let config = self.flags.bind(matches, self.defaults.clone())?;
        let config_file = matches
            .try_get_one::<PathBuf>(CONFIG_FILE_FLAG)
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| self.default_config_file.clone());
        Ok(DaemonOptions {
            config_file,
            flags: ParsedFlags {
                matches: matches.clone(),
                explicit,
            },
            config,
        })
    }
}

impl<R: DaemonRuntime> CommandDescriptor<R> {
    /// Runs the handler. The runtime's error is returned unmodified.
    pub fn run(&mut self, options: &DaemonOptions) -> Result<(), RuntimeError> {
        self.runtime.run(options)
    }
}

/// Builds a [`CommandDescriptor`] for one launch.
pub struct CommandBuilder<'a> {
    build: &'a BuildInfo,
    mode: ExecutionMode,
    env: &'a dyn Environment,
}

impl std::fmt::Debug for CommandBuilder<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandBuilder")
            .field("build", self.build)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> CommandBuilder<'a> {
    /// Starts a builder for the given execution mode.
    #[must_use]
    pub fn new(build: &'a BuildInfo, mode: ExecutionMode, env: &'a dyn Environment) -> Self {
        Self { build, mode, env }
    }

    /// Composes and validates the flag set.
    pub fn build<R>(
        self,
        installer: &dyn FlagInstaller,
        service: &dyn ServiceFlagInstaller,
        runtime: R,
    ) -> Result<CommandDescriptor<R>, ConstructionError> {
        let mut flags = FlagSetBuilder::new();
        flags.push(FlagBinding::unbound(
            Arg::new(VERSION_FLAG)
                .short('v')
                .long(VERSION_FLAG)
                .action(ArgAction::SetTrue)
                .help("Print version information and quit"),
        ));

        let paths = ResolvedPaths::resolve(self.mode, self.env)?;
        flags.push(FlagBinding::unbound(
            Arg::new(CONFIG_FILE_FLAG)
                .long(CONFIG_FILE_FLAG)
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(paths.config_file().as_os_str().to_owned())
                .help("Daemon configuration file"),
        ));

        let defaults = DaemonConfig::new(&paths);
        installer.install(&defaults, &mut flags)?;
        service.install(&defaults, &mut flags);

        Ok(CommandDescriptor {
            version: self.build.version_string(),
            policy: ArgsPolicy::NoArgs,
            flags: flags.finish()?,
            defaults,
            default_config_file: paths.config_file().to_path_buf(),
            runtime,
        })
    }
}
