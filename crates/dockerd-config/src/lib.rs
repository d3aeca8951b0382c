//! Configuration model for the `dockerd` launcher.
//!
//! The crate owns everything the launcher needs to know before the daemon
//! runtime takes over: detecting whether the process runs under RootlessKit,
//! deriving the mode-aware default paths, the [`DaemonConfig`] value the
//! command line binds into, and the flag installers that describe that binding.
//!
//! Nothing here touches global state apart from the process environment read
//! through [`ProcessEnvironment`]. Tests substitute [`MapEnvironment`] so path
//! resolution can be exercised without mutating the real environment.

mod certs;
mod config;
mod directives;
mod env;
mod flags;
pub mod installers;
mod logging;
mod mode;
mod paths;
mod socket;

pub use certs::{ROOTFUL_CERTS_DIR, certs_dir};
pub use config::{
    DEFAULT_SERVICE_NAME, DEFAULT_SOCKET_GROUP, DaemonConfig, Label, LabelParseError,
    ServiceOptions, TlsOptions,
};
pub use directives::{DirectiveError, FileDirectives};
pub use env::{Environment, MapEnvironment, ProcessEnvironment};
pub use flags::{ApplyFn, BindError, FlagBinding, FlagError, FlagSet, FlagSetBuilder};
pub use installers::{DaemonFlags, FlagInstaller, ServiceFlagInstaller, ServiceFlags};
pub use logging::{LogFormat, LogLevel, LogParseError};
pub use mode::{ExecutionMode, ROOTLESSKIT_STATE_DIR, RootlessDetector};
pub use paths::{
    CONFIG_FILE_NAME, PathResolutionError, ROOTFUL_CONFIG_DIR, ResolvedPaths, config_file,
};
pub use socket::{DEFAULT_HTTP_PORT, HostEndpoint, HostParseError, SocketPreparationError};
