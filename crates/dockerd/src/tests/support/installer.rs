//! Flag installer that can be told to redefine an existing flag.

use clap::{Arg, ArgAction};
use dockerd_config::{
    DaemonConfig, DaemonFlags, FlagBinding, FlagError, FlagInstaller, FlagSetBuilder,
};

/// Installs the stock daemon flags plus, optionally, a duplicate.
#[derive(Debug, Clone, Default)]
pub struct TestFlags {
    duplicate: Option<String>,
}

impl TestFlags {
    /// Installer that also registers a second flag called `name`.
    #[must_use]
    pub fn redefining(name: &str) -> Self {
        Self {
            duplicate: Some(name.to_owned()),
        }
    }
}

impl FlagInstaller for TestFlags {
    fn install(&self, defaults: &DaemonConfig, flags: &mut FlagSetBuilder) -> Result<(), FlagError> {
        DaemonFlags.install(defaults, flags)?;
        if let Some(name) = &self.duplicate {
            flags.push(FlagBinding::unbound(
                Arg::new(name.clone())
                    .long(name.clone())
                    .action(ArgAction::SetTrue),
            ));
        }
        Ok(())
    }
}
