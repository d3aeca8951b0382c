//! Flag-to-field bindings for the daemon command line.
//!
//! Installers do not mutate a shared configuration while the command is being
//! assembled. Each installer pushes immutable [`FlagBinding`]s (a `clap`
//! argument plus the function that copies its parsed value into a
//! [`DaemonConfig`]) onto a [`FlagSetBuilder`]. [`FlagSetBuilder::finish`]
//! validates the whole batch at once, and [`FlagSet::bind`] later turns the
//! parsed matches into a finished configuration value.

use std::collections::{BTreeMap, BTreeSet};

use clap::parser::ValueSource;
use clap::{Arg, ArgMatches};
use thiserror::Error;

use crate::config::{DaemonConfig, LabelParseError};

/// Copies a parsed flag value into the configuration.
pub type ApplyFn = fn(&ArgMatches, &mut DaemonConfig) -> Result<(), BindError>;

/// Names `clap` reserves for its generated help flag.
const RESERVED_LONG: &str = "help";
const RESERVED_SHORT: char = 'h';

/// A command-line flag and the configuration field it populates.
#[derive(Clone)]
pub struct FlagBinding {
    arg: Arg,
    apply: Option<ApplyFn>,
}

impl FlagBinding {
    /// Binds `arg` to the configuration through `apply`.
    #[must_use]
    pub fn new(arg: Arg, apply: ApplyFn) -> Self {
        Self {
            arg,
            apply: Some(apply),
        }
    }

    /// A flag read directly by the command rather than bound to a field.
    #[must_use]
    pub fn unbound(arg: Arg) -> Self {
        Self { arg, apply: None }
    }

    /// The underlying `clap` argument.
    #[must_use]
    pub fn arg(&self) -> &Arg {
        &self.arg
    }

    /// Flag identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.arg.get_id().as_str()
    }
}

impl std::fmt::Debug for FlagBinding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FlagBinding")
            .field("id", &self.id())
            .field("long", &self.arg.get_long())
            .field("short", &self.arg.get_short())
            .field("bound", &self.apply.is_some())
            .finish()
    }
}

/// Errors raised while assembling a flag set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
    /// Two bindings share an identifier or long name.
    #[error("flag redefined: {name}")]
    DuplicateFlag {
        /// Conflicting name.
        name: String,
    },
    /// Two bindings share a short alias.
    #[error("unable to redefine {short:?} shorthand in flag set: already used for {existing}")]
    DuplicateShort {
        /// Conflicting shorthand.
        short: char,
        /// Flag that registered the shorthand first.
        existing: String,
    },
    /// A binding uses a name reserved for help output.
    #[error("flag name {name} is reserved")]
    Reserved {
        /// Reserved name.
        name: String,
    },
    /// An installer could not bind one of its inputs.
    #[error("invalid default for --{flag}: {reason}")]
    InvalidDefault {
        /// Flag whose default was rejected.
        flag: String,
        /// Why the default was rejected.
        reason: String,
    },
}

/// Errors raised while copying parsed values into the configuration.
#[derive(Debug, Error)]
pub enum BindError {
    /// A `--label` value was malformed.
    #[error("invalid --label: {0}")]
    Label(#[from] LabelParseError),
    /// A flag value could not be combined with the rest of the configuration.
    #[error("invalid --{flag}: {reason}")]
    Invalid {
        /// Offending flag.
        flag: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Accumulates bindings from one or more installers.
#[derive(Debug, Default)]
pub struct FlagSetBuilder {
    bindings: Vec<FlagBinding>,
}

impl FlagSetBuilder {
    /// Builds an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding. Collisions are reported by [`FlagSetBuilder::finish`].
    pub fn push(&mut self, binding: FlagBinding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// Number of bindings pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true when no binding has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Validates the batch and freezes it.
    pub fn finish(self) -> Result<FlagSet, FlagError> {
        let mut names = BTreeSet::new();
        let mut shorts: BTreeMap<char, String> = BTreeMap::new();
        for binding in &self.bindings {
            let id = binding.id().to_owned();
            let long = binding.arg.get_long();
            for name in std::iter::once(id.as_str()).chain(long) {
                if name == RESERVED_LONG {
                    return Err(FlagError::Reserved {
                        name: name.to_owned(),
                    });
                }
            }
            if !names.insert(id.clone()) {
                return Err(FlagError::DuplicateFlag { name: id });
            }
            if let Some(long) = long
                && long != id
                && !names.insert(long.to_owned())
            {
                return Err(FlagError::DuplicateFlag {
                    name: long.to_owned(),
                });
            }
            if let Some(short) = binding.arg.get_short() {
                if short == RESERVED_SHORT {
                    return Err(FlagError::Reserved {
                        name: short.to_string(),
                    });
                }
                if let Some(existing) = shorts.insert(short, id.clone()) {
                    return Err(FlagError::DuplicateShort { short, existing });
                }
            }
        }
        Ok(FlagSet {
            bindings: self.bindings,
        })
    }
}

/// A validated, immutable set of flag bindings.
#[derive(Debug, Clone)]
pub struct FlagSet {
    bindings: Vec<FlagBinding>,
}

impl FlagSet {
    /// Arguments to register on the `clap` command, in installation order.
    pub fn args(&self) -> impl Iterator<Item = &Arg> {
        self.bindings.iter().map(FlagBinding::arg)
    }

    /// Returns true when a flag with this identifier is part of the set.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.bindings.iter().any(|binding| binding.id() == id)
    }

    /// Number of flags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true when the set holds no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Applies every bound flag to `defaults`, producing the final value.
    pub fn bind(
        &self,
        matches: &ArgMatches,
        defaults: DaemonConfig,
    ) -> Result<DaemonConfig, BindError> {
        let mut config = defaults;
        for binding in &self.bindings {
            if let Some(apply) = binding.apply {
                apply(matches, &mut config)?;
            }
        }
        Ok(config)
    }

    /// Identifiers of flags given explicitly on the command line.
    #[must_use]
    pub fn explicit(&self, matches: &ArgMatches) -> BTreeSet<String> {
        self.bindings
            .iter()
            .map(FlagBinding::id)
            .filter(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
            .map(str::to_owned)
            .collect()
    }
}
