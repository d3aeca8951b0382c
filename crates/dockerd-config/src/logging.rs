use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable `key=value` lines.
    #[default]
    Text,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Minimum severity the daemon logs.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Routine operational messages.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
    /// Failures that stop the daemon.
    Fatal,
}

impl LogLevel {
    /// Filter directive understood by `tracing-subscriber`.
    ///
    /// `tracing` has no fatal level, so [`LogLevel::Fatal`] maps to `error`.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

/// Errors encountered while parsing a [`LogFormat`] or [`LogLevel`].
pub type LogParseError = strum::ParseError;
