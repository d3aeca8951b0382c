//! Structured telemetry initialisation for the launcher.
//!
//! Logging has to work before any configuration exists, so the launcher
//! installs a text subscriber at `info` as one of its first steps. The filter
//! and formatting layers are wrapped in [`reload`] layers: once the daemon
//! configuration has been loaded, [`LoggingHandle::reconfigure`] swaps the
//! level and format in place.

use std::fmt;
use std::io::{self, IsTerminal};
use std::sync::{Mutex, PoisonError};

use dockerd_config::{Environment, LogFormat, LogLevel};
use once_cell::sync::OnceCell;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer, Registry, reload};

/// RFC 3339 with a fixed nine-digit fraction, always in UTC.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");

type FilterLayer = reload::Layer<EnvFilter, Registry>;
type Filtered = Layered<FilterLayer, Registry>;
type FormatLayer = Box<dyn Layer<Filtered> + Send + Sync>;

static LOGGING: OnceCell<LoggingHandle> = OnceCell::new();

/// Serialises tests that touch the process-wide subscriber.
#[cfg(test)]
pub(crate) static LOGGING_LOCK: once_cell::sync::Lazy<Mutex<()>> =
    once_cell::sync::Lazy::new(|| Mutex::new(()));

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
    /// The installed subscriber rejected a layer swap.
    #[error("failed to reconfigure logging: {0}")]
    Reload(#[source] reload::Error),
}

/// Terminal capabilities of the standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdStreams {
    stdout_ansi: bool,
    stderr_ansi: bool,
}

impl StdStreams {
    /// Inspects the process's standard streams.
    ///
    /// Escape sequences are used only on terminals. On Windows the console
    /// must also be known to translate them.
    #[must_use]
    pub fn resolve(env: &dyn Environment) -> Self {
        let console = console_translates_ansi(env);
        Self {
            stdout_ansi: console && io::stdout().is_terminal(),
            stderr_ansi: console && io::stderr().is_terminal(),
        }
    }

    /// Streams with explicit capabilities.
    #[must_use]
    pub const fn with_ansi(stdout_ansi: bool, stderr_ansi: bool) -> Self {
        Self {
            stdout_ansi,
            stderr_ansi,
        }
    }

    /// Whether standard output accepts escape sequences.
    #[must_use]
    pub const fn stdout_ansi(&self) -> bool {
        self.stdout_ansi
    }

    /// Whether standard error accepts escape sequences.
    #[must_use]
    pub const fn stderr_ansi(&self) -> bool {
        self.stderr_ansi
    }
}

fn console_translates_ansi(env: &dyn Environment) -> bool {
    if !cfg!(windows) {
        return true;
    }
    env.var_os("WT_SESSION").is_some()
        || env.var_os("ConEmuANSI").is_some_and(|value| value == "ON")
        || env.var_os("TERM").is_some()
}

/// Installs the process-wide log subscriber.
pub trait LoggingBootstrap {
    /// Installs the default subscriber. Must be idempotent.
    fn install(&self, streams: &StdStreams) -> Result<(), TelemetryError>;
}

/// Installs the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLogging;

impl LoggingBootstrap for SystemLogging {
    fn install(&self, streams: &StdStreams) -> Result<(), TelemetryError> {
        initialise(streams).map(|_| ())
    }
}

/// Handle to the reloadable layers of the installed subscriber.
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    format: reload::Handle<FormatLayer, Filtered>,
    ansi: bool,
    current: Mutex<(LogLevel, LogFormat)>,
}

impl fmt::Debug for LoggingHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoggingHandle")
            .field("ansi", &self.ansi)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl LoggingHandle {
    /// Switches level and format without dropping buffered output.
    pub fn reconfigure(&self, level: LogLevel, format: LogFormat) -> Result<(), TelemetryError> {
        let filter = EnvFilter::try_new(level.as_filter())
            .map_err(|error| TelemetryError::Filter(error.to_string()))?;
        self.filter.reload(filter).map_err(TelemetryError::Reload)?;
        self.format
            .reload(format_layer(format, self.ansi))
            .map_err(TelemetryError::Reload)?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = (level, format);
        tracing::debug!(
            target: concat!(env!("CARGO_PKG_NAME"), "::telemetry"),
            level = %level,
            format = %format,
            "logging reconfigured"
        );
        Ok(())
    }

    /// Level and format currently in force.
    #[must_use]
    pub fn current(&self) -> (LogLevel, LogFormat) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Configures the global subscriber when invoked for the first time.
///
/// Later calls return the handle created by the first one.
pub fn initialise(streams: &StdStreams) -> Result<&'static LoggingHandle, TelemetryError> {
    LOGGING.get_or_try_init(|| install_subscriber(streams.stderr_ansi()))
}

/// The installed handle, if [`initialise`] has run.
#[must_use]
pub fn handle() -> Option<&'static LoggingHandle> {
    LOGGING.get()
}

fn install_subscriber(ansi: bool) -> Result<LoggingHandle, TelemetryError> {
    let (filter_layer, filter) = reload::Layer::new(EnvFilter::new(LogLevel::default().as_filter()));
    let (format_layer, format) = reload::Layer::new(format_layer(LogFormat::default(), ansi));
    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(LoggingHandle {
        filter,
        format,
        ansi,
        current: Mutex::new((LogLevel::default(), LogFormat::default())),
    })
}

fn format_layer(format: LogFormat, ansi: bool) -> FormatLayer {
    let layer = tracing_subscriber::fmt::layer::<Filtered>()
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(UtcTime::new(TIMESTAMP_FORMAT));
    match format {
        LogFormat::Text => Box::new(layer),
        LogFormat::Json => Box::new(layer.json().flatten_event(true)),
    }
}

#[cfg(test)]
mod tests {
    use dockerd_config::MapEnvironment;
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn timestamps_keep_nine_fractional_digits() {
        let moment = OffsetDateTime::from_unix_timestamp(1_136_214_245).expect("valid timestamp");
        let rendered = moment.format(TIMESTAMP_FORMAT).expect("format succeeds");
        assert_eq!(rendered, "2006-01-02T15:04:05.000000000Z");
    }

    #[cfg(unix)]
    #[test]
    fn unix_consoles_translate_escape_sequences() {
        assert!(console_translates_ansi(&MapEnvironment::new()));
    }

    #[test]
    fn initialise_is_idempotent_and_reconfigurable() {
        let _serial = LOGGING_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let streams = StdStreams::with_ansi(false, false);

        let first = initialise(&streams).expect("first initialise");
        let second = initialise(&streams).expect("second initialise");
        assert!(std::ptr::eq(first, second), "handle must be shared");
        assert!(handle().is_some_and(|installed| std::ptr::eq(installed, first)));

        first
            .reconfigure(LogLevel::Debug, LogFormat::Json)
            .expect("reconfigure to debug json");
        assert_eq!(first.current(), (LogLevel::Debug, LogFormat::Json));

        first
            .reconfigure(LogLevel::default(), LogFormat::default())
            .expect("restore defaults");
        assert_eq!(first.current(), (LogLevel::Info, LogFormat::Text));
    }

    #[test]
    fn explicit_streams_report_their_capabilities() {
        let streams = StdStreams::with_ansi(true, false);
        assert!(streams.stdout_ansi());
        assert!(!streams.stderr_ansi());
    }
}
