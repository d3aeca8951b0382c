use std::fmt;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use url::Url;

/// Default plain-HTTP TCP port used when a `tcp://` host omits the port.
pub const DEFAULT_HTTP_PORT: u16 = 2375;

/// Bytes escaped when a socket path is written as a URL path.
///
/// `%` is included so literal percent signs survive decoding.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Address the daemon API listens on, as given to `-H/--host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind.
        port: u16,
    },
    /// Socket activated by the service manager (`fd://`).
    Fd {
        /// Socket name or number; empty selects every passed socket.
        name: String,
    },
    /// Windows named pipe endpoint.
    NamedPipe {
        /// Pipe path, for example `//./pipe/docker_engine`.
        path: String,
    },
}

impl HostEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } | Self::Fd { .. } | Self::NamedPipe { .. } => None,
        }
    }

    /// Ensures a Unix socket's parent directory exists.
    ///
    /// Other transports need no filesystem preparation.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
            return Err(SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }

        if let Err(source) = builder.create(parent)
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(
                formatter,
                "unix://{}",
                utf8_percent_encode(&path.to_string_lossy(), PATH_ESCAPES)
            ),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
            Self::Fd { name } => write!(formatter, "fd://{name}"),
            Self::NamedPipe { path } => write!(formatter, "npipe://{path}"),
        }
    }
}

impl FromStr for HostEndpoint {
    type Err = HostParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "unix" => {
                let path = percent_decode_str(url.path())
                    .decode_utf8()
                    .map_err(|_| HostParseError::InvalidEncoding(input.to_owned()))?;
                if path.is_empty() {
                    return Err(HostParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path.into_owned()))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| HostParseError::MissingHost(input.to_owned()))?;
                Ok(Self::tcp(host, url.port().unwrap_or(DEFAULT_HTTP_PORT)))
            }
            "fd" => Ok(Self::Fd {
                name: url.host_str().unwrap_or_default().to_owned(),
            }),
            "npipe" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(HostParseError::MissingPipePath(input.to_owned()));
                }
                Ok(Self::NamedPipe {
                    path: path.to_owned(),
                })
            }
            other => Err(HostParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Errors encountered while parsing a [`HostEndpoint`] from text.
#[derive(Debug, Error)]
pub enum HostParseError {
    /// Scheme was not recognised.
    #[error("unsupported host scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// A percent-encoded path did not decode to UTF-8.
    #[error("invalid path encoding in '{0}'")]
    InvalidEncoding(String),
    /// Named pipe path was absent.
    #[error("missing named pipe path in '{0}'")]
    MissingPipePath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{}' has no parent directory", path.display())]
    MissingParent {
        /// Socket path without a parent.
        path: PathBuf,
    },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{}': {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
