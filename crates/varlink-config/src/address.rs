use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Address of a varlink service.
///
/// The textual form follows the varlink convention: `unix:/run/org.example`,
/// `unix:@abstract-name` or `tcp:127.0.0.1:12345`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceAddress {
    /// Unix domain socket bound to a filesystem path.
    Unix { path: Utf8PathBuf },
    /// Unix domain socket in the Linux abstract namespace.
    Abstract { name: String },
    /// TCP socket endpoint.
    Tcp { host: String, port: u16 },
}

impl ServiceAddress {
    /// Builds a Unix domain socket address.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket address.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket path when the address uses a filesystem socket.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Abstract { .. } | Self::Tcp { .. } => None,
        }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix:{path}"),
            Self::Abstract { name } => write!(formatter, "unix:@{name}"),
            Self::Tcp { host, port } if host.contains(':') => {
                write!(formatter, "tcp:[{host}]:{port}")
            }
            Self::Tcp { host, port } => write!(formatter, "tcp:{host}:{port}"),
        }
    }
}

impl FromStr for ServiceAddress {
    type Err = AddressParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = input.strip_prefix("unix:") {
            return parse_unix(input, rest);
        }
        if let Some(rest) = input.strip_prefix("tcp:") {
            return parse_tcp(input, rest);
        }
        match input.split_once(':') {
            Some((scheme, _)) => Err(AddressParseError::UnsupportedScheme(scheme.to_owned())),
            None => Err(AddressParseError::MissingScheme(input.to_owned())),
        }
    }
}

fn parse_unix(input: &str, rest: &str) -> Result<ServiceAddress, AddressParseError> {
    // Listening parameters such as `;mode=0666` are meaningless to a client.
    let location = rest.split(';').next().unwrap_or_default();
    if let Some(name) = location.strip_prefix('@') {
        if name.is_empty() {
            return Err(AddressParseError::MissingUnixPath(input.to_owned()));
        }
        return Ok(ServiceAddress::Abstract {
            name: name.to_owned(),
        });
    }
    if location.is_empty() {
        return Err(AddressParseError::MissingUnixPath(input.to_owned()));
    }
    let path = percent_decode_str(location)
        .decode_utf8()
        .map_err(|_| AddressParseError::InvalidEncoding(input.to_owned()))?;
    Ok(ServiceAddress::unix(path.as_ref()))
}

fn parse_tcp(input: &str, rest: &str) -> Result<ServiceAddress, AddressParseError> {
    if rest.contains('/') {
        return Err(AddressParseError::UnexpectedPath(input.to_owned()));
    }
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| AddressParseError::MissingPort(input.to_owned()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(AddressParseError::MissingHost(input.to_owned()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| AddressParseError::InvalidPort(input.to_owned()))?;
    Ok(ServiceAddress::tcp(host, port))
}

impl Serialize for ServiceAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors encountered while parsing a [`ServiceAddress`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The address carried no `scheme:` prefix.
    #[error("missing address scheme in '{0}'")]
    MissingScheme(String),
    /// Scheme was not recognised.
    #[error("unsupported address scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// TCP port was not a valid port number.
    #[error("invalid TCP port in '{0}'")]
    InvalidPort(String),
    /// TCP addresses cannot carry a path.
    #[error("unexpected path in TCP address '{0}'")]
    UnexpectedPath(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// Percent-encoded path did not decode to UTF-8.
    #[error("invalid percent-encoding in '{0}'")]
    InvalidEncoding(String),
}
