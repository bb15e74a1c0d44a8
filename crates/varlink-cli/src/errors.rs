//! Error types and exit-status mapping for the CLI runtime.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use strum::{Display, EnumIter};
use thiserror::Error;

use crate::arguments::ArgumentError;
use crate::telemetry::TelemetryError;

/// Failure classes reported by the client.
///
/// The discriminant order is stable: each kind's [`ErrorKind::code`] is the
/// process exit status used when a command fails with that kind.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// An internal invariant was violated.
    Panic,
    /// The resolver could not map an interface to a service address.
    CannotResolve,
    /// No command was given.
    MissingCommand,
    /// The command name is unknown.
    CommandNotFound,
    /// A required argument or option value was absent.
    MissingArgument,
    /// An argument could not be understood.
    InvalidArgument,
    /// Call parameters were not a JSON object.
    InvalidJson,
    /// The service could not be reached.
    CannotConnect,
    /// No reply arrived within the configured timeout.
    Timeout,
    /// The operator interrupted the wait.
    Canceled,
    /// The service answered with an error reply.
    RemoteError,
    /// The call could not be submitted or its reply lacked required data.
    CallFailed,
    /// The service sent a message that does not follow the protocol.
    InvalidMessage,
    /// The service closed the connection before the final reply.
    ConnectionClosed,
}

impl ErrorKind {
    /// Numeric code of the kind, used as the process exit status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Panic => 1,
            Self::CannotResolve => 2,
            Self::MissingCommand => 3,
            Self::CommandNotFound => 4,
            Self::MissingArgument => 5,
            Self::InvalidArgument => 6,
            Self::InvalidJson => 7,
            Self::CannotConnect => 8,
            Self::Timeout => 9,
            Self::Canceled => 10,
            Self::RemoteError => 11,
            Self::CallFailed => 12,
            Self::InvalidMessage => 13,
            Self::ConnectionClosed => 14,
        }
    }

    /// Process exit status for a command failing with this kind.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    /// Sentinel for failures whose diagnostic has already been written.
    #[error("{0}")]
    Reported(ErrorKind),
    #[error(transparent)]
    Arguments(#[from] ArgumentError),
    #[error("failed to read parameters from stdin: {0}")]
    ReadParameters(io::Error),
    #[error("Unable to parse input parameters, must be valid JSON: {0}")]
    InvalidParameters(serde_json::Error),
    #[error("Unable to parse input parameters, expected a JSON object")]
    ParametersNotObject,
    #[error("cannot resolve interface {interface}: {reason}")]
    Resolve { interface: String, reason: String },
    #[error("failed to connect to {address}: {source}")]
    Connect { address: String, source: io::Error },
    #[error("address {0} is not supported on this platform")]
    UnsupportedAddress(String),
    #[error("failed to serialise call: {0}")]
    SerialiseCall(serde_json::Error),
    #[error("failed to send call: {0}")]
    SendCall(io::Error),
    #[error("failed to read reply: {0}")]
    ReadReply(io::Error),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out waiting for a reply")]
    Timeout,
    #[error("canceled")]
    Canceled,
    #[error("call failed with error: {0}")]
    RemoteError(String),
    #[error("reply to {method} lacks the '{field}' field")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },
    #[error("invalid interface description: {0}")]
    InvalidDescription(String),
    #[error("reply stream finished without an outcome")]
    MissingOutcome,
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("failed to install signal handlers: {0}")]
    InstallSignals(io::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl AppError {
    /// Classifies the error for exit-status reporting.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Self::LoadConfiguration(_) | Self::CliUsage(_) => ErrorKind::InvalidArgument,
            Self::Reported(kind) => *kind,
            Self::Arguments(error) => error.kind(),
            Self::ReadParameters(_) | Self::InvalidParameters(_) | Self::ParametersNotObject => {
                ErrorKind::InvalidJson
            }
            Self::Resolve { .. } => ErrorKind::CannotResolve,
            Self::Connect { .. } | Self::UnsupportedAddress(_) => ErrorKind::CannotConnect,
            Self::SerialiseCall(_) | Self::SendCall(_) | Self::MissingField { .. } => {
                ErrorKind::CallFailed
            }
            Self::ReadReply(_) | Self::ConnectionClosed => ErrorKind::ConnectionClosed,
            Self::InvalidMessage(_) | Self::InvalidDescription(_) => ErrorKind::InvalidMessage,
            Self::Timeout => ErrorKind::Timeout,
            Self::Canceled => ErrorKind::Canceled,
            Self::RemoteError(_) => ErrorKind::RemoteError,
            Self::MissingOutcome
            | Self::WriteOutput(_)
            | Self::InstallSignals(_)
            | Self::Telemetry(_) => ErrorKind::Panic,
        }
    }

    pub(crate) fn exit_code(&self) -> ExitCode {
        self.kind().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn codes_are_unique_and_nonzero() {
        let codes: HashSet<u8> = ErrorKind::iter().map(ErrorKind::code).collect();
        assert_eq!(codes.len(), ErrorKind::iter().count());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn kinds_display_their_names() {
        assert_eq!(ErrorKind::CannotConnect.to_string(), "CannotConnect");
        assert_eq!(ErrorKind::InvalidJson.to_string(), "InvalidJson");
    }

    #[test]
    fn transport_failures_map_to_distinct_kinds() {
        let connect = AppError::Connect {
            address: String::from("tcp:127.0.0.1:1"),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(connect.kind(), ErrorKind::CannotConnect);
        assert_eq!(AppError::ConnectionClosed.kind(), ErrorKind::ConnectionClosed);
        assert_eq!(
            AppError::SendCall(io::Error::from(io::ErrorKind::BrokenPipe)).kind(),
            ErrorKind::CallFailed
        );
    }
}
