//! Parsing of `[ADDRESS/]INTERFACE.METHOD` and `[ADDRESS/]INTERFACE` targets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use varlink_config::{AddressParseError, ServiceAddress};

/// A fully qualified method, optionally pinned to a service address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct QualifiedTarget {
    pub(crate) address: Option<ServiceAddress>,
    pub(crate) interface: String,
    pub(crate) method: String,
}

impl QualifiedTarget {
    /// The `interface.Method` name sent on the wire.
    pub(crate) fn member(&self) -> String {
        format!("{}.{}", self.interface, self.method)
    }
}

impl fmt::Display for QualifiedTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(address) = &self.address {
            write!(formatter, "{address}/")?;
        }
        write!(formatter, "{}.{}", self.interface, self.method)
    }
}

impl FromStr for QualifiedTarget {
    type Err = TargetParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (address, name) = split_address(input)?;
        let (interface, method) = name
            .rsplit_once('.')
            .ok_or_else(|| TargetParseError::MissingSeparator(name.to_owned()))?;
        if interface.is_empty() {
            return Err(TargetParseError::MissingInterface(input.to_owned()));
        }
        if method.is_empty() {
            return Err(TargetParseError::MissingMethod(input.to_owned()));
        }
        Ok(Self {
            address,
            interface: interface.to_owned(),
            method: method.to_owned(),
        })
    }
}

/// An interface name, optionally pinned to a service address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct InterfaceTarget {
    pub(crate) address: Option<ServiceAddress>,
    pub(crate) interface: String,
}

impl FromStr for InterfaceTarget {
    type Err = TargetParseError;

    /// A trailing `.` left behind by completion is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (address, name) = split_address(input)?;
        let interface = name.strip_suffix('.').unwrap_or(name);
        if interface.is_empty() {
            return Err(TargetParseError::MissingInterface(input.to_owned()));
        }
        if !interface.contains('.') {
            return Err(TargetParseError::MissingSeparator(interface.to_owned()));
        }
        Ok(Self {
            address,
            interface: interface.to_owned(),
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum TargetParseError {
    #[error("'{0}' is not a qualified name")]
    MissingSeparator(String),
    #[error("missing interface in '{0}'")]
    MissingInterface(String),
    #[error("missing method in '{0}'")]
    MissingMethod(String),
    #[error(transparent)]
    Address(#[from] AddressParseError),
}

/// Splits an optional `ADDRESS/` prefix off at the last `/`.
pub(crate) fn split_address(
    input: &str,
) -> Result<(Option<ServiceAddress>, &str), TargetParseError> {
    match input.rsplit_once('/') {
        Some((address, name)) => Ok((Some(address.parse()?), name)),
        None => Ok((None, input)),
    }
}
