//! Loading of call parameters from the command line or stdin.

use std::io::Read;

use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;
use crate::protocol::Parameters;

const INITIAL_CAPACITY: usize = 1024;

/// Where the raw parameter text comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum RawParameters {
    Text(String),
    /// Read the whole of stdin (`-` on the command line).
    Stdin,
}

impl RawParameters {
    pub(crate) fn from_argument(argument: String) -> Self {
        if argument == "-" {
            Self::Stdin
        } else {
            Self::Text(argument)
        }
    }
}

/// Produces the parameter object for a call.
///
/// Absent or empty input yields `None`, so the call carries no parameters.
/// Anything else must parse as a JSON object.
pub(crate) fn load_parameters<R: Read>(
    raw: Option<&RawParameters>,
    stdin: &mut R,
) -> Result<Option<Parameters>, AppError> {
    let text = match raw {
        None => return Ok(None),
        Some(RawParameters::Text(text)) => text.clone(),
        Some(RawParameters::Stdin) => read_stdin(stdin)?,
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(&text).map_err(AppError::InvalidParameters)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(AppError::ParametersNotObject),
    }
}

fn read_stdin<R: Read>(stdin: &mut R) -> Result<String, AppError> {
    let mut buffer = String::with_capacity(INITIAL_CAPACITY);
    stdin
        .read_to_string(&mut buffer)
        .map_err(AppError::ReadParameters)?;
    debug!(bytes = buffer.len(), "read parameters from stdin");
    Ok(buffer)
}
