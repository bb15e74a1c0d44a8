//! Wire messages exchanged with a service.
//!
//! Each message is a JSON object terminated by a single NUL byte. Calls carry
//! `method`, optional `parameters` and the `more` flag; replies carry optional
//! `parameters`, `continues` and `error`.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Parameters of a call: a JSON object.
pub(crate) type Parameters = Map<String, Value>;

/// Bit set of call options.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct CallFlags(u8);

impl CallFlags {
    pub(crate) const NONE: Self = Self(0);
    /// The caller accepts more than one reply.
    pub(crate) const MORE: Self = Self(1);

    pub(crate) const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CallFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CallMessage<'a> {
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Parameters>,
    #[serde(skip_serializing_if = "is_false")]
    more: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<'a> CallMessage<'a> {
    pub(crate) fn new(method: &'a str, parameters: Option<&'a Parameters>, flags: CallFlags) -> Self {
        Self {
            method,
            parameters,
            more: flags.contains(CallFlags::MORE),
        }
    }

    pub(crate) fn method(&self) -> &str {
        self.method
    }

    /// Serialises the call into a NUL-terminated frame.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, AppError> {
        let mut frame = serde_json::to_vec(self).map_err(AppError::SerialiseCall)?;
        frame.push(0);
        Ok(frame)
    }
}

/// One reply read from the connection.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct ReplyEvent {
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) parameters: Option<Value>,
    #[serde(default)]
    pub(crate) continues: bool,
}

impl ReplyEvent {
    /// Decodes a frame with its terminator already stripped.
    pub(crate) fn decode(frame: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(frame).map_err(|error| AppError::InvalidMessage(error.to_string()))
    }

    pub(crate) fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_without_parameters_omits_optional_fields() {
        let frame = CallMessage::new("org.example.ping.Ping", None, CallFlags::NONE)
            .encode()
            .expect("call encodes");
        assert_eq!(frame, b"{\"method\":\"org.example.ping.Ping\"}\0");
    }

    #[test]
    fn call_with_more_sets_flag() {
        let parameters = json!({"count": 3});
        let parameters = parameters.as_object().expect("object");
        let frame = CallMessage::new("org.example.Count", Some(parameters), CallFlags::MORE)
            .encode()
            .expect("call encodes");
        let text = std::str::from_utf8(&frame[..frame.len() - 1]).expect("utf8");
        let value: Value = serde_json::from_str(text).expect("json");
        assert_eq!(
            value,
            json!({"method": "org.example.Count", "parameters": {"count": 3}, "more": true})
        );
    }

    #[test]
    fn reply_fields_default_when_absent() {
        let reply = ReplyEvent::decode(b"{}").expect("reply decodes");
        assert_eq!(reply, ReplyEvent::default());
        assert!(!reply.is_error());
    }

    #[test]
    fn error_reply_is_detected() {
        let reply = ReplyEvent::decode(br#"{"error":"org.example.NotFound","parameters":{"id":1}}"#)
            .expect("reply decodes");
        assert!(reply.is_error());
        assert_eq!(reply.parameters, Some(json!({"id": 1})));
    }

    #[test]
    fn malformed_reply_is_invalid_message() {
        let error = ReplyEvent::decode(b"{\"error\": 5}").expect_err("reply is rejected");
        assert!(matches!(error, AppError::InvalidMessage(_)));
    }

    #[test]
    fn flags_combine() {
        let flags = CallFlags::NONE | CallFlags::MORE;
        assert!(flags.contains(CallFlags::MORE));
        assert!(!CallFlags::NONE.contains(CallFlags::MORE));
    }
}
