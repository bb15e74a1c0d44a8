//! Single-shot calls used by `help`, `info`, resolution and completion.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use varlink_config::{Config, ServiceAddress};

use crate::errors::AppError;
use crate::event_loop::{EventLoop, ReplyHandler, ReplyState};
use crate::idl::{InterfaceDescription, parse_description};
use crate::protocol::{CallFlags, CallMessage, Parameters, ReplyEvent};
use crate::transport::{self, Channel, Connection};

pub(crate) const RESOLVER_INTERFACE: &str = "org.varlink.resolver";
const RESOLVE_METHOD: &str = "org.varlink.resolver.Resolve";
const RESOLVER_INFO_METHOD: &str = "org.varlink.resolver.GetInfo";
const SERVICE_INFO_METHOD: &str = "org.varlink.service.GetInfo";
const DESCRIPTION_METHOD: &str = "org.varlink.service.GetInterfaceDescription";

/// Sends one call. Replies are left for the caller to consume.
pub(crate) fn dispatch<C: Channel + ?Sized>(
    channel: &mut C,
    method: &str,
    parameters: Option<&Parameters>,
    flags: CallFlags,
) -> Result<(), AppError> {
    channel.send(&CallMessage::new(method, parameters, flags))
}

/// The only reply to a call made without `more`.
#[derive(Debug)]
pub(crate) struct SingleReply {
    pub(crate) error: Option<String>,
    pub(crate) parameters: Parameters,
}

impl SingleReply {
    fn from_event(event: ReplyEvent) -> Result<Self, AppError> {
        let parameters = match event.parameters {
            None | Some(Value::Null) => Parameters::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(AppError::InvalidMessage(String::from(
                    "reply parameters are not an object",
                )));
            }
        };
        Ok(Self {
            error: event.error,
            parameters,
        })
    }

    /// Deserialises the parameters into a typed reply.
    pub(crate) fn decode<T: DeserializeOwned>(&self, method: &str) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.parameters.clone()))
            .map_err(|error| AppError::InvalidMessage(format!("reply to {method}: {error}")))
    }
}

#[derive(Default)]
struct ReplyCollector {
    reply: Option<ReplyEvent>,
}

impl ReplyHandler for ReplyCollector {
    fn on_reply(&mut self, reply: ReplyEvent) -> ReplyState {
        self.reply = Some(reply);
        ReplyState::Done
    }
}

/// Service metadata returned by `org.varlink.service.GetInfo`.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceInfo {
    #[serde(default)]
    pub(crate) vendor: String,
    #[serde(default)]
    pub(crate) product: String,
    #[serde(default)]
    pub(crate) version: String,
    #[serde(default)]
    pub(crate) url: String,
    pub(crate) interfaces: Vec<String>,
}

#[derive(Deserialize)]
struct InterfaceList {
    interfaces: Vec<String>,
}

#[derive(Deserialize)]
struct ResolveReply {
    address: String,
}

/// Result of asking a service for an interface description.
#[derive(Debug)]
pub(crate) enum Introspection {
    Description(InterfaceDescription),
    /// The service answered with the named error.
    RemoteError(String),
}

pub(crate) struct Client<'a> {
    config: &'a Config,
    event_loop: &'a EventLoop,
}

impl<'a> Client<'a> {
    pub(crate) fn new(config: &'a Config, event_loop: &'a EventLoop) -> Self {
        Self { config, event_loop }
    }

    pub(crate) fn event_loop(&self) -> &EventLoop {
        self.event_loop
    }

    /// Connects to `address`, or to the service resolved for `interface`.
    pub(crate) fn connect(
        &self,
        address: Option<&ServiceAddress>,
        interface: &str,
    ) -> Result<Connection, AppError> {
        match address {
            Some(address) => transport::connect(address),
            None => transport::connect(&self.resolve(interface)?),
        }
    }

    /// Asks the resolver which service implements `interface`.
    pub(crate) fn resolve(&self, interface: &str) -> Result<ServiceAddress, AppError> {
        if interface == RESOLVER_INTERFACE {
            return Ok(self.config.resolver().clone());
        }
        let failed = |reason: String| AppError::Resolve {
            interface: interface.to_owned(),
            reason,
        };

        let mut connection =
            transport::connect(self.config.resolver()).map_err(|error| failed(error.to_string()))?;
        let mut parameters = Parameters::new();
        parameters.insert(String::from("interface"), Value::from(interface));
        let reply = self
            .call_once(&mut connection, RESOLVE_METHOD, Some(&parameters))
            .map_err(|error| failed(error.to_string()))?;
        if let Some(error) = reply.error {
            return Err(failed(error));
        }
        let resolved: ResolveReply = reply
            .decode(RESOLVE_METHOD)
            .map_err(|error| failed(error.to_string()))?;
        debug!(interface, address = %resolved.address, "resolved interface");
        resolved
            .address
            .parse()
            .map_err(|error: varlink_config::AddressParseError| failed(error.to_string()))
    }

    /// Makes a call expecting exactly one reply.
    pub(crate) fn call_once<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        method: &str,
        parameters: Option<&Parameters>,
    ) -> Result<SingleReply, AppError> {
        dispatch(channel, method, parameters, CallFlags::NONE)?;
        let mut collector = ReplyCollector::default();
        self.event_loop.process_all(channel, &mut collector)?;
        let event = collector.reply.ok_or(AppError::MissingOutcome)?;
        SingleReply::from_event(event)
    }

    /// Fetches and parses the description of `interface` from `channel`.
    pub(crate) fn describe<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        interface: &str,
    ) -> Result<Introspection, AppError> {
        let mut parameters = Parameters::new();
        parameters.insert(String::from("interface"), Value::from(interface));
        let reply = self.call_once(channel, DESCRIPTION_METHOD, Some(&parameters))?;
        if let Some(error) = reply.error {
            return Ok(Introspection::RemoteError(error));
        }
        let text = reply
            .parameters
            .get("description")
            .and_then(Value::as_str)
            .ok_or(AppError::MissingField {
                method: DESCRIPTION_METHOD,
                field: "description",
            })?;
        parse_description(text)
            .map(Introspection::Description)
            .map_err(|error| AppError::InvalidDescription(error.to_string()))
    }

    /// Queries `org.varlink.service.GetInfo`.
    pub(crate) fn service_info<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
    ) -> Result<SingleReply, AppError> {
        self.call_once(channel, SERVICE_INFO_METHOD, None)
    }

    /// Lists interfaces known to the resolver, or implemented by `address`.
    pub(crate) fn interfaces(&self, address: Option<&ServiceAddress>) -> Result<Vec<String>, AppError> {
        let (target, method) = match address {
            Some(address) => (address, SERVICE_INFO_METHOD),
            None => (self.config.resolver(), RESOLVER_INFO_METHOD),
        };
        let mut connection = transport::connect(target)?;
        let reply = self.call_once(&mut connection, method, None)?;
        if let Some(error) = reply.error {
            return Err(AppError::RemoteError(error));
        }
        reply.decode::<InterfaceList>(method).map(|list| list.interfaces)
    }

    /// Lists the methods of `interface`.
    pub(crate) fn methods(
        &self,
        address: Option<&ServiceAddress>,
        interface: &str,
    ) -> Result<Vec<String>, AppError> {
        let mut connection = self.connect(address, interface)?;
        match self.describe(&mut connection, interface)? {
            Introspection::Description(description) => {
                Ok(description.method_names().map(str::to_owned).collect())
            }
            Introspection::RemoteError(error) => Err(AppError::RemoteError(error)),
        }
    }
}
