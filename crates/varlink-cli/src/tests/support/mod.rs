//! Shared fixtures for the runtime tests.
//!
//! Provides the scripted service, a static configuration loader, and the
//! `TestWorld` that runs the CLI against in-memory streams so step
//! definitions and unit tests stay focused on their assertions.

mod fake_service;

pub(super) use fake_service::{FakeService, Script};

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use rstest::fixture;
use serde_json::Value;
use varlink_config::{Config, ServiceAddress};

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    scripts: HashMap<String, Script>,
    service: Option<FakeService>,
    stdin: Vec<u8>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
    requests: Vec<Value>,
}

impl TestWorld {
    /// Adds a scripted answer for `method`. Takes effect on the next
    /// [`TestWorld::start_service`].
    pub fn script(&mut self, method: &str, script: Script) {
        self.scripts.insert(method.to_owned(), script);
    }

    /// Starts the fake service and points the resolver at it.
    pub fn start_service(&mut self) -> Result<()> {
        let service = FakeService::spawn(self.scripts.clone())?;
        self.config.resolver = service.address();
        self.service = Some(service);
        Ok(())
    }

    pub fn service_address(&self) -> Result<ServiceAddress> {
        self.service
            .as_ref()
            .map(FakeService::address)
            .context("fake service not started")
    }

    /// Points the resolver at a port nothing listens on.
    pub fn configure_unreachable_resolver(&mut self) {
        self.config.resolver = ServiceAddress::tcp("127.0.0.1", 65535);
    }

    pub fn set_stdin(&mut self, text: &str) {
        self.stdin = text.as_bytes().to_vec();
    }

    /// Runs `varlink` with the whitespace-separated `command`.
    ///
    /// `{service}` in the command expands to the fake service's address.
    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let command = match self.service.as_ref() {
            Some(service) => command.replace("{service}", &service.address().to_string()),
            None => command.to_owned(),
        };
        let args = Self::build_args(&command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut stdin = Cursor::new(self.stdin.clone());
        let mut io = IoStreams::new(&mut stdin, &mut self.stdout, &mut self.stderr, false);
        let exit = run_with_loader(args, &mut io, &loader);
        self.exit_code = Some(exit);
        if let Some(service) = self.service.as_mut() {
            self.requests = service.take_requests()?;
        }
        self.service = None;
        Ok(())
    }

    fn build_args(command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("varlink")];
        args.extend(command.split_whitespace().map(OsString::from));
        args
    }

    pub fn stdout_text(&self) -> Result<String> {
        decode_utf8(self.stdout.clone(), "stdout")
    }

    pub fn stderr_text(&self) -> Result<String> {
        decode_utf8(self.stderr.clone(), "stderr")
    }

    pub fn requests(&self) -> &[Value] {
        &self.requests
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {:?}",
            exit
        );
        Ok(())
    }

    /// Asserts the last call the service received was `method`.
    pub fn assert_last_call(&self, method: &str) -> Result<&Value> {
        let call = self.requests.last().context("service received no calls")?;
        let received = call.get("method").and_then(Value::as_str);
        ensure!(
            received == Some(method),
            "expected call to {method}, got {call}"
        );
        Ok(call)
    }
}

pub(super) fn decode_utf8(buffer: Vec<u8>, label: &str) -> Result<String> {
    String::from_utf8(buffer).with_context(|| format!("{label} is not valid UTF-8"))
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
