//! Fake varlink service for behavioural tests.
//!
//! Listens on an ephemeral TCP port and answers NUL-terminated calls from a
//! table of scripted replies keyed by method name. Every call received is
//! recorded. Calls to `org.varlink.resolver.Resolve` that are not scripted
//! resolve to the service's own address, so one fake can stand in for both
//! the resolver and the service it points at.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use varlink_config::ServiceAddress;

const RESOLVE_METHOD: &str = "org.varlink.resolver.Resolve";
const METHOD_NOT_FOUND: &str = "org.varlink.service.MethodNotFound";

/// Replies sent for one method.
#[derive(Clone, Debug)]
pub(in crate::tests) struct Script {
    replies: Vec<Value>,
    hang_up: bool,
}

impl Script {
    /// A single successful reply.
    pub fn reply(parameters: Value) -> Self {
        Self {
            replies: vec![json!({ "parameters": parameters })],
            hang_up: false,
        }
    }

    /// A single error reply.
    pub fn error(name: &str) -> Self {
        Self {
            replies: vec![json!({ "error": name, "parameters": {} })],
            hang_up: false,
        }
    }

    /// Several replies; every reply but the last continues.
    pub fn stream(parameters: Vec<Value>) -> Self {
        let last = parameters.len().saturating_sub(1);
        let replies = parameters
            .into_iter()
            .enumerate()
            .map(|(index, parameters)| {
                if index < last {
                    json!({ "parameters": parameters, "continues": true })
                } else {
                    json!({ "parameters": parameters })
                }
            })
            .collect();
        Self {
            replies,
            hang_up: false,
        }
    }

    /// No reply at all; the call is left waiting.
    pub fn silent() -> Self {
        Self {
            replies: Vec::new(),
            hang_up: false,
        }
    }

    /// Continuing replies followed by the service closing the connection.
    pub fn interrupted(parameters: Vec<Value>) -> Self {
        let replies = parameters
            .into_iter()
            .map(|parameters| json!({ "parameters": parameters, "continues": true }))
            .collect();
        Self {
            replies,
            hang_up: true,
        }
    }
}

/// A scripted varlink service running on a background thread.
pub(in crate::tests) struct FakeService {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    stop: Arc<AtomicBool>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeService {
    /// Starts serving `scripts` until [`FakeService::take_requests`] is called
    /// or a five second deadline passes.
    pub fn spawn(scripts: HashMap<String, Script>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake service")?;
        listener
            .set_nonblocking(true)
            .context("fake service nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));

        let responder = Responder {
            port,
            scripts,
            requests: Arc::clone(&requests),
        };
        let stop_clone = Arc::clone(&stop);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = responder.serve(&listener, &stop_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            requests,
            stop,
            result,
            handle: Some(handle),
        })
    }

    pub fn address(&self) -> ServiceAddress {
        ServiceAddress::tcp("127.0.0.1", self.port)
    }

    /// Stops the service and returns every call it received.
    pub fn take_requests(&mut self) -> Result<Vec<Value>> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake service thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake service result: {error}"))?
            .take()
        {
            outcome.context("fake service failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Responder {
    port: u16,
    scripts: HashMap<String, Script>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Responder {
    fn serve(&self, listener: &TcpListener, stop: &AtomicBool) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !stop.load(Ordering::SeqCst) && Instant::now() < deadline {
            match listener.accept() {
                Ok((stream, _)) => self.serve_connection(stream)?,
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(error) => return Err(error).context("accept connection"),
            }
        }
        Ok(())
    }

    fn serve_connection(&self, stream: TcpStream) -> Result<()> {
        stream
            .set_nonblocking(false)
            .context("blocking connection")?;
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .context("read timeout")?;
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
        let mut writer = stream;
        loop {
            let mut frame = Vec::new();
            match reader.read_until(0, &mut frame) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(error) if is_disconnect(&error) => return Ok(()),
                Err(error) => return Err(error).context("read call"),
            }
            if frame.last() == Some(&0) {
                frame.pop();
            }
            let call: Value = serde_json::from_slice(&frame).context("decode call")?;
            let method = call
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            self.requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(call);

            let script = self.script_for(&method);
            for reply in &script.replies {
                match write_frame(&mut writer, reply) {
                    Ok(()) => {}
                    Err(error) if is_disconnect(&error) => return Ok(()),
                    Err(error) => return Err(error).context("write reply"),
                }
            }
            if script.hang_up {
                return Ok(());
            }
        }
    }

    fn script_for(&self, method: &str) -> Script {
        if let Some(script) = self.scripts.get(method) {
            return script.clone();
        }
        if method == RESOLVE_METHOD {
            return Script::reply(json!({ "address": format!("tcp:127.0.0.1:{}", self.port) }));
        }
        Script {
            replies: vec![json!({ "error": METHOD_NOT_FOUND, "parameters": { "method": method } })],
            hang_up: false,
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

fn write_frame(stream: &mut impl Write, reply: &Value) -> io::Result<()> {
    let mut frame = serde_json::to_vec(reply).map_err(io::Error::other)?;
    frame.push(0);
    stream.write_all(&frame)?;
    stream.flush()
}
