//! Socket transport for varlink connections.
//!
//! [`connect`] opens a stream to a [`ServiceAddress`] and wraps it in a
//! [`Connection`], which frames NUL-terminated messages and exposes them
//! through the [`Channel`] trait so the event loop stays transport agnostic.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::mem;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};
use tracing::debug;
use varlink_config::ServiceAddress;

use crate::errors::AppError;
use crate::protocol::{CallMessage, ReplyEvent};

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest a single read blocks before the event loop regains control.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one attempt to read a reply.
#[derive(Debug)]
pub(crate) enum Poll {
    Reply(ReplyEvent),
    /// No complete message arrived within the poll interval.
    Pending,
    /// The peer closed the connection.
    Closed,
}

/// A bidirectional message channel to a single service.
pub(crate) trait Channel {
    fn send(&mut self, message: &CallMessage<'_>) -> Result<(), AppError>;

    fn poll_reply(&mut self) -> Result<Poll, AppError>;

    /// Releases the connection. Closing twice has no further effect.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// An open connection to a service.
pub(crate) struct Connection {
    address: String,
    reader: BufReader<Stream>,
    pending: Vec<u8>,
    closed: bool,
}

impl Connection {
    fn new(address: &ServiceAddress, stream: Stream) -> Result<Self, AppError> {
        stream
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|source| AppError::Connect {
                address: address.to_string(),
                source,
            })?;
        Ok(Self {
            address: address.to_string(),
            reader: BufReader::new(stream),
            pending: Vec::new(),
            closed: false,
        })
    }
}

impl Channel for Connection {
    fn send(&mut self, message: &CallMessage<'_>) -> Result<(), AppError> {
        if self.closed {
            return Err(AppError::ConnectionClosed);
        }
        let frame = message.encode()?;
        debug!(address = %self.address, method = message.method(), "sending call");
        let stream = self.reader.get_mut();
        stream.write_all(&frame).map_err(AppError::SendCall)?;
        stream.flush().map_err(AppError::SendCall)
    }

    fn poll_reply(&mut self) -> Result<Poll, AppError> {
        if self.closed {
            return Ok(Poll::Closed);
        }
        match self.reader.read_until(0, &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(Poll::Closed),
            Ok(0) => Err(AppError::InvalidMessage(String::from(
                "connection closed inside a message",
            ))),
            Ok(_) if self.pending.last() == Some(&0) => {
                self.pending.pop();
                let frame = mem::take(&mut self.pending);
                ReplyEvent::decode(&frame).map(Poll::Reply)
            }
            // Partial frame; the next read either completes it or reports EOF.
            Ok(_) => Ok(Poll::Pending),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Poll::Pending)
            }
            Err(error) => Err(AppError::ReadReply(error)),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.reader.get_ref().shutdown() {
            debug!(address = %self.address, %error, "connection shutdown failed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens a connection to `address`.
pub(crate) fn connect(address: &ServiceAddress) -> Result<Connection, AppError> {
    let connect_error = |source| AppError::Connect {
        address: address.to_string(),
        source,
    };
    let stream = match address {
        ServiceAddress::Tcp { host, port } => {
            let socket_address = resolve_tcp_address(host, *port).map_err(connect_error)?;
            TcpStream::connect_timeout(&socket_address, CONNECTION_TIMEOUT)
                .map(Stream::Tcp)
                .map_err(connect_error)?
        }
        ServiceAddress::Unix { path } => connect_unix(address, path.as_str())?,
        ServiceAddress::Abstract { name } => connect_abstract(address, name)?,
    };
    debug!(%address, "connected");
    Connection::new(address, stream)
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(address: &ServiceAddress, path: &str) -> Result<Stream, AppError> {
    let open = || -> io::Result<Stream> {
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        let socket_address = SockAddr::unix(path)?;
        socket.connect_timeout(&socket_address, CONNECTION_TIMEOUT)?;
        Ok(Stream::Unix(socket.into()))
    };
    open().map_err(|source| AppError::Connect {
        address: address.to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn connect_unix(address: &ServiceAddress, _path: &str) -> Result<Stream, AppError> {
    Err(AppError::UnsupportedAddress(address.to_string()))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_abstract(address: &ServiceAddress, name: &str) -> Result<Stream, AppError> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr as UnixSocketAddr;

    let open = || -> io::Result<Stream> {
        let socket_address = UnixSocketAddr::from_abstract_name(name.as_bytes())?;
        UnixStream::connect_addr(&socket_address).map(Stream::Unix)
    };
    open().map_err(|source| AppError::Connect {
        address: address.to_string(),
        source,
    })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(address: &ServiceAddress, _name: &str) -> Result<Stream, AppError> {
    Err(AppError::UnsupportedAddress(address.to_string()))
}
