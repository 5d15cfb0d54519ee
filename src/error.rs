use std::fmt;
use std::io;

/// Client-side error taxonomy. Disjoint from server result codes, which are
/// carried verbatim in [`Error::Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InvalidKey,
    EmptyKeyRange,
    PayloadTooLarge,
    MemoryLimitExceeded,
    OutOfMemory,
    BadResponse,
    DeserializationError,
    NotConnected,
    ConnError,
    ConnRefused,
    ConnReset,
    ConnClosed,
    ConnTimeout,
    BadAddress,
    SocketError,
    SetoptError,
    Signal,
    /// A non-zero result code reported by the server, carried verbatim.
    Server(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey => write!(f, "key violates domain constraints"),
            Error::EmptyKeyRange => write!(f, "key range is empty (kmin >= kmax)"),
            Error::PayloadTooLarge => write!(f, "serialized payload exceeds the wire size ceiling"),
            Error::MemoryLimitExceeded => write!(f, "frame would exceed the configured memory limit"),
            Error::OutOfMemory => write!(f, "buffer allocation failed"),
            Error::BadResponse => write!(f, "server response violates wire framing"),
            Error::DeserializationError => write!(f, "payload deserializer rejected a record"),
            Error::NotConnected => write!(f, "operation requires an open connection"),
            Error::ConnError => write!(f, "transport error"),
            Error::ConnRefused => write!(f, "connection refused"),
            Error::ConnReset => write!(f, "connection reset by peer"),
            Error::ConnClosed => write!(f, "connection closed"),
            Error::ConnTimeout => write!(f, "transport operation timed out"),
            Error::BadAddress => write!(f, "could not resolve server address"),
            Error::SocketError => write!(f, "socket error"),
            Error::SetoptError => write!(f, "failed to configure socket option"),
            Error::Signal => write!(f, "operation interrupted by a signal"),
            Error::Server(code) => write!(f, "server reported error {code}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            // Linux socket read/write timeouts (the platform this crate targets) surface
            // as `WouldBlock`, not `TimedOut` — `TimedOut` is what Windows uses for the
            // same condition, so both map to the same client-side error.
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::ConnTimeout,
            io::ErrorKind::ConnectionRefused => Error::ConnRefused,
            io::ErrorKind::ConnectionReset => Error::ConnReset,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::UnexpectedEof => Error::ConnClosed,
            io::ErrorKind::Interrupted => Error::Signal,
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::InvalidInput => Error::BadAddress,
            _ => Error::SocketError,
        }
    }
}
