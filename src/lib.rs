//! A wire protocol engine for the tstorage time-series database: a stateful, buffered,
//! bit-exact TCP client speaking the server's little-endian binary framing for GET,
//! GETACQ, PUT, and PUTA over a single duplex connection.
//!
//! [`Client`] is the narrow public façade; it drives a [`ProtocolEngine`] that owns the
//! state machine, framing, and buffer. Callers supply an opaque [`PayloadAdapter`] pair
//! of serialize/deserialize callbacks so the engine never has to know the record payload
//! type.

pub(crate) mod batch;
pub(crate) mod buffer;
mod client;
pub(crate) mod codec;
mod engine;
mod error;
mod key;
mod payload;
pub mod timestamp;
mod transport;
pub mod wire;

pub use client::Client;
pub use engine::{GetError, GetResult, ProtocolEngine};
pub use error::Error;
pub use key::{Key, Record, RecordsSet};
pub use payload::PayloadAdapter;
pub use transport::{TcpTransport, Transport};
