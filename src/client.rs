//! The narrow, typed façade: construct, connect, and drive PUT/PUTA/GET/GETACQ against
//! the server. Everything here forwards into [`crate::engine::ProtocolEngine`]; this
//! module owns no protocol logic of its own.

use crate::engine::{GetResult, ProtocolEngine};
use crate::error::Error;
use crate::key::{Key, Record, RecordsSet};
use crate::payload::PayloadAdapter;
use crate::transport::{TcpTransport, Transport};

/// A connection to the server bound to one payload type `A::Payload` and one transport
/// implementation `T` (defaulting to a plain TCP socket).
pub struct Client<A: PayloadAdapter, T: Transport = TcpTransport> {
    host: String,
    port: u16,
    adapter: A,
    engine: ProtocolEngine<T>,
}

impl<A: PayloadAdapter> Client<A, TcpTransport> {
    pub fn new(host: impl Into<String>, port: u16, adapter: A) -> Self {
        Client::with_transport(host, port, adapter, TcpTransport::new())
    }

    pub fn with_memory_limit(host: impl Into<String>, port: u16, adapter: A, memory_limit: usize) -> Self {
        let mut client = Client::new(host, port, adapter);
        client.engine.set_memory_limit(memory_limit);
        client
    }
}

impl<A: PayloadAdapter, T: Transport> Client<A, T> {
    pub fn with_transport(host: impl Into<String>, port: u16, adapter: A, transport: T) -> Self {
        Client {
            host: host.into(),
            port,
            adapter,
            engine: ProtocolEngine::new(transport),
        }
    }

    pub fn connect(&mut self) -> Result<(), Error> {
        self.engine.connect(&self.host, self.port)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.engine.close()
    }

    pub fn set_timeout(&mut self, millis: u64) -> Result<(), Error> {
        self.engine.set_timeout(millis)
    }

    pub fn set_memory_limit(&mut self, bytes: usize) {
        self.engine.set_memory_limit(bytes)
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    pub fn put(&mut self, records: &[Record<A::Payload>]) -> Result<(i64, i64), Error> {
        self.engine.put(&self.adapter, records)
    }

    pub fn puta(&mut self, records: &[Record<A::Payload>]) -> Result<(i64, i64), Error> {
        self.engine.puta(&self.adapter, records)
    }

    pub fn get(&mut self, key_min: &Key, key_max: &Key) -> GetResult<A::Payload> {
        self.engine.get(&self.adapter, key_min, key_max)
    }

    pub fn get_acq(&mut self, key_min: &Key, key_max: &Key) -> Result<i64, Error> {
        self.engine.get_acq(key_min, key_max)
    }

    pub fn get_stream(
        &mut self,
        key_min: &Key,
        key_max: &Key,
        callback: impl FnMut(RecordsSet<A::Payload>),
    ) -> Result<i64, Error> {
        self.engine.get_stream(&self.adapter, key_min, key_max, callback)
    }
}
