use std::collections::VecDeque;

use tstorage_client::{PayloadAdapter, Transport};

/// An in-memory duplex transport double for integration tests — the same shape as the
/// engine's own internal mock, rebuilt here since integration tests only see the crate's
/// public surface.
pub struct MockTransport {
    connected: bool,
    inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            connected: false,
            inbound: VecDeque::new(),
            outbound: Vec::new(),
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> Result<(), tstorage_client::Error> {
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, buf: &[u8]) -> Result<usize, tstorage_client::Error> {
        if !self.connected {
            return Err(tstorage_client::Error::NotConnected);
        }
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, tstorage_client::Error> {
        if !self.connected {
            return Err(tstorage_client::Error::NotConnected);
        }
        if self.inbound.is_empty() {
            return Ok(0);
        }
        let count = buf.len().min(self.inbound.len());
        for slot in buf.iter_mut().take(count) {
            *slot = self.inbound.pop_front().unwrap();
        }
        Ok(count)
    }

    fn set_timeout(&mut self, _millis: u64) -> Result<(), tstorage_client::Error> {
        Ok(())
    }

    fn abort(&mut self) {
        self.connected = false;
    }

    fn close(&mut self) -> Result<(), tstorage_client::Error> {
        if !self.connected {
            return Err(tstorage_client::Error::NotConnected);
        }
        self.connected = false;
        Ok(())
    }
}

/// A payload adapter over raw byte vectors.
pub struct BytesAdapter;

impl PayloadAdapter for BytesAdapter {
    type Payload = Vec<u8>;

    fn serialize(&self, value: &Vec<u8>, span: &mut [u8]) -> usize {
        if span.len() >= value.len() {
            span[..value.len()].copy_from_slice(value);
        }
        value.len()
    }

    fn deserialize(&self, span: &[u8]) -> Option<Vec<u8>> {
        Some(span.to_vec())
    }
}

/// A payload adapter that always refuses to deserialize.
pub struct RejectingAdapter;

impl PayloadAdapter for RejectingAdapter {
    type Payload = Vec<u8>;

    fn serialize(&self, value: &Vec<u8>, span: &mut [u8]) -> usize {
        if span.len() >= value.len() {
            span[..value.len()].copy_from_slice(value);
        }
        value.len()
    }

    fn deserialize(&self, _span: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

/// Hand-assembles a well-formed PUT/PUTA acknowledgement: `result=0, size=16,
/// acq_min, acq_max`.
pub fn put_ack_bytes(acq_min: i64, acq_max: i64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(28);
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&16u64.to_le_bytes());
    bytes.extend_from_slice(&acq_min.to_le_bytes());
    bytes.extend_from_slice(&acq_max.to_le_bytes());
    bytes
}

/// Hand-assembles a well-formed GET response body: a run of `(key, payload)` records
/// followed by the end-of-records marker, closing response header, and trailing `acq`.
pub fn get_response_bytes(records: &[(tstorage_client::Key, Vec<u8>)], acq: i64) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0i32.to_le_bytes()); // result
    bytes.extend_from_slice(&0u64.to_le_bytes()); // size (unused by the client)

    for (key, payload) in records {
        let record_size = 32 + payload.len();
        bytes.extend_from_slice(&(record_size as i32).to_le_bytes());
        bytes.extend_from_slice(&key.cid.to_le_bytes());
        bytes.extend_from_slice(&key.mid.to_le_bytes());
        bytes.extend_from_slice(&key.moid.to_le_bytes());
        bytes.extend_from_slice(&key.cap.to_le_bytes());
        bytes.extend_from_slice(&key.acq.to_le_bytes());
        bytes.extend_from_slice(payload);
    }

    bytes.extend_from_slice(&0i32.to_le_bytes()); // end-of-records marker
    bytes.extend_from_slice(&0i32.to_le_bytes()); // closing result
    bytes.extend_from_slice(&0u64.to_le_bytes()); // closing size
    bytes.extend_from_slice(&acq.to_le_bytes());
    bytes
}

/// Hand-assembles a bare GETACQ response: `result=0, size=0, acq`.
pub fn getacq_response_bytes(acq: i64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(20);
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&acq.to_le_bytes());
    bytes
}
