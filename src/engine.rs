//! The protocol state machine: framing, request writers, response readers, streaming
//! delivery, and the client-fault/server-error split.

use crate::batch::BatchSerializer;
use crate::buffer::Buffer;
use crate::codec;
use crate::error::Error;
use crate::key::{self, Key, Record, RecordsSet};
use crate::payload::PayloadAdapter;
use crate::transport::Transport;
use crate::wire::{self, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Connected,
}

/// A GET failure carries back whatever records were decoded before the failure, so the
/// caller is never forced to discard partial progress.
#[derive(Debug)]
pub struct GetError<P> {
    pub records: RecordsSet<P>,
    pub error: Error,
}

pub type GetResult<P> = Result<(RecordsSet<P>, i64), GetError<P>>;

/// Drives one TCP connection's worth of GET/GETACQ/PUT/PUTA commands against a
/// `Transport`. Not safe for concurrent use from multiple schedulable units; the caller
/// serializes access.
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    buffer: Option<Buffer>,
    memory_limit: usize,
    pending_memory_limit: Option<usize>,
    state: State,
    batch: BatchSerializer,
}

impl<T: Transport> ProtocolEngine<T> {
    pub fn new(transport: T) -> Self {
        ProtocolEngine {
            transport,
            buffer: None,
            memory_limit: wire::DEFAULT_MEMORY_LIMIT,
            pending_memory_limit: None,
            state: State::Disconnected,
            batch: BatchSerializer::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        let _span = tracing::debug_span!("connect", host, port).entered();
        self.transport.connect(host, port)?;

        if let Some(pending) = self.pending_memory_limit.take() {
            self.memory_limit = pending;
        }
        let capacity = self.memory_limit.max(Buffer::MIN_CAPACITY);
        self.buffer = Some(Buffer::with_capacity(capacity));
        self.state = State::Connected;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), Error> {
        let _span = tracing::debug_span!("close").entered();
        self.require_connected()?;
        self.transport.close()?;
        self.buffer = None;
        self.state = State::Disconnected;
        Ok(())
    }

    pub fn set_timeout(&mut self, millis: u64) -> Result<(), Error> {
        self.transport.set_timeout(millis)
    }

    /// Takes effect immediately while Disconnected, or is recorded and applied at the
    /// next `connect` while Connected.
    pub fn set_memory_limit(&mut self, bytes: usize) {
        let bytes = bytes.max(Buffer::MIN_CAPACITY);
        match self.state {
            State::Disconnected => {
                self.memory_limit = bytes;
                self.pending_memory_limit = None;
            }
            State::Connected => self.pending_memory_limit = Some(bytes),
        }
    }

    fn require_connected(&self) -> Result<(), Error> {
        match self.state {
            State::Connected => Ok(()),
            State::Disconnected => Err(Error::NotConnected),
        }
    }

    /// A client-side fault: abort the transport, drop the buffer, and fall back to
    /// Disconnected. Returns `err` unchanged so call sites can `return Err(self.fault(e))`.
    fn fault(&mut self, err: Error) -> Error {
        tracing::warn!(error = %err, "client-side fault, aborting connection");
        self.transport.abort();
        self.buffer = None;
        self.state = State::Disconnected;
        err
    }

    /// Ensures at least `need` bytes are available to read, blocking on the transport
    /// as necessary. Call sites must only ever request a `need` the buffer's capacity
    /// can hold.
    fn fill(&mut self, need: usize) -> Result<(), Error> {
        loop {
            if self.buffer.as_ref().expect("buffer allocated while connected").read_len() >= need {
                return Ok(());
            }
            if self.buffer.as_ref().unwrap().free_len() == 0 {
                self.buffer.as_mut().unwrap().compact();
                if self.buffer.as_ref().unwrap().free_len() == 0 {
                    return Err(self.fault(Error::BadResponse));
                }
            }
            let received = {
                let buffer = self.buffer.as_mut().unwrap();
                let span = buffer.write_span();
                match self.transport.recv(span) {
                    Ok(n) => n,
                    Err(err) => return Err(self.fault(err)),
                }
            };
            if received == 0 {
                return Err(self.fault(Error::ConnClosed));
            }
            self.buffer.as_mut().unwrap().advance_write(received);
        }
    }

    /// Drains every unread byte in the buffer out through the transport.
    fn flush(&mut self) -> Result<(), Error> {
        loop {
            let read_len = self.buffer.as_ref().unwrap().read_len();
            if read_len == 0 {
                return Ok(());
            }
            let sent = {
                let buffer = self.buffer.as_ref().unwrap();
                match self.transport.send(buffer.read_span()) {
                    Ok(n) => n,
                    Err(err) => return Err(self.fault(err)),
                }
            };
            if sent == 0 {
                return Err(self.fault(Error::ConnClosed));
            }
            self.buffer.as_mut().unwrap().advance_read(sent);
        }
    }

    // ---- PUT / PUTA -----------------------------------------------------------

    pub fn put<A: PayloadAdapter>(&mut self, adapter: &A, records: &[Record<A::Payload>]) -> Result<(i64, i64), Error> {
        tracing::trace!(command = "PUT", records = records.len(), "dispatching command");
        self.write_records(adapter, records, Protocol::Put)
    }

    pub fn puta<A: PayloadAdapter>(&mut self, adapter: &A, records: &[Record<A::Payload>]) -> Result<(i64, i64), Error> {
        tracing::trace!(command = "PUTA", records = records.len(), "dispatching command");
        self.write_records(adapter, records, Protocol::Puta)
    }

    fn write_records<A: PayloadAdapter>(
        &mut self,
        adapter: &A,
        records: &[Record<A::Payload>],
        protocol: Protocol,
    ) -> Result<(i64, i64), Error> {
        self.require_connected()?;

        self.batch = BatchSerializer::new();
        {
            let buffer = self.buffer.as_mut().unwrap();
            buffer.reset();
            codec::encode_i32(buffer, protocol.command());
            // The payload is streamed; the server finds the end via the end-of-stream
            // marker rather than a declared length, so `size` is never repatched.
            codec::encode_u64(buffer, 0);
        }

        let mut expected_payload_size: usize = 8;

        for (key, payload) in records {
            let validation = match protocol {
                Protocol::Put => key.validate_for_put(),
                Protocol::Puta => key.validate_for_puta(),
            };
            if validation.is_err() {
                if self.batch.is_open() {
                    // Safe without a reserve: see the note on the mirrored close below.
                    self.batch.end(self.buffer.as_mut().unwrap());
                }
                if !self.buffer.as_mut().unwrap().reserve(wire::MARKER_LEN) {
                    let _ = self.flush();
                    self.buffer.as_mut().unwrap().reset();
                }
                codec::encode_i32(self.buffer.as_mut().unwrap(), 0);
                let _ = self.flush();
                return Err(self.fault(Error::InvalidKey));
            }

            if self.batch.current_cid() != Some(key.cid) {
                if self.batch.is_open() {
                    // Safe without a reserve: every prior record write below leaves at
                    // least `MARKER_LEN` bytes of slack for exactly this marker.
                    self.batch.end(self.buffer.as_mut().unwrap());
                }
                // Reserve room for the new batch header plus enough slack to close it
                // again immediately, in case the very next record doesn't fit at all.
                if !self
                    .buffer
                    .as_mut()
                    .unwrap()
                    .reserve(wire::BATCH_HEADER_LEN + wire::MARKER_LEN)
                {
                    self.flush()?;
                    self.buffer.as_mut().unwrap().reset();
                }
                self.batch.begin(self.buffer.as_mut().unwrap(), key.cid);
            }

            self.write_one_record(adapter, key, payload, protocol, &mut expected_payload_size)?;
        }

        if self.batch.is_open() {
            // Safe without a reserve: the loop above always leaves `MARKER_LEN` bytes
            // of slack after the last record it wrote.
            self.batch.end(self.buffer.as_mut().unwrap());
        }
        if !self.buffer.as_mut().unwrap().reserve(wire::MARKER_LEN) {
            self.flush()?;
            self.buffer.as_mut().unwrap().reset();
        }
        codec::encode_i32(self.buffer.as_mut().unwrap(), 0); // end-of-stream marker
        self.flush()?;

        self.read_put_response()
    }

    fn write_one_record<A: PayloadAdapter>(
        &mut self,
        adapter: &A,
        key: &Key,
        payload: &A::Payload,
        protocol: Protocol,
        expected_payload_size: &mut usize,
    ) -> Result<(), Error> {
        let overhead = 4 + protocol.abbrev_key_len();

        loop {
            let span_len = overhead + *expected_payload_size;
            // Keep `MARKER_LEN` bytes of slack beyond the frame itself so the batch can
            // always be closed afterwards without running out of room.
            let reserve_len = span_len + wire::MARKER_LEN;

            if !self.buffer.as_mut().unwrap().reserve(reserve_len) {
                if reserve_len > self.buffer.as_ref().unwrap().capacity() - wire::BATCH_HEADER_LEN {
                    return Err(self.fault(Error::MemoryLimitExceeded));
                }
                // Doesn't fit in the current window but would fit a freshly-opened
                // batch: split. The batch being closed here always has at least
                // `MARKER_LEN` bytes of slack already, whether it was just opened
                // (the CID-switch reserve above accounts for this) or already holds a
                // prior record (which left the same slack behind it).
                self.batch.end(self.buffer.as_mut().unwrap());
                self.flush()?;
                self.buffer.as_mut().unwrap().reset();
                self.batch.begin(self.buffer.as_mut().unwrap(), key.cid);
                continue;
            }

            let required = {
                let buffer = self.buffer.as_mut().unwrap();
                let span = buffer.write_span();
                adapter.serialize(payload, &mut span[overhead..span_len])
            };

            if required as i64 > wire::PAYLOAD_SIZE_MAX {
                return Err(self.fault(Error::PayloadTooLarge));
            }

            if required > *expected_payload_size {
                *expected_payload_size = required;
                continue;
            }

            let buffer = self.buffer.as_mut().unwrap();
            self.batch.append_record_header(buffer, key, required as i32, protocol);
            buffer.advance_write(required);
            return Ok(());
        }
    }

    fn read_put_response(&mut self) -> Result<(i64, i64), Error> {
        self.buffer.as_mut().unwrap().reset();
        self.fill(wire::RESPONSE_HEADER_LEN)?;
        let result = {
            let buffer = self.buffer.as_mut().unwrap();
            let result = codec::decode_i32(buffer);
            let _size = codec::decode_u64(buffer);
            result
        };
        if result != 0 {
            self.buffer.as_mut().unwrap().reset();
            return Err(Error::Server(result));
        }

        self.fill(16)?;
        let buffer = self.buffer.as_mut().unwrap();
        let acq_min = codec::decode_i64(buffer);
        let acq_max = codec::decode_i64(buffer);
        buffer.reset();
        Ok((acq_min, acq_max))
    }

    // ---- GET / GETACQ -----------------------------------------------------------

    fn send_key_range_request(&mut self, cmd: i32, kmin: &Key, kmax: &Key) -> Result<(), Error> {
        self.require_connected()?;
        if key::range_is_empty(kmin, kmax) {
            return Err(Error::EmptyKeyRange);
        }

        let buffer = self.buffer.as_mut().unwrap();
        buffer.reset();
        codec::encode_i32(buffer, cmd);
        codec::encode_u64(buffer, (wire::KEY_FULL_LEN * 2) as u64);
        codec::encode_key_full(buffer, kmin);
        codec::encode_key_full(buffer, kmax);
        self.flush()
    }

    pub fn get_acq(&mut self, kmin: &Key, kmax: &Key) -> Result<i64, Error> {
        tracing::trace!(command = "GETACQ", "dispatching command");
        self.send_key_range_request(wire::CMD_GETACQ, kmin, kmax)?;

        self.buffer.as_mut().unwrap().reset();
        self.fill(wire::RESPONSE_HEADER_LEN)?;
        let result = {
            let buffer = self.buffer.as_mut().unwrap();
            let result = codec::decode_i32(buffer);
            let _size = codec::decode_u64(buffer);
            result
        };
        if result != 0 {
            self.buffer.as_mut().unwrap().reset();
            return Err(Error::Server(result));
        }

        self.fill(8)?;
        let buffer = self.buffer.as_mut().unwrap();
        let acq = codec::decode_i64(buffer);
        buffer.reset();
        Ok(acq)
    }

    pub fn get<A: PayloadAdapter>(&mut self, adapter: &A, kmin: &Key, kmax: &Key) -> GetResult<A::Payload> {
        tracing::trace!(command = "GET", "dispatching command");
        let mut records = RecordsSet::new();

        if let Err(err) = self.send_key_range_request(wire::CMD_GET, kmin, kmax) {
            return Err(GetError { records, error: err });
        }

        self.buffer.as_mut().unwrap().reset();
        if let Err(err) = self.fill(wire::RESPONSE_HEADER_LEN) {
            return Err(GetError { records, error: err });
        }
        let result = {
            let buffer = self.buffer.as_mut().unwrap();
            let result = codec::decode_i32(buffer);
            let _size = codec::decode_u64(buffer);
            result
        };
        if result != 0 {
            self.buffer.as_mut().unwrap().reset();
            return Err(GetError {
                records,
                error: Error::Server(result),
            });
        }

        let mut consumed: usize = 0;

        loop {
            if let Err(err) = self.fill(4) {
                return Err(GetError { records, error: err });
            }
            let record_size = {
                let buffer = self.buffer.as_mut().unwrap();
                codec::decode_i32(buffer)
            };

            if record_size == 0 {
                return match self.read_get_trailer() {
                    Ok(acq) => Ok((records, acq)),
                    Err(err) => Err(GetError { records, error: err }),
                };
            }

            if record_size < wire::KEY_FULL_LEN as i32 {
                let err = self.fault(Error::BadResponse);
                return Err(GetError { records, error: err });
            }

            if (record_size as usize) > self.memory_limit.saturating_sub(consumed) {
                let err = self.fault(Error::MemoryLimitExceeded);
                return Err(GetError { records, error: err });
            }

            if let Err(err) = self.fill(record_size as usize) {
                return Err(GetError { records, error: err });
            }

            let key = {
                let buffer = self.buffer.as_mut().unwrap();
                codec::decode_key_full(buffer)
            };
            let payload_len = record_size as usize - wire::KEY_FULL_LEN;
            let value = {
                let buffer = self.buffer.as_mut().unwrap();
                let span = &buffer.read_span()[..payload_len];
                let value = adapter.deserialize(span);
                buffer.advance_read(payload_len);
                value
            };

            match value {
                Some(payload) => {
                    records.push((key, payload));
                    consumed += record_size as usize;
                }
                None => {
                    let err = self.fault(Error::DeserializationError);
                    return Err(GetError { records, error: err });
                }
            }
        }
    }

    fn read_get_trailer(&mut self) -> Result<i64, Error> {
        self.fill(wire::RESPONSE_HEADER_LEN)?;
        let trailer_result = {
            let buffer = self.buffer.as_mut().unwrap();
            let result = codec::decode_i32(buffer);
            let _size = codec::decode_u64(buffer);
            result
        };
        if trailer_result != 0 {
            self.buffer.as_mut().unwrap().reset();
            return Err(Error::Server(trailer_result));
        }
        self.fill(8)?;
        let buffer = self.buffer.as_mut().unwrap();
        let acq = codec::decode_i64(buffer);
        buffer.reset();
        Ok(acq)
    }

    /// Streaming GET: identical framing to `get`, but the decoded window is handed to
    /// `callback` and recycled whenever the next record wouldn't fit in what's left of
    /// it, instead of accumulating for the whole command. `callback` is always invoked
    /// at least once, even with an empty final chunk, to mark end-of-stream.
    pub fn get_stream<A: PayloadAdapter>(
        &mut self,
        adapter: &A,
        kmin: &Key,
        kmax: &Key,
        mut callback: impl FnMut(RecordsSet<A::Payload>),
    ) -> Result<i64, Error> {
        tracing::trace!(command = "GET_STREAM", "dispatching command");
        self.send_key_range_request(wire::CMD_GET, kmin, kmax)?;

        self.buffer.as_mut().unwrap().reset();
        self.fill(wire::RESPONSE_HEADER_LEN)?;
        let result = {
            let buffer = self.buffer.as_mut().unwrap();
            let result = codec::decode_i32(buffer);
            let _size = codec::decode_u64(buffer);
            result
        };
        if result != 0 {
            self.buffer.as_mut().unwrap().reset();
            return Err(Error::Server(result));
        }

        let mut chunk: RecordsSet<A::Payload> = RecordsSet::new();
        let mut consumed: usize = 0;

        loop {
            self.fill(4)?;
            let record_size = {
                let buffer = self.buffer.as_mut().unwrap();
                codec::decode_i32(buffer)
            };

            if record_size == 0 {
                callback(std::mem::take(&mut chunk));
                return self.read_get_trailer();
            }

            if record_size < wire::KEY_FULL_LEN as i32 {
                return Err(self.fault(Error::BadResponse));
            }
            if (record_size as usize) > self.memory_limit {
                return Err(self.fault(Error::MemoryLimitExceeded));
            }

            if (record_size as usize) > self.memory_limit - consumed {
                callback(std::mem::take(&mut chunk));
                consumed = 0;
                self.buffer.as_mut().unwrap().compact();
            }

            self.fill(record_size as usize)?;

            let key = {
                let buffer = self.buffer.as_mut().unwrap();
                codec::decode_key_full(buffer)
            };
            let payload_len = record_size as usize - wire::KEY_FULL_LEN;
            let value = {
                let buffer = self.buffer.as_mut().unwrap();
                let span = &buffer.read_span()[..payload_len];
                let value = adapter.deserialize(span);
                buffer.advance_read(payload_len);
                value
            };

            match value {
                Some(payload) => {
                    chunk.push((key, payload));
                    consumed += record_size as usize;
                }
                None => return Err(self.fault(Error::DeserializationError)),
            }
        }
    }
}
