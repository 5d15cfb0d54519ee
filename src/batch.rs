use crate::buffer::Buffer;
use crate::codec;
use crate::key::Key;
use crate::wire::Protocol;

/// Stateful assembler for PUT/PUTA batches: contiguous runs of records sharing a CID,
/// framed by a `(cid, size)` header and an end-of-batch marker.
///
/// A `BatchSerializer` never allocates or sends anything itself — it only tracks where
/// the open batch's size field lives in the caller's [`Buffer`] and how many bytes have
/// been written since `begin`.
pub struct BatchSerializer {
    current_cid: Option<i32>,
    size_field_offset: Option<usize>,
    running_size: i32,
}

impl BatchSerializer {
    pub fn new() -> Self {
        BatchSerializer {
            current_cid: None,
            size_field_offset: None,
            running_size: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current_cid.is_some()
    }

    pub fn current_cid(&self) -> Option<i32> {
        self.current_cid
    }

    /// Opens a batch for `cid`: writes the batch header with a placeholder size and
    /// remembers the size field's offset for later back-patching.
    pub fn begin(&mut self, buffer: &mut Buffer, cid: i32) {
        debug_assert!(self.current_cid.is_none(), "a batch is already open");
        codec::encode_i32(buffer, cid);
        let offset = buffer.write_cursor();
        codec::encode_i32(buffer, 0); // placeholder size, patched in `end`
        self.current_cid = Some(cid);
        self.size_field_offset = Some(offset);
        self.running_size = 0;
    }

    /// Writes a record's `payload_size` prefix and abbreviated key, in that wire order
    /// (size, then key, then payload), and accounts the whole frame — header plus the
    /// payload bytes the caller is about to write after this call — against the running
    /// batch size.
    pub fn append_record_header(&mut self, buffer: &mut Buffer, key: &Key, payload_size: i32, protocol: Protocol) {
        debug_assert_eq!(self.current_cid, Some(key.cid));
        let start = buffer.write_cursor();
        codec::encode_i32(buffer, payload_size);
        codec::encode_key_abbrev_for(buffer, key, protocol);
        let header_bytes = (buffer.write_cursor() - start) as i32;
        self.running_size += header_bytes + payload_size;
    }

    /// Closes the open batch: writes the end-of-batch marker and back-patches the size
    /// field with the accumulated running size.
    pub fn end(&mut self, buffer: &mut Buffer) {
        codec::encode_i32(buffer, 0); // end-of-batch marker
        if let Some(offset) = self.size_field_offset {
            buffer.poke_u32_le(offset, self.running_size as u32);
        }
        self.current_cid = None;
        self.size_field_offset = None;
        self.running_size = 0;
    }

    /// How many more bytes this batch could accept given `free_space` bytes in the
    /// buffer, bounded by what remains representable in the batch's `i32` size field.
    pub fn bytes_until_overflow(&self, free_space: usize) -> usize {
        let remaining_field_capacity = (i32::MAX as i64 - self.running_size as i64).max(0) as usize;
        free_space.min(remaining_field_capacity)
    }
}

impl Default for BatchSerializer {
    fn default() -> Self {
        Self::new()
    }
}
