/// A single contiguous byte arena with a read cursor and a write cursor, used to back
/// in-place request framing and incremental response decoding.
///
/// Unlike a growable byte vector, a `Buffer`'s capacity never changes while it is in
/// use: it is fixed at construction (or at [`Buffer::reconfigure_capacity`], which is
/// only honored while the buffer is empty) and acts as a hard ceiling on both a single
/// serialized record and a single streamed response chunk.
pub struct Buffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
}

impl Buffer {
    /// A request header plus two full keys must always fit.
    pub const MIN_CAPACITY: usize = 128;

    pub fn with_capacity(capacity: usize) -> Buffer {
        assert!(
            capacity >= Self::MIN_CAPACITY,
            "buffer capacity must be at least {} bytes, got {}",
            Self::MIN_CAPACITY,
            capacity
        );
        Buffer {
            data: vec![0u8; capacity],
            read: 0,
            write: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes available to read, starting at the read cursor.
    #[inline]
    pub fn read_len(&self) -> usize {
        self.write - self.read
    }

    /// Bytes of free trailing space, starting at the write cursor.
    #[inline]
    pub fn free_len(&self) -> usize {
        self.data.len() - self.write
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// The unread region.
    #[inline]
    pub fn read_span(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// The writable region, from the write cursor to the end of the arena.
    #[inline]
    pub fn write_span(&mut self) -> &mut [u8] {
        &mut self.data[self.write..]
    }

    /// Absolute offset of the write cursor, for remembering back-patch locations.
    #[inline]
    pub fn write_cursor(&self) -> usize {
        self.write
    }

    #[inline]
    pub fn advance_read(&mut self, count: usize) {
        assert!(
            count <= self.read_len(),
            "attempted to advance read cursor past available data"
        );
        self.read += count;
    }

    #[inline]
    pub fn advance_write(&mut self, count: usize) {
        assert!(
            count <= self.free_len(),
            "attempted to advance write cursor past free space"
        );
        self.write += count;
    }

    /// Moves unread bytes to offset 0. Idempotent when already compacted.
    pub fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        self.data.copy_within(self.read..self.write, 0);
        self.write -= self.read;
        self.read = 0;
    }

    /// Ensures at least `n` bytes of free trailing space, compacting first. Never
    /// allocates beyond the capacity fixed at construction.
    pub fn reserve(&mut self, n: usize) -> bool {
        self.compact();
        self.free_len() >= n
    }

    /// Resets both cursors to 0 without touching the backing storage.
    #[inline]
    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    /// In-place back-patch of a little-endian u32 at an absolute offset that must lie
    /// at or before the write cursor.
    pub fn poke_u32_le(&mut self, offset: usize, value: u32) {
        assert!(
            offset + 4 <= self.write,
            "poke_u32_le offset past the write cursor"
        );
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Reconfigures the backing capacity. Only honored while the buffer is empty (no
    /// unread bytes, regardless of where the cursors sit); otherwise a no-op that
    /// returns `false`.
    pub fn reconfigure_capacity(&mut self, capacity: usize) -> bool {
        if !self.is_empty() {
            return false;
        }
        assert!(capacity >= Self::MIN_CAPACITY);
        self.data = vec![0u8; capacity];
        true
    }
}
