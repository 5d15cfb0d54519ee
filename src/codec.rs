//! Pure encode/decode functions over a [`Buffer`]. All integers are little-endian,
//! two's complement. Decoding never checks for "enough bytes" itself — callers must
//! have already established the needed span is present (via `Buffer::reserve`/the
//! engine's `fill`) before calling.

use byteorder::{ByteOrder, LittleEndian};

use crate::buffer::Buffer;
use crate::key::Key;
use crate::wire;

pub fn encode_i32(buffer: &mut Buffer, value: i32) {
    LittleEndian::write_i32(&mut buffer.write_span()[..4], value);
    buffer.advance_write(4);
}

pub fn decode_i32(buffer: &mut Buffer) -> i32 {
    let value = LittleEndian::read_i32(&buffer.read_span()[..4]);
    buffer.advance_read(4);
    value
}

pub fn encode_i64(buffer: &mut Buffer, value: i64) {
    LittleEndian::write_i64(&mut buffer.write_span()[..8], value);
    buffer.advance_write(8);
}

pub fn decode_i64(buffer: &mut Buffer) -> i64 {
    let value = LittleEndian::read_i64(&buffer.read_span()[..8]);
    buffer.advance_read(8);
    value
}

pub fn encode_u64(buffer: &mut Buffer, value: u64) {
    LittleEndian::write_u64(&mut buffer.write_span()[..8], value);
    buffer.advance_write(8);
}

pub fn decode_u64(buffer: &mut Buffer) -> u64 {
    let value = LittleEndian::read_u64(&buffer.read_span()[..8]);
    buffer.advance_read(8);
    value
}

/// Full key encoding (32 B): `cid, mid, moid, cap, acq`, in that order regardless of
/// struct declaration order.
pub fn encode_key_full(buffer: &mut Buffer, key: &Key) {
    encode_i32(buffer, key.cid);
    encode_i64(buffer, key.mid);
    encode_i32(buffer, key.moid);
    encode_i64(buffer, key.cap);
    encode_i64(buffer, key.acq);
}

pub fn decode_key_full(buffer: &mut Buffer) -> Key {
    Key {
        cid: decode_i32(buffer),
        mid: decode_i64(buffer),
        moid: decode_i32(buffer),
        cap: decode_i64(buffer),
        acq: decode_i64(buffer),
    }
}

/// Abbreviated key used inside a PUTA batch (28 B): `mid, moid, cap, acq`. The CID
/// lives in the enclosing batch header.
pub fn encode_key_abbrev_acq(buffer: &mut Buffer, key: &Key) {
    encode_i64(buffer, key.mid);
    encode_i32(buffer, key.moid);
    encode_i64(buffer, key.cap);
    encode_i64(buffer, key.acq);
}

pub fn decode_key_abbrev_acq(buffer: &mut Buffer, cid: i32) -> Key {
    Key {
        cid,
        mid: decode_i64(buffer),
        moid: decode_i32(buffer),
        cap: decode_i64(buffer),
        acq: decode_i64(buffer),
    }
}

/// Abbreviated key used inside a PUT batch (20 B): `mid, moid, cap`. The CID lives in
/// the batch header and the server assigns ACQ.
pub fn encode_key_abbrev(buffer: &mut Buffer, key: &Key) {
    encode_i64(buffer, key.mid);
    encode_i32(buffer, key.moid);
    encode_i64(buffer, key.cap);
}

pub fn decode_key_abbrev(buffer: &mut Buffer, cid: i32) -> Key {
    Key {
        cid,
        mid: decode_i64(buffer),
        moid: decode_i32(buffer),
        cap: decode_i64(buffer),
        acq: 0,
    }
}

/// Writes the appropriate abbreviated key for `protocol`.
pub fn encode_key_abbrev_for(buffer: &mut Buffer, key: &Key, protocol: wire::Protocol) {
    match protocol {
        wire::Protocol::Put => encode_key_abbrev(buffer, key),
        wire::Protocol::Puta => encode_key_abbrev_acq(buffer, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(bytes: &[u8]) -> Buffer {
        let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
        buffer.write_span()[..bytes.len()].copy_from_slice(bytes);
        buffer.advance_write(bytes.len());
        buffer
    }

    #[test]
    fn i32_roundtrip_le() {
        for value in [0, 1, -1, i32::MIN, i32::MAX] {
            let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
            encode_i32(&mut buffer, value);
            assert_eq!(decode_i32(&mut buffer), value);
        }
    }

    #[test]
    fn i64_roundtrip_le() {
        for value in [0, 1, -1, i64::MIN, i64::MAX] {
            let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
            encode_i64(&mut buffer, value);
            assert_eq!(decode_i64(&mut buffer), value);
        }
    }

    #[test]
    fn i32_byte_order_is_little_endian() {
        let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
        encode_i32(&mut buffer, 0x0102_0304);
        assert_eq!(&buffer.read_span()[..4], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn full_key_roundtrip() {
        let key = Key::new(7, -11, 22, -33, 44);
        let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
        encode_key_full(&mut buffer, &key);
        assert_eq!(buffer.read_len(), wire::KEY_FULL_LEN);
        assert_eq!(decode_key_full(&mut buffer), key);
    }

    #[test]
    fn abbrev_acq_roundtrip_supplies_cid_externally() {
        let key = Key::new(7, -11, 22, -33, 44);
        let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
        encode_key_abbrev_acq(&mut buffer, &key);
        assert_eq!(buffer.read_len(), wire::KEY_ABBREV_ACQ_LEN);
        assert_eq!(decode_key_abbrev_acq(&mut buffer, key.cid), key);
    }

    #[test]
    fn abbrev_roundtrip_drops_acq() {
        let key = Key::new(7, -11, 22, -33, 44);
        let mut buffer = Buffer::with_capacity(Buffer::MIN_CAPACITY);
        encode_key_abbrev(&mut buffer, &key);
        assert_eq!(buffer.read_len(), wire::KEY_ABBREV_LEN);
        let decoded = decode_key_abbrev(&mut buffer, key.cid);
        assert_eq!(decoded.mid, key.mid);
        assert_eq!(decoded.moid, key.moid);
        assert_eq!(decoded.cap, key.cap);
        assert_eq!(decoded.acq, 0);
    }

    #[test]
    fn decode_consumes_exactly_its_span() {
        let mut buffer = buffer_with(&[0xff; 16]);
        let _ = decode_i32(&mut buffer);
        assert_eq!(buffer.read_len(), 12);
    }
}
