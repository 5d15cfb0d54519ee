//! Conversions between the wire's ACQ/CAP timestamp representation (nanoseconds since
//! 2001-01-01T00:00:00Z) and Unix time.

/// Seconds between the Unix epoch (1970-01-01) and 2001-01-01, the wire epoch.
pub const EPOCH_OFFSET_SECONDS: i64 = 978_307_200;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Converts a wire timestamp (nanoseconds since 2001-01-01) to Unix seconds, truncating
/// the sub-second remainder.
pub fn to_unix_seconds(wire_nanos: i64) -> i64 {
    wire_nanos.div_euclid(NANOS_PER_SECOND) + EPOCH_OFFSET_SECONDS
}

/// Converts Unix seconds to a wire timestamp (nanoseconds since 2001-01-01).
pub fn from_unix_seconds(unix_seconds: i64) -> i64 {
    (unix_seconds - EPOCH_OFFSET_SECONDS) * NANOS_PER_SECOND
}

/// Converts a wire timestamp to full-precision Unix nanoseconds.
pub fn to_unix_nanos(wire_nanos: i64) -> i64 {
    wire_nanos + EPOCH_OFFSET_SECONDS * NANOS_PER_SECOND
}

/// Converts full-precision Unix nanoseconds to a wire timestamp.
pub fn from_unix_nanos(unix_nanos: i64) -> i64 {
    unix_nanos - EPOCH_OFFSET_SECONDS * NANOS_PER_SECOND
}
