//! The payload adapter is the only protocol-visible specialization point: the engine
//! never inspects `Payload` itself, only byte spans it hands to/receives from these
//! two methods.

/// A caller-supplied pair of serialize/deserialize callbacks for a fixed payload type.
pub trait PayloadAdapter {
    type Payload;

    /// Serializes `value` into `span`.
    ///
    /// Always returns the number of bytes the serialized value requires, regardless of
    /// whether `span` was long enough. If the required length exceeds `span.len()`, the
    /// contents of `span` are left undefined and the engine retries with a larger span.
    fn serialize(&self, value: &Self::Payload, span: &mut [u8]) -> usize;

    /// Consumes exactly `span.len()` bytes and produces a value, or `None` on failure.
    fn deserialize(&self, span: &[u8]) -> Option<Self::Payload>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::PayloadAdapter;

    /// A payload adapter over raw byte vectors, used across the crate's unit and
    /// integration tests in place of a real caller-supplied type.
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

    /// A payload adapter that always refuses to deserialize, for exercising
    /// `DESERIALIZATION_ERROR` paths.
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
}
