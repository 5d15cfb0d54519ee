use crate::error::Error;

/// A record's location in the time-series keyspace.
///
/// Field order is significant: it is both the wire order and, via the derived `Ord`,
/// the lexicographic ordering used to decide whether a `[kmin, kmax)` range is empty.
/// Do not reorder these fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub cid: i32,
    pub mid: i64,
    pub moid: i32,
    pub cap: i64,
    pub acq: i64,
}

impl Key {
    pub const MIN: Key = Key {
        cid: i32::MIN,
        mid: i64::MIN,
        moid: i32::MIN,
        cap: i64::MIN,
        acq: i64::MIN,
    };

    pub const MAX: Key = Key {
        cid: i32::MAX,
        mid: i64::MAX,
        moid: i32::MAX,
        cap: i64::MAX,
        acq: i64::MAX,
    };

    pub fn new(cid: i32, mid: i64, moid: i32, cap: i64, acq: i64) -> Key {
        Key {
            cid,
            mid,
            moid,
            cap,
            acq,
        }
    }

    /// PUT ignores `acq`; none of the other fields may sit at their type maximum.
    pub fn validate_for_put(&self) -> Result<(), Error> {
        if self.cid < 0 || self.cid == i32::MAX || self.mid == i64::MAX || self.moid == i32::MAX || self.cap == i64::MAX {
            return Err(Error::InvalidKey);
        }
        Ok(())
    }

    /// PUTA additionally rejects `acq` at its type maximum.
    pub fn validate_for_puta(&self) -> Result<(), Error> {
        self.validate_for_put()?;
        if self.acq == i64::MAX {
            return Err(Error::InvalidKey);
        }
        Ok(())
    }
}

/// `true` iff the right-open range `[kmin, kmax)` contains no keys.
pub fn range_is_empty(kmin: &Key, kmax: &Key) -> bool {
    kmin >= kmax
}

/// An opaque payload paired with its key. `P` is never inspected by the engine itself;
/// it only ever moves through the caller's [`crate::payload::PayloadAdapter`].
pub type Record<P> = (Key, P);

/// An insertion-ordered, append-only sequence of records.
#[derive(Debug, Clone)]
pub struct RecordsSet<P> {
    records: Vec<Record<P>>,
}

impl<P> RecordsSet<P> {
    pub fn new() -> Self {
        RecordsSet { records: Vec::new() }
    }

    pub(crate) fn push(&mut self, record: Record<P>) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record<P>> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Record<P>] {
        &self.records
    }
}

impl<P> Default for RecordsSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> IntoIterator for RecordsSet<P> {
    type Item = Record<P>;
    type IntoIter = std::vec::IntoIter<Record<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, P> IntoIterator for &'a RecordsSet<P> {
    type Item = &'a Record<P>;
    type IntoIter = std::slice::Iter<'a, Record<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
