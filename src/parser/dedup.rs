use crate::types::RawRecord;
use std::collections::HashSet;

/// Drops records whose checksum was already seen in the same decode pass.
///
/// The instrument can repeat a record byte for byte (retransmission or a
/// trailing garbage record), so identity is the checksum of the encoded
/// bytes rather than the sequence number.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<u32>,
    keep_duplicates: bool,
    dropped: usize,
}

impl Deduplicator {
    pub fn new(keep_duplicates: bool) -> Self {
        Self {
            seen: HashSet::new(),
            keep_duplicates,
            dropped: 0,
        }
    }

    /// Returns true if the record is a first occurrence (or deduplication
    /// is disabled) and must be kept.
    pub fn admit(&mut self, record: &RawRecord) -> bool {
        let first = self.seen.insert(record.checksum);
        if first || self.keep_duplicates {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// Number of records rejected so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn filter<I>(&mut self, records: I) -> Vec<RawRecord>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        records.into_iter().filter(|r| self.admit(r)).collect()
    }
}
