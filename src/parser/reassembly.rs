use crate::parser::helpers::{sequence_delta, within_window};
use crate::types::{RawRecord, MEAS_COUNT};
use log::warn;

/// Average number of records per capture group of the reference instrument
pub const AVG_COUNT: u32 = 219;

/// Thresholds of the sequence discontinuity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblyLimits {
    /// Buffer length at which incoming records are checked against the
    /// window; 0 disables the probe
    pub probe_size: usize,
    /// Largest plausible sequence distance, in either direction
    pub window: u32,
}

impl Default for ReassemblyLimits {
    fn default() -> Self {
        Self {
            probe_size: 4,
            window: AVG_COUNT * MEAS_COUNT as u32,
        }
    }
}

/// Where an incoming record ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// After the last buffered record
    Appended,
    /// At this index, shifting the following records
    Inserted(usize),
    /// Appended after a discontinuity; every earlier record is now unreliable
    Discontinuity,
}

/// Sequence-ordered record buffer of one capture file
#[derive(Debug, Default)]
pub struct Reassembler {
    records: Vec<RawRecord>,
    limits: ReassemblyLimits,
    discontinuities: usize,
}

impl Reassembler {
    pub fn new(limits: ReassemblyLimits) -> Self {
        Self {
            records: Vec::new(),
            limits,
            discontinuities: 0,
        }
    }

    /// Place `record` by wraparound sequence order.
    ///
    /// The buffer is scanned from the tail. The scan never crosses records
    /// already marked unreliable: a record older than every reliable one is
    /// placed right after them, not prepended to the whole buffer, so the
    /// reliable tail stays in sequence order.
    pub fn insert(&mut self, record: RawRecord) -> Placement {
        let len = self.records.len();
        if len == 0 {
            self.records.push(record);
            return Placement::Appended;
        }

        let probe = len == self.limits.probe_size;
        let mut index = 0;
        for i in (0..len).rev() {
            let existing = &self.records[i];
            if existing.unreliable {
                index = i + 1;
                break;
            }
            let delta = sequence_delta(record.seq, existing.seq);
            if probe && !within_window(delta, self.limits.window) {
                warn!(
                    "sequence discontinuity: {} after {} (delta {}), {} records marked unreliable",
                    record.seq, existing.seq, delta, len
                );
                for buffered in &mut self.records {
                    buffered.unreliable = true;
                }
                self.records.push(record);
                self.discontinuities += 1;
                return Placement::Discontinuity;
            }
            if delta >= 0 {
                index = i + 1;
                break;
            }
        }

        if index == len {
            self.records.push(record);
            Placement::Appended
        } else {
            self.records.insert(index, record);
            Placement::Inserted(index)
        }
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of discontinuities detected so far
    pub fn discontinuities(&self) -> usize {
        self.discontinuities
    }

    pub fn into_records(self) -> Vec<RawRecord> {
        self.records
    }
}

/// Reassemble a whole record stream
pub fn reassemble<I>(records: I, limits: ReassemblyLimits) -> Vec<RawRecord>
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut buffer = Reassembler::new(limits);
    for record in records {
        buffer.insert(record);
    }
    buffer.into_records()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layout;

    fn record(seq: u16) -> RawRecord {
        RawRecord::new(seq, vec![seq as i16; 31], Layout::A)
    }

    fn sequences(records: &[RawRecord]) -> Vec<u16> {
        records.iter().map(|r| r.seq).collect()
    }

    #[test]
    fn test_in_order() {
        let records = reassemble((0..6).map(|i| record(i * 9)), ReassemblyLimits::default());
        assert_eq!(sequences(&records), vec![0, 9, 18, 27, 36, 45]);
        assert!(records.iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_out_of_order_within_window() {
        let mut buffer = Reassembler::default();
        assert_eq!(buffer.insert(record(0)), Placement::Appended);
        assert_eq!(buffer.insert(record(18)), Placement::Appended);
        assert_eq!(buffer.insert(record(9)), Placement::Inserted(1));
        assert_eq!(buffer.insert(record(36)), Placement::Appended);
        assert_eq!(buffer.insert(record(27)), Placement::Inserted(3));
        assert_eq!(sequences(buffer.records()), vec![0, 9, 18, 27, 36]);
    }

    #[test]
    fn test_prepend_when_oldest() {
        let records = reassemble(
            vec![record(18), record(27), record(9)],
            ReassemblyLimits::default(),
        );
        assert_eq!(sequences(&records), vec![9, 18, 27]);
    }

    #[test]
    fn test_wraparound_is_forward() {
        let records = reassemble(
            vec![record(65526), record(8), record(65535), record(17)],
            ReassemblyLimits::default(),
        );
        assert_eq!(sequences(&records), vec![65526, 65535, 8, 17]);
        assert!(records.iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_jump_on_probe_flags_buffer() {
        let mut buffer = Reassembler::new(ReassemblyLimits::default());
        for seq in [0, 9, 18, 27] {
            buffer.insert(record(seq));
        }
        assert_eq!(buffer.insert(record(2027)), Placement::Discontinuity);
        let records = buffer.records();
        assert_eq!(sequences(records), vec![0, 9, 18, 27, 2027]);
        assert!(records[..4].iter().all(|r| r.unreliable));
        assert!(!records[4].unreliable);
        assert_eq!(buffer.discontinuities(), 1);
    }

    #[test]
    fn test_backward_jump_on_probe_flags_buffer() {
        let mut buffer = Reassembler::new(ReassemblyLimits::default());
        for seq in [4000, 4009, 4018, 4027] {
            buffer.insert(record(seq));
        }
        assert_eq!(buffer.insert(record(1000)), Placement::Discontinuity);
        assert_eq!(sequences(buffer.records()).last(), Some(&1000));
    }

    #[test]
    fn test_window_edge_is_not_a_jump() {
        let mut buffer = Reassembler::new(ReassemblyLimits::default());
        for seq in [0, 9, 18, 27] {
            buffer.insert(record(seq));
        }
        assert_eq!(buffer.insert(record(27 + 1971)), Placement::Appended);
        assert!(buffer.records().iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_jump_outside_probe_is_ordered() {
        let records = reassemble(
            vec![record(0), record(9), record(5000)],
            ReassemblyLimits::default(),
        );
        assert_eq!(sequences(&records), vec![0, 9, 5000]);
        assert!(records.iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_scan_stops_at_unreliable_records() {
        let records = reassemble(
            vec![
                record(0),
                record(9),
                record(18),
                record(27),
                record(3000),
                record(2991),
                record(3009),
            ],
            ReassemblyLimits::default(),
        );
        assert_eq!(sequences(&records), vec![0, 9, 18, 27, 2991, 3000, 3009]);
        assert!(records[..4].iter().all(|r| r.unreliable));
        assert!(records[4..].iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_probe_disabled() {
        let limits = ReassemblyLimits {
            probe_size: 0,
            ..ReassemblyLimits::default()
        };
        let records = reassemble((0..5).map(|i| record(i * 3000)), limits);
        assert!(records.iter().all(|r| !r.unreliable));
    }

    #[test]
    fn test_shuffled_stream_is_ordered() {
        // Local shuffles of a long stream crossing the 16-bit wrap
        let mut seqs: Vec<u16> = (0..400u32).map(|i| (65000 + i * 9) as u16).collect();
        let mut state = 0x2545_f491_u32;
        for chunk in seqs.chunks_mut(5) {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let k = (state >> 16) as usize % chunk.len();
            chunk.swap(0, k);
        }
        let records = reassemble(seqs.iter().map(|&s| record(s)), ReassemblyLimits::default());
        assert_eq!(records.len(), 400);
        for pair in records.windows(2) {
            assert!(sequence_delta(pair[1].seq, pair[0].seq) >= 0);
        }
    }
}
