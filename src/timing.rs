//! Sub-sample timestamp reconstruction
//!
//! Records only carry the capture time of their file. Sub-sample times are
//! rebuilt by walking the ordered records, advancing a running offset by one
//! interval per sub-sample and by an extra amount when the sequence shows
//! records lost before decoding.

use crate::parser::helpers::forward_gap;
use crate::types::{CalibrationTable, Measurement, RawRecord, MEAS_COUNT};
use chrono::{DateTime, Duration, Utc};
use log::debug;

#[cfg(feature = "serde")]
use serde::Serialize;

/// How the spacing between sub-samples is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMode {
    /// Every sub-sample carries the capture time
    #[default]
    Fixed,
    /// `1 / frequency` of the calibration table
    Nominal,
    /// Caller supplied spacing
    Interval(Duration),
}

impl TimingMode {
    pub fn interval(&self, table: &CalibrationTable) -> Duration {
        match self {
            TimingMode::Fixed => Duration::zero(),
            TimingMode::Nominal => table.sample_interval(),
            TimingMode::Interval(delta) => *delta,
        }
    }
}

/// Running state of the reconstruction over one file
#[derive(Debug, Clone)]
pub struct TimeReconstructor {
    origin: DateTime<Utc>,
    delta: Duration,
    elapsed: Duration,
    prev: Option<u16>,
}

impl TimeReconstructor {
    pub fn new(origin: DateTime<Utc>, delta: Duration) -> Self {
        Self {
            origin,
            delta,
            elapsed: Duration::zero(),
            prev: None,
        }
    }

    /// Offset from the origin accumulated so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Time of the first sub-sample of the next record in order.
    ///
    /// Unreliable records get `None` and leave the running offset untouched;
    /// the gap of the record that follows them is not counted either.
    pub fn next_record(&mut self, seq: u16, unreliable: bool) -> Option<DateTime<Utc>> {
        if unreliable {
            self.prev = None;
            return None;
        }
        if let Some(prev) = self.prev {
            let gap = forward_gap(prev, seq);
            if gap != 0 && gap as usize != MEAS_COUNT {
                self.elapsed = self.elapsed + self.delta * (gap as i32 / MEAS_COUNT as i32);
            }
        }
        let when = self.origin + self.elapsed;
        self.elapsed = self.elapsed + self.delta * MEAS_COUNT as i32;
        self.prev = Some(seq);
        Some(when)
    }
}

/// First sub-sample time of every record
pub fn reconstruct(
    records: &[RawRecord],
    origin: DateTime<Utc>,
    delta: Duration,
) -> Vec<Option<DateTime<Utc>>> {
    let mut timeline = TimeReconstructor::new(origin, delta);
    records
        .iter()
        .map(|r| timeline.next_record(r.seq, r.unreliable))
        .collect()
}

/// Fill `when` and `interval` of measurements that are in sequence order,
/// using the capture time of the first one as origin.
pub fn stamp(measurements: &mut [Measurement], delta: Duration) {
    let Some(origin) = measurements.first().map(|m| m.acquired) else {
        return;
    };
    let mut timeline = TimeReconstructor::new(origin, delta);
    for m in measurements.iter_mut() {
        m.when = timeline.next_record(m.seq, m.unreliable);
        m.interval = delta;
    }
    debug!(
        "stamped {} measurements, span {} us",
        measurements.len(),
        timeline.elapsed().num_microseconds().unwrap_or(0)
    );
}

/// Adjacent records whose sequence step is neither 0 nor one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SequenceGap {
    /// Index of the later record
    pub index: usize,
    pub previous: u16,
    pub current: u16,
    pub gap: u16,
}

pub fn find_gaps(records: &[RawRecord]) -> Vec<SequenceGap> {
    records
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let gap = forward_gap(pair[0].seq, pair[1].seq);
            if gap == 0 || gap as usize == MEAS_COUNT {
                return None;
            }
            Some(SequenceGap {
                index: i + 1,
                previous: pair[0].seq,
                current: pair[1].seq,
                gap,
            })
        })
        .collect()
}
