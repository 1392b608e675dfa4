//! Continuity check of exported measurement CSV
//!
//! Re-reads a calibrated export and reports consecutive rows whose time
//! step is negative or larger than a threshold, or whose sequence step is
//! neither 0 (same record, next sub-sample) nor one record's worth of
//! sub-samples.

use crate::error::{MMAError, Result};
use crate::parser::helpers::forward_gap;
use crate::types::MEAS_COUNT;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::fmt;
use std::io::Read;

/// Largest time step between two rows accepted by default
pub fn default_max_step() -> Duration {
    Duration::microseconds(750)
}

const TIME_COLUMN: usize = 0;
const SEQUENCE_COLUMN: usize = 2;

/// Time formats accepted in the time column: ISO, then day-of-year
const PARSE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y.%j.%H.%M.%S%.f"];

/// A row breaking time or sequence continuity with its predecessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuityIssue {
    /// Data row number, 1 for the first row after the header
    pub row: usize,
    pub previous_time: DateTime<Utc>,
    pub current_time: DateTime<Utc>,
    pub previous_seq: u16,
    pub current_seq: u16,
}

impl ContinuityIssue {
    pub fn step(&self) -> Duration {
        self.current_time - self.previous_time
    }

    pub fn seq_step(&self) -> u16 {
        forward_gap(self.previous_seq, self.current_seq)
    }
}

impl fmt::Display for ContinuityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
        let step = self.step();
        let micros = step
            .num_microseconds()
            .map_or_else(|| format!("{}s", step.num_seconds()), |us| format!("{us}us"));
        write!(
            f,
            "{}: {} - {} => diff: {:>10} (prev: {:>6}, curr: {:>6}, delta: {:>6})",
            self.row,
            self.previous_time.format(FORMAT),
            self.current_time.format(FORMAT),
            micros,
            self.previous_seq,
            self.current_seq,
            self.seq_step()
        )
    }
}

/// Row by row continuity state
#[derive(Debug, Clone)]
pub struct ContinuityChecker {
    max_step: Duration,
    prev: Option<(DateTime<Utc>, u16)>,
}

impl ContinuityChecker {
    pub fn new(max_step: Duration) -> Self {
        Self {
            max_step,
            prev: None,
        }
    }

    /// Feed one row. A row without time (unreliable record) resets the
    /// baseline, so the next timed row is never compared across it.
    pub fn next_row(
        &mut self,
        row: usize,
        when: Option<DateTime<Utc>>,
        seq: u16,
    ) -> Option<ContinuityIssue> {
        let Some(when) = when else {
            self.prev = None;
            return None;
        };
        let issue = self.prev.and_then(|(previous_time, previous_seq)| {
            let step = when - previous_time;
            let gap = forward_gap(previous_seq, seq);
            let bad_time = step < Duration::zero() || step > self.max_step;
            let bad_seq = gap != 0 && gap != MEAS_COUNT as u16;
            (bad_time || bad_seq).then_some(ContinuityIssue {
                row,
                previous_time,
                current_time: when,
                previous_seq,
                current_seq: seq,
            })
        });
        self.prev = Some((when, seq));
        issue
    }
}

/// Parse a time column written by the exporter; empty means no time
pub fn parse_time(field: &str) -> Result<Option<DateTime<Utc>>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(field, format).ok())
        .map(|t| Some(t.and_utc()))
        .ok_or_else(|| MMAError::Export(format!("unrecognized time '{field}'")))
}

/// Check every row of an exported CSV, header included in `reader`.
/// Lines starting with `#` are ignored.
pub fn check_csv<R: Read>(reader: R, max_step: Duration) -> Result<Vec<ContinuityIssue>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);
    let mut checker = ContinuityChecker::new(max_step);
    let mut issues = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let (Some(time), Some(seq)) = (record.get(TIME_COLUMN), record.get(SEQUENCE_COLUMN))
        else {
            return Err(MMAError::Export(format!("row {row}: missing time or sequence")));
        };
        let when = parse_time(time)?;
        let seq: u16 = seq
            .trim()
            .parse()
            .map_err(|_| MMAError::Export(format!("row {row}: invalid sequence '{seq}'")))?;
        issues.extend(checker.next_row(row, when, seq));
    }
    Ok(issues)
}
