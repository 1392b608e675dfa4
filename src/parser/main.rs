use crate::error::{MMAError, Result};
use crate::parser::decoder::RecordDecoder;
use crate::parser::dedup::Deduplicator;
use crate::parser::header::{open_capture, read_capture};
use crate::parser::reassembly::{Reassembler, ReassemblyLimits};
use crate::types::{Capture, CaptureHeader, Layout, RawRecord};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::path::Path;

/// Options of one decode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    pub layout: Layout,
    /// Keep byte-identical records instead of dropping repeats
    pub keep_duplicates: bool,
    pub limits: ReassemblyLimits,
}

impl ConvertOptions {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }
}

/// Reassembled record stream of one capture file
#[derive(Debug)]
pub struct Conversion {
    pub header: CaptureHeader,
    pub acquired: DateTime<Utc>,
    pub records: Vec<RawRecord>,
    /// Records dropped as duplicates
    pub duplicates: usize,
    /// Sequence discontinuities detected by the reassembler
    pub discontinuities: usize,
    /// Set when the payload ended with a partial record; `records` still
    /// holds everything decoded before it
    pub truncation: Option<MMAError>,
}

impl Conversion {
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    pub fn unreliable_count(&self) -> usize {
        self.records.iter().filter(|r| r.unreliable).count()
    }
}

/// Read a capture file and reassemble its records
pub fn convert_file(path: &Path, options: &ConvertOptions) -> Result<Conversion> {
    let capture = open_capture(path)?;
    let conversion = convert_capture(&capture, options);
    if let Some(err) = &conversion.truncation {
        warn!("{}: {}", path.display(), err);
    }
    Ok(conversion)
}

/// Same as [`convert_file`] for an in-memory capture image
pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let capture = read_capture(data)?;
    Ok(convert_capture(&capture, options))
}

/// Decode, deduplicate and reassemble the payload of a validated capture
pub fn convert_capture(capture: &Capture, options: &ConvertOptions) -> Conversion {
    let mut dedup = Deduplicator::new(options.keep_duplicates);
    let mut buffer = Reassembler::new(options.limits);
    let mut truncation = None;

    for item in RecordDecoder::new(&capture.payload, options.layout) {
        match item {
            Ok(record) => {
                if dedup.admit(&record) {
                    buffer.insert(record);
                }
            }
            Err(err) => truncation = Some(err),
        }
    }

    debug!(
        "capture {}: {} records kept, {} duplicates, {} discontinuities",
        capture.id(),
        buffer.len(),
        dedup.dropped(),
        buffer.discontinuities()
    );

    Conversion {
        header: capture.header,
        acquired: capture.acquired,
        duplicates: dedup.dropped(),
        discontinuities: buffer.discontinuities(),
        records: buffer.into_records(),
        truncation,
    }
}
