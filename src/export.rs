//! Export functionality for calibrated and raw records
//!
//! Contains the CSV writers for measurements (one row per sub-sample or one
//! row per record), the raw record dump, and the output sink they write to.

use crate::error::{MMAError, Result};
use crate::types::{Axis, Layout, Measurement, RawRecord, MEAS_COUNT};
use chrono::{DateTime, Utc};
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Day-of-year time column
pub const TIME_FORMAT: &str = "%Y.%j.%H.%M.%S.%6f";
/// ISO 8601 time column
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f";

/// Export options for controlling the CSV shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    /// One row per record instead of one per sub-sample
    pub flat: bool,
    /// Add micro-ampere, scale and offset columns
    pub all_fields: bool,
    /// ISO time column instead of day-of-year
    pub iso: bool,
}

impl ExportOptions {
    pub fn time_format(&self) -> &'static str {
        if self.iso {
            ISO_FORMAT
        } else {
            TIME_FORMAT
        }
    }
}

const PREFIX_HEADERS: [&str; 7] = [
    "time",
    "upi",
    "sequence",
    "vmu-sequence",
    "Tx [degC]",
    "Ty [degC]",
    "Tz [degC]",
];

const ALL_FIELD_HEADERS: [&str; 9] = [
    "micX", "micY", "micZ", "scaleX", "offsetX", "scaleY", "offsetY", "scaleZ", "offsetZ",
];

/// Column names of the measurement CSV for `options`
pub fn csv_headers(options: &ExportOptions) -> Vec<String> {
    let mut headers: Vec<String> = PREFIX_HEADERS.iter().map(|s| s.to_string()).collect();
    if options.all_fields {
        headers.extend(ALL_FIELD_HEADERS.iter().map(|s| s.to_string()));
    }
    if options.flat {
        for i in 0..MEAS_COUNT {
            for axis in ["x", "y", "z"] {
                headers.push(format!("A{axis}{i} [microG]"));
            }
        }
    } else {
        headers.extend(["Ax [microG]", "Ay [microG]", "Az [microG]"].map(String::from));
    }
    headers
}

/// Shortest decimal form that reads back to the same value
pub fn format_float(v: f64) -> String {
    format!("{v}")
}

pub fn format_time(t: Option<DateTime<Utc>>, options: &ExportOptions) -> String {
    t.map(|t| t.format(options.time_format()).to_string())
        .unwrap_or_default()
}

/// CSV writer of measurements
pub struct MeasurementWriter<W: Write> {
    writer: csv::Writer<W>,
    options: ExportOptions,
    rows: usize,
}

impl<W: Write> MeasurementWriter<W> {
    pub fn new(inner: W, options: ExportOptions) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(false).from_writer(inner),
            options,
            rows: 0,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(csv_headers(&self.options))?;
        Ok(())
    }

    /// Write one measurement; returns the number of rows written
    pub fn write(&mut self, m: &Measurement) -> Result<usize> {
        let mut row = Vec::with_capacity(PREFIX_HEADERS.len() + 9 + 3 * MEAS_COUNT);
        if self.options.flat {
            self.fill_prefix(&mut row, m, m.sample_time(0));
            for i in 0..MEAS_COUNT {
                for axis in Axis::ALL {
                    row.push(format_float(m.acceleration.get(axis)[i]));
                }
            }
            self.writer.write_record(&row)?;
            self.rows += 1;
            return Ok(1);
        }

        for i in 0..MEAS_COUNT {
            row.clear();
            self.fill_prefix(&mut row, m, m.sample_time(i));
            for axis in Axis::ALL {
                row.push(format_float(m.acceleration.get(axis)[i]));
            }
            self.writer.write_record(&row)?;
        }
        self.rows += MEAS_COUNT;
        Ok(MEAS_COUNT)
    }

    pub fn write_all<'a, I>(&mut self, measurements: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let mut rows = 0;
        for m in measurements {
            rows += self.write(m)?;
        }
        Ok(rows)
    }

    fn fill_prefix(&self, row: &mut Vec<String>, m: &Measurement, when: Option<DateTime<Utc>>) {
        row.push(format_time(when, &self.options));
        row.push(m.upi.clone());
        row.push(m.seq.to_string());
        row.push(m.vid.to_string());
        for axis in Axis::ALL {
            row.push(format_float(m.degrees.get(axis)));
        }
        if self.options.all_fields {
            for axis in Axis::ALL {
                row.push(format_float(m.mica.get(axis)));
            }
            for axis in Axis::ALL {
                row.push(format_float(m.scale.get(axis)));
                row.push(format_float(m.offset.get(axis)));
            }
        }
    }

    /// Rows written so far, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| MMAError::Io(e.into_error()))
    }
}

/// Number of leading fields that repeat the sequence number
fn embedded_sequence_fields(layout: Layout) -> usize {
    usize::from(!layout.has_sequence_prefix())
}

/// Column names of the raw dump
pub fn raw_headers(layout: Layout) -> Vec<String> {
    let fields = layout.field_count() - embedded_sequence_fields(layout);
    let mut headers = vec!["delta".to_string(), "sequence".to_string()];
    headers.extend((1..=fields).map(|i| format!("raw{i}")));
    headers
}

/// CSV writer of decoded records before calibration
pub struct RawWriter<W: Write> {
    writer: csv::Writer<W>,
    layout: Layout,
}

impl<W: Write> RawWriter<W> {
    pub fn new(inner: W, layout: Layout) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            layout,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(raw_headers(self.layout))?;
        Ok(())
    }

    /// One row per record: forward step from the previous record of the
    /// same file, sequence, then the data fields
    pub fn write_records(&mut self, records: &[RawRecord]) -> Result<usize> {
        let skip = embedded_sequence_fields(self.layout);
        let mut prev = None;
        for record in records {
            let delta = prev.map_or(0, |p: u16| record.seq.wrapping_sub(p));
            prev = Some(record.seq);

            let mut row = Vec::with_capacity(2 + record.fields.len());
            row.push(delta.to_string());
            row.push(record.seq.to_string());
            row.extend(record.fields.iter().skip(skip).map(|v| v.to_string()));
            self.writer.write_record(&row)?;
        }
        Ok(records.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| MMAError::Io(e.into_error()))
    }
}

/// Destination of an export
pub enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
    #[cfg(feature = "gzip")]
    Gzip(flate2::write::GzEncoder<BufWriter<File>>),
    /// Discards everything
    Sink(io::Sink),
}

impl Output {
    /// Open stdout, or `path` when given. Parent directories of `path` are
    /// created; `gzip` compresses the file.
    pub fn open(path: Option<&Path>, gzip: bool) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout()));
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                debug!("created output directory: {}", dir.display());
            }
        }
        let file = BufWriter::new(File::create(path)?);
        if gzip {
            #[cfg(feature = "gzip")]
            {
                use flate2::{write::GzEncoder, Compression};
                return Ok(Output::Gzip(GzEncoder::new(file, Compression::best())));
            }
            #[cfg(not(feature = "gzip"))]
            return Err(MMAError::Export(
                "gzip output requires the `gzip` feature".to_string(),
            ));
        }
        Ok(Output::File(file))
    }

    pub fn sink() -> Self {
        Output::Sink(io::sink())
    }

    /// Flush buffered data and write the gzip trailer
    pub fn finish(self) -> Result<()> {
        match self {
            Output::Stdout(mut w) => w.flush()?,
            Output::File(mut w) => w.flush()?,
            #[cfg(feature = "gzip")]
            Output::Gzip(w) => {
                w.finish()?.flush()?;
            }
            Output::Sink(_) => {}
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::File(w) => w.write(buf),
            #[cfg(feature = "gzip")]
            Output::Gzip(w) => w.write(buf),
            Output::Sink(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::File(w) => w.flush(),
            #[cfg(feature = "gzip")]
            Output::Gzip(w) => w.flush(),
            Output::Sink(w) => w.flush(),
        }
    }
}
