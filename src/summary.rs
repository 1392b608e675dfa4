//! Per-file and aggregate statistics of a run

use crate::calibration::CalibratedCapture;
use crate::parser::Conversion;
use crate::timing::find_gaps;
use crate::types::{CaptureName, MEAS_COUNT};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Statistics of one capture file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub upi: String,
    /// Capture id from the file header
    pub vid: u32,
    pub acquired: DateTime<Utc>,
    pub records: usize,
    pub samples: usize,
    pub duplicates: usize,
    pub unreliable: usize,
    pub gaps: usize,
    pub truncated: bool,
}

impl CaptureSummary {
    pub fn from_conversion(path: &Path, conversion: &Conversion) -> Self {
        Self {
            path: path.to_path_buf(),
            upi: CaptureName::parse(path).upi,
            vid: conversion.header.id,
            acquired: conversion.acquired,
            records: conversion.records.len(),
            samples: conversion.records.len() * MEAS_COUNT,
            duplicates: conversion.duplicates,
            unreliable: conversion.unreliable_count(),
            gaps: find_gaps(&conversion.records).len(),
            truncated: conversion.is_truncated(),
        }
    }
}

impl From<&CalibratedCapture> for CaptureSummary {
    fn from(capture: &CalibratedCapture) -> Self {
        let mut summary = Self::from_conversion(&capture.path, &capture.conversion);
        summary.upi = capture.name.upi.clone();
        summary
    }
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>8} samples (vmu-seq: {:>6}) records={} duplicates={} unreliable={} gaps={}",
            self.path.display(),
            self.samples,
            self.vid,
            self.records,
            self.duplicates,
            self.unreliable,
            self.gaps
        )?;
        if self.truncated {
            write!(f, " truncated")?;
        }
        Ok(())
    }
}

/// Files sharing the same sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SampleCount {
    pub files: usize,
    /// Capture id of the first file seen with this count
    pub vid: u32,
}

/// Aggregate over all files of a run
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SummaryTotals {
    pub files: usize,
    pub samples: usize,
    pub average: f64,
    pub min: usize,
    pub max: usize,
    pub duplicates: usize,
    pub unreliable: usize,
    pub truncated: usize,
    /// Histogram keyed by samples per file
    pub counts: BTreeMap<usize, SampleCount>,
}

impl SummaryTotals {
    pub fn add(&mut self, summary: &CaptureSummary) {
        if self.files == 0 {
            self.min = summary.samples;
            self.max = summary.samples;
        } else {
            self.min = self.min.min(summary.samples);
            self.max = self.max.max(summary.samples);
        }
        self.files += 1;
        self.samples += summary.samples;
        self.average = self.samples as f64 / self.files as f64;
        self.duplicates += summary.duplicates;
        self.unreliable += summary.unreliable;
        if summary.truncated {
            self.truncated += 1;
        }
        self.counts
            .entry(summary.samples)
            .or_insert(SampleCount {
                files: 0,
                vid: summary.vid,
            })
            .files += 1;
    }

    pub fn from_summaries<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a CaptureSummary>,
    {
        let mut totals = Self::default();
        for summary in summaries {
            totals.add(summary);
        }
        totals
    }
}

impl fmt::Display for SummaryTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "files={} samples={} avg={:.2} min={} max={}",
            self.files, self.samples, self.average, self.min, self.max
        )?;
        writeln!(
            f,
            "duplicates={} unreliable={} truncated={}",
            self.duplicates, self.unreliable, self.truncated
        )?;
        for (samples, count) in &self.counts {
            writeln!(
                f,
                "{:>8}: {:>6} files (vmu-seq: {:>6})",
                samples, count.files, count.vid
            )?;
        }
        Ok(())
    }
}

/// Summaries and totals as one pretty JSON document
#[cfg(feature = "json")]
pub fn summary_to_json(
    summaries: &[CaptureSummary],
    totals: &SummaryTotals,
) -> crate::Result<String> {
    #[derive(Serialize)]
    struct Report<'a> {
        files: &'a [CaptureSummary],
        totals: &'a SummaryTotals,
    }
    serde_json::to_string_pretty(&Report {
        files: summaries,
        totals,
    })
    .map_err(|e| crate::MMAError::Export(e.to_string()))
}
