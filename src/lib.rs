//! MMA Converter Library
//!
//! A Rust library for decoding MMA microgravity accelerometer capture files
//! and calibrating their records into temperatures and accelerations.
//! This library provides both in-memory data access and CSV export.
//!
//! # Features
//!
//! - **`csv`** (default): Enable CSV export functionality
//! - **`cli`** (default): Build the command-line interface binary
//! - **`json`**: Enable summary export in JSON format
//! - **`serde`**: Enable serialization/deserialization of types
//! - **`config`**: Load calibration tables and schedules from TOML
//! - **`gzip`**: Compress exported files
//!
//! # Quick Start
//!
//! Decode a capture file and access its records:
//! ```rust,no_run
//! use mmaconv::{convert_file, ConvertOptions};
//! use std::path::Path;
//!
//! let conversion = convert_file(Path::new("capture.dat"), &ConvertOptions::default()).unwrap();
//! println!("Decoded {} records", conversion.records.len());
//! println!("Capture time: {}", conversion.acquired);
//! ```
//!
//! Calibrate and export to CSV:
//! ```rust,no_run
//! use mmaconv::{calibrate_file, ConvertOptions, ExportOptions, MeasurementWriter, TimingMode, DEFAULT_TABLE};
//! use std::path::Path;
//!
//! let capture = calibrate_file(
//!     Path::new("capture.dat"),
//!     &DEFAULT_TABLE,
//!     &ConvertOptions::default(),
//!     TimingMode::Nominal,
//! )
//! .unwrap();
//! let mut writer = MeasurementWriter::new(std::io::stdout(), ExportOptions::default());
//! writer.write_header().unwrap();
//! writer.write_all(&capture.measurements).unwrap();
//! ```
//!
//! # Public API
//!
//! ## Decoding Functions
//! - [`convert_file`] - Decode, deduplicate and reassemble a capture file
//! - [`convert_bytes`] - Same for a capture image in memory
//! - [`decode_records`] - Low-level record decoding of a payload
//! - [`reassemble`] - Sequence ordering of a record stream
//!
//! ## Calibration Functions
//! - [`calibrate`] - Calibrate one record
//! - [`calibrate_file`] - Full pipeline for one file
//! - [`reconstruct`] / [`stamp`] - Sub-sample timestamps
//! - [`find_gaps`] - Sequence gaps between reassembled records
//!
//! ## Data Types
//! - [`RawRecord`] - Decoded record with its checksum and reliability flag
//! - [`Measurement`] - Calibrated record
//! - [`CalibrationTable`] - Coefficients and sampling settings
//! - [`CaptureSummary`] / [`SummaryTotals`] - Run statistics
//!
//! ## Export Functions
//! - [`MeasurementWriter`] - Calibrated CSV, split or flat
//! - [`RawWriter`] - Raw record dump
//! - [`Output`] - Stdout, file or gzip sink
//! - [`check_csv`] - Time and sequence continuity of an exported CSV
//!
//! ## Filtering Functions
//! - [`should_skip_capture`] - Decide if a capture is left out of a run
//! - [`Schedule`] / [`Exclude`] - Time ranges and name suffixes

// Module declarations
pub mod calibration;
#[cfg(feature = "csv")]
pub mod check;
pub mod error;
#[cfg(feature = "csv")]
pub mod export;
pub mod filters;
pub mod parser;
pub mod summary;
pub mod timing;
pub mod types;

// Re-export everything from modules for convenience
#[allow(ambiguous_glob_reexports)]
pub use calibration::*;
#[cfg(feature = "csv")]
#[allow(ambiguous_glob_reexports)]
pub use check::*;
#[allow(ambiguous_glob_reexports)]
pub use error::*;
#[cfg(feature = "csv")]
#[allow(ambiguous_glob_reexports)]
pub use export::*;
#[allow(ambiguous_glob_reexports)]
pub use filters::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use summary::*;
#[allow(ambiguous_glob_reexports)]
pub use timing::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;
