//! Integration tests for the decode, calibrate and export layers
//!
//! Tests the library across different scenarios:
//! - Capture files built on disk and decoded end to end
//! - Timestamp reconstruction at the nominal frequency
//! - Truncated and invalid files
//! - Output sink directory creation and gzip compression

use chrono::{Duration, TimeZone, Utc};
use mmaconv::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NAME: &str = "MMA_LAB_UNIT_01_0042_20190318_125900_7.dat";

fn records(seqs: &[u16]) -> Vec<RawRecord> {
    seqs.iter()
        .map(|&seq| {
            let fields = (0..31).map(|i| (i as i16 + 1) * (seq as i16 % 50)).collect();
            RawRecord::new(seq, fields, Layout::A)
        })
        .collect()
}

fn write_capture(dir: &Path, name: &str, id: u32, records: &[RawRecord]) -> PathBuf {
    let acquired = Utc.with_ymd_and_hms(2019, 3, 18, 12, 59, 0).unwrap();
    let data = encode_capture(&CaptureHeader::new(id, acquired), records, Layout::A);
    let path = dir.join(name);
    fs::write(&path, data).expect("Failed to write capture file");
    path
}

#[test]
fn test_calibrate_file_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = records(&[0, 18, 9, 27, 18]);
    let path = write_capture(temp_dir.path(), NAME, 4242, &input);

    let capture = calibrate_file(
        &path,
        &DEFAULT_TABLE,
        &ConvertOptions::default(),
        TimingMode::Nominal,
    )
    .expect("calibration should succeed");

    let seqs: Vec<u16> = capture.measurements.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![0, 9, 18, 27]);
    assert_eq!(capture.conversion.duplicates, 1);
    assert_eq!(capture.name.upi, "LAB_UNIT");
    assert_eq!(capture.sample_count(), 36);

    let acquired = Utc.with_ymd_and_hms(2019, 3, 18, 12, 59, 0).unwrap();
    let delta = Duration::nanoseconds(666_666);
    let second = &capture.measurements[1];
    assert_eq!(second.vid, 4242);
    assert_eq!(second.upi, "LAB_UNIT");
    assert_eq!(second.sample_time(0), Some(acquired + delta * 9));
    assert_eq!(second.sample_time(1), Some(acquired + delta * 10));
}

#[test]
fn test_truncated_file_keeps_complete_records() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_capture(temp_dir.path(), "short.dat", 1, &records(&[0, 9, 18]));
    let mut data = fs::read(&path).unwrap();
    data.truncate(HEADER_SIZE + 2 * RECORD_SIZE + 10);
    fs::write(&path, data).unwrap();

    let conversion = convert_file(&path, &ConvertOptions::default()).unwrap();
    assert_eq!(conversion.records.len(), 2);
    match conversion.truncation {
        Some(MMAError::TruncatedRecord {
            available,
            expected,
            ..
        }) => {
            assert_eq!(available, 10);
            assert_eq!(expected, RECORD_SIZE);
        }
        other => panic!("expected a truncated record, got {other:?}"),
    }
}

#[test]
fn test_header_only_file_is_empty() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_capture(temp_dir.path(), "empty.dat", 1, &[]);
    let conversion = convert_file(&path, &ConvertOptions::default()).unwrap();
    assert!(conversion.records.is_empty());
    assert!(!conversion.is_truncated());
}

#[test]
fn test_invalid_files_are_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let short = temp_dir.path().join("short.dat");
    fs::write(&short, b"MMA \0\0").unwrap();
    assert!(matches!(
        convert_file(&short, &ConvertOptions::default()),
        Err(MMAError::TruncatedHeader { available: 6 })
    ));

    let wrong = temp_dir.path().join("wrong.dat");
    fs::write(&wrong, [b'X'; 80]).unwrap();
    assert!(matches!(
        convert_file(&wrong, &ConvertOptions::default()),
        Err(MMAError::InvalidFormat { .. })
    ));

    let missing = temp_dir.path().join("missing.dat");
    assert!(matches!(
        convert_file(&missing, &ConvertOptions::default()),
        Err(MMAError::Io(_))
    ));
}

#[test]
fn test_discontinuity_blanks_time_column() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_capture(
        temp_dir.path(),
        NAME,
        7,
        &records(&[0, 9, 18, 27, 5000, 5009]),
    );
    let capture = calibrate_file(
        &path,
        &DEFAULT_TABLE,
        &ConvertOptions::default(),
        TimingMode::Nominal,
    )
    .unwrap();
    assert_eq!(capture.conversion.discontinuities, 1);

    let mut writer = MeasurementWriter::new(Vec::new(), ExportOptions::default());
    writer.write_header().unwrap();
    writer.write_all(&capture.measurements).unwrap();
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 1 + 6 * MEAS_COUNT);
    assert!(lines[1..=4 * MEAS_COUNT].iter().all(|l| l.starts_with(',')));
    assert!(lines[4 * MEAS_COUNT + 1].starts_with("2019.077.12.59.00.000000,"));
}

#[test]
fn test_summary_of_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let a = write_capture(temp_dir.path(), "a.dat", 1, &records(&[0, 9, 18]));
    let b = write_capture(temp_dir.path(), "b.dat", 2, &records(&[0, 9, 9, 45]));

    let summaries: Vec<CaptureSummary> = [a, b]
        .iter()
        .map(|p| {
            let conversion = convert_file(p, &ConvertOptions::default()).unwrap();
            CaptureSummary::from_conversion(p, &conversion)
        })
        .collect();
    assert_eq!(summaries[1].duplicates, 1);
    assert_eq!(summaries[1].gaps, 1);

    let totals = SummaryTotals::from_summaries(&summaries);
    assert_eq!(totals.files, 2);
    assert_eq!(totals.samples, 54);
    assert_eq!(totals.counts[&27].files, 2);
}

#[test]
fn test_output_creates_parent_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let target = temp_dir.path().join("nested").join("out").join("data.csv");

    let mut output = Output::open(Some(target.as_path()), false).unwrap();
    use std::io::Write;
    writeln!(output, "hello").unwrap();
    output.finish().unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
}

#[cfg(feature = "gzip")]
#[test]
fn test_gzip_output() {
    use flate2::read::GzDecoder;
    use std::io::{Read, Write};

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let target = temp_dir.path().join("data.csv.gz");

    let mut output = Output::open(Some(target.as_path()), true).unwrap();
    output.write_all(b"time,upi\n").unwrap();
    output.finish().unwrap();

    let bytes = fs::read(&target).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    let mut text = String::new();
    GzDecoder::new(&bytes[..]).read_to_string(&mut text).unwrap();
    assert_eq!(text, "time,upi\n");
}

#[cfg(feature = "config")]
#[test]
fn test_table_file_overrides_reference() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("table.toml");
    fs::write(&path, "frequency = 1000\nlayout = \"b\"\n").unwrap();

    let table = CalibrationTable::from_toml_file(&path).unwrap();
    assert_eq!(table.frequency, 1000);
    assert_eq!(table.layout, Layout::B);
    assert_eq!(table.axis_x, DEFAULT_TABLE.axis_x);
    assert_eq!(table.sample_interval(), Duration::milliseconds(1));
}

#[test]
fn test_files_calibrate_independently_across_threads() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let paths: Vec<PathBuf> = (0..4u16)
        .map(|i| {
            let seqs: Vec<u16> = (0..10).map(|k| i * 1000 + k * 9).collect();
            write_capture(temp_dir.path(), &format!("f{i}.dat"), i as u32, &records(&seqs))
        })
        .collect();

    let table = DEFAULT_TABLE;
    let sequential: Vec<Vec<Measurement>> = paths
        .iter()
        .map(|p| {
            calibrate_file(p, &table, &ConvertOptions::default(), TimingMode::Nominal)
                .unwrap()
                .measurements
        })
        .collect();

    let parallel: Vec<Vec<Measurement>> = std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|p| {
                let table = &table;
                scope.spawn(move || {
                    calibrate_file(p, table, &ConvertOptions::default(), TimingMode::Nominal)
                        .unwrap()
                        .measurements
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}
