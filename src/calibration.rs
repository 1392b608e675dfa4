//! Calibration of raw records into physical units
//!
//! Each axis goes through the same chain:
//! raw temperature count -> micro-ampere value -> Celsius, then two quartic
//! corrections evaluated at the temperature-corrected input give the scale
//! factor and the offset applied to the nine acceleration sub-samples.

use crate::error::Result;
use crate::parser::{convert_file, Conversion, ConvertOptions};
use crate::timing::{find_gaps, stamp, TimingMode};
use crate::types::{
    Axis, AxisCoefficients, CalibrationTable, CaptureName, Measurement, RawRecord, Xyz, MEAS_COUNT,
    TEMP_DELTA, TEMP_MMA,
};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::path::{Path, PathBuf};

/// Micro-ampere per raw temperature count
pub const MICA_GAIN: f64 = 2.803e-3;
/// Micro-ampere value of a zero count
pub const MICA_ZERO: f64 = 272.48;

impl AxisCoefficients {
    /// Micro-ampere value and temperature in Celsius of a raw count
    pub fn temperatures(&self, raw: f64) -> (f64, f64) {
        let mica = raw * MICA_GAIN + MICA_ZERO;
        let celsius = (mica - self.a0) / self.a1 + TEMP_MMA;
        (mica, celsius)
    }

    /// Scale factor at the corrected input `x`
    pub fn scale_factor(&self, baseline: f64, x: f64) -> f64 {
        let quartic = quartic(self.c0, self.c1, self.c2, self.c3, self.c4, x);
        baseline * self.c0 / quartic
    }

    /// Offset at the corrected input `x`; the constant term is the table's
    /// baseline offset, not `B0`
    pub fn temperature_offset(&self, baseline: f64, x: f64) -> f64 {
        quartic(baseline, self.b1, self.b2, self.b3, self.b4, x)
    }
}

fn quartic(k0: f64, k1: f64, k2: f64, k3: f64, k4: f64, x: f64) -> f64 {
    k0 + k1 * x + k2 * x.powi(2) + k3 * x.powi(3) + k4 * x.powi(4)
}

/// Per-axis intermediate values of one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub mica: f64,
    pub celsius: f64,
    pub scale: f64,
    pub offset: f64,
}

/// Temperature, scale factor and offset of one axis for a raw count
pub fn calibrate_axis(
    table: &CalibrationTable,
    axis: Axis,
    raw_temperature: i16,
) -> AxisCalibration {
    let coefficients = table.axis(axis);
    let (mica, celsius) = coefficients.temperatures(raw_temperature as f64);
    let x = mica + TEMP_DELTA;
    AxisCalibration {
        mica,
        celsius,
        scale: coefficients.scale_factor(table.scale.get(axis), x),
        offset: coefficients.temperature_offset(table.offset.get(axis), x),
    }
}

/// Convert one record into a [`Measurement`].
///
/// Pure function of its inputs. Timing fields are left for the time
/// reconstructor: `when` is `None` and `acquired` is the epoch default.
pub fn calibrate(table: &CalibrationTable, record: &RawRecord) -> Measurement {
    let layout = table.layout;
    let axes = Xyz::from_fn(|axis| calibrate_axis(table, axis, record.temperature(layout, axis)));
    let acceleration = Xyz::from_fn(|axis| {
        let cal = axes.get(axis);
        let raw = record.accelerations(layout, axis);
        let mut values = [0f64; MEAS_COUNT];
        for (value, raw) in values.iter_mut().zip(raw) {
            *value = raw as f64 * cal.scale - cal.offset;
        }
        values
    });

    Measurement {
        seq: record.seq,
        vid: 0,
        upi: String::new(),
        acquired: DateTime::<Utc>::default(),
        when: None,
        interval: Duration::zero(),
        unreliable: record.unreliable,
        degrees: Xyz::from_fn(|axis| axes.get(axis).celsius),
        mica: Xyz::from_fn(|axis| axes.get(axis).mica),
        scale: Xyz::from_fn(|axis| axes.get(axis).scale),
        offset: Xyz::from_fn(|axis| axes.get(axis).offset),
        acceleration,
    }
}

/// Calibrated records of one capture file
#[derive(Debug)]
pub struct CalibratedCapture {
    pub path: PathBuf,
    pub name: CaptureName,
    pub conversion: Conversion,
    pub measurements: Vec<Measurement>,
}

impl CalibratedCapture {
    pub fn sample_count(&self) -> usize {
        self.measurements.len() * MEAS_COUNT
    }
}

/// Calibrate the reassembled records of a capture and rebuild their
/// sub-sample times.
pub fn calibrate_conversion(
    table: &CalibrationTable,
    conversion: &Conversion,
    upi: &str,
    timing: TimingMode,
) -> Vec<Measurement> {
    let mut measurements: Vec<Measurement> = conversion
        .records
        .iter()
        .map(|record| {
            let mut m = calibrate(table, record);
            m.vid = conversion.header.id;
            m.upi = upi.to_string();
            m.acquired = conversion.acquired;
            m
        })
        .collect();
    stamp(&mut measurements, timing.interval(table));
    measurements
}

/// Read, reassemble and calibrate one capture file.
///
/// Records are decoded with the layout of `table`; the other decode
/// settings come from `options`.
pub fn calibrate_file(
    path: &Path,
    table: &CalibrationTable,
    options: &ConvertOptions,
    timing: TimingMode,
) -> Result<CalibratedCapture> {
    let options = ConvertOptions {
        layout: table.layout,
        ..*options
    };
    let conversion = convert_file(path, &options)?;
    let name = CaptureName::parse(path);

    let gaps = find_gaps(&conversion.records);
    for gap in &gaps {
        debug!(
            "{}: gap of {} between {} and {} at record {}",
            path.display(),
            gap.gap,
            gap.previous,
            gap.current,
            gap.index
        );
    }

    let measurements = calibrate_conversion(table, &conversion, &name.upi, timing);
    Ok(CalibratedCapture {
        path: path.to_path_buf(),
        name,
        conversion,
        measurements,
    })
}
