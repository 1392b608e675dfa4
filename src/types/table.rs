use crate::types::record::{Axis, Layout};
use chrono::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reference temperature of the instrument model, in Celsius
pub const TEMP_MMA: f64 = 20.0;
/// Absolute zero, rounded as the instrument model expects
pub const TEMP_ZERO: f64 = -273.0;
/// Offset applied to the micro-ampere value before polynomial evaluation
pub const TEMP_DELTA: f64 = TEMP_ZERO - TEMP_MMA;

/// One value per axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Xyz<T> {
    #[cfg_attr(feature = "serde", serde(rename = "X", alias = "x"))]
    pub x: T,
    #[cfg_attr(feature = "serde", serde(rename = "Y", alias = "y"))]
    pub y: T,
    #[cfg_attr(feature = "serde", serde(rename = "Z", alias = "z"))]
    pub z: T,
}

impl<T: Copy> Xyz<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> T {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            x: f(Axis::X),
            y: f(Axis::Y),
            z: f(Axis::Z),
        }
    }
}

/// Polynomial coefficients of one axis.
///
/// `A0`/`A1` is the linear temperature fit, `B0..B4` the offset quartic and
/// `C0..C4` the scale-factor quartic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub struct AxisCoefficients {
    pub a0: f64,
    pub a1: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
    pub b4: f64,
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
}

/// Calibration table of an instrument
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationTable {
    /// Nominal sampling frequency in Hz
    #[cfg_attr(feature = "serde", serde(alias = "Frequency"))]
    pub frequency: u32,
    pub layout: Layout,
    #[cfg_attr(feature = "serde", serde(alias = "Scale"))]
    pub scale: Xyz<f64>,
    #[cfg_attr(feature = "serde", serde(alias = "Offset"))]
    pub offset: Xyz<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "x-axis"))]
    pub axis_x: AxisCoefficients,
    #[cfg_attr(feature = "serde", serde(rename = "y-axis"))]
    pub axis_y: AxisCoefficients,
    #[cfg_attr(feature = "serde", serde(rename = "z-axis"))]
    pub axis_z: AxisCoefficients,
}

/// Reference instrument table
pub const DEFAULT_TABLE: CalibrationTable = CalibrationTable {
    frequency: 1500,
    layout: Layout::A,
    scale: Xyz::new(3.452, 3.432, 3.432),
    offset: Xyz::new(-1407.7, -744.7, -214.3),
    axis_x: AxisCoefficients {
        a0: 294.09,
        a1: 1.00829,
        b0: -1307.0,
        b1: 0.36,
        b2: 11.8e-03,
        b3: -15.0e-06,
        b4: -30.0e-08,
        c0: 1.301521,
        c1: 60.85e-06,
        c2: 665.7e-09,
        c3: -2481.0e-12,
        c4: 620.0e-14,
    },
    axis_y: AxisCoefficients {
        a0: 292.794,
        a1: 1.01061,
        b0: -835.0,
        b1: -7.05,
        b2: 0.8e-03,
        b3: -17.0e-06,
        b4: 31.0e-08,
        c0: 1.301964,
        c1: 57.5e-06,
        c2: 758.8e-09,
        c3: -2608.0e-12,
        c4: 303.0e-14,
    },
    axis_z: AxisCoefficients {
        a0: 293.902,
        a1: 1.00191,
        b0: -290.0,
        b1: -1.11,
        b2: 8.5e-03,
        b3: -49.0e-06,
        b4: -76.0e-08,
        c0: 1.304559,
        c1: 64.0e-06,
        c2: 700.9e-09,
        c3: -2495.0e-12,
        c4: 464.0e-14,
    },
};

impl Default for CalibrationTable {
    fn default() -> Self {
        DEFAULT_TABLE
    }
}

impl CalibrationTable {
    pub fn axis(&self, axis: Axis) -> &AxisCoefficients {
        match axis {
            Axis::X => &self.axis_x,
            Axis::Y => &self.axis_y,
            Axis::Z => &self.axis_z,
        }
    }

    /// Nominal spacing between two sub-samples; zero when no frequency is set
    pub fn sample_interval(&self) -> Duration {
        if self.frequency == 0 {
            return Duration::zero();
        }
        Duration::nanoseconds(1_000_000_000 / self.frequency as i64)
    }

    /// Parse a TOML table; keys it does not name keep their reference value
    #[cfg(feature = "config")]
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::MMAError::Config(e.to_string()))
    }

    #[cfg(feature = "config")]
    pub fn from_toml_file(path: &std::path::Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| crate::MMAError::Config(format!("{}: {}", path.display(), e)))
    }
}
