use crate::types::record::MEAS_COUNT;
use crate::types::table::Xyz;
use chrono::{DateTime, Duration, Utc};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Calibrated values of one record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Measurement {
    pub seq: u16,
    /// Capture id of the originating file
    pub vid: u32,
    /// Unit id derived from the file name
    pub upi: String,
    /// Capture time of the originating file
    pub acquired: DateTime<Utc>,
    /// Time of the first sub-sample, `None` when timing is unreliable or
    /// has not been reconstructed yet
    pub when: Option<DateTime<Utc>>,
    /// Spacing between the sub-samples of this record
    #[cfg_attr(feature = "serde", serde(skip))]
    pub interval: Duration,
    pub unreliable: bool,
    /// Temperatures in Celsius
    pub degrees: Xyz<f64>,
    /// Temperatures as micro-ampere values
    pub mica: Xyz<f64>,
    pub scale: Xyz<f64>,
    pub offset: Xyz<f64>,
    pub acceleration: Xyz<[f64; MEAS_COUNT]>,
}

impl Measurement {
    /// Timestamp of sub-sample `index`
    pub fn sample_time(&self, index: usize) -> Option<DateTime<Utc>> {
        self.when.map(|t| t + self.interval * index as i32)
    }

    /// Timestamps of all sub-samples
    pub fn sample_times(&self) -> [Option<DateTime<Utc>>; MEAS_COUNT] {
        std::array::from_fn(|i| self.sample_time(i))
    }
}
