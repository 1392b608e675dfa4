use crate::types::record::{Layout, RawRecord};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Container marker found at the start of every capture file
pub const MAGIC: [u8; 4] = *b"MMA ";

/// Magic (4) + capture id (4) + tick count (8)
pub const HEADER_SIZE: usize = 16;

/// Capture time reference, 1980-01-06T00:00:00Z
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Fixed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaptureHeader {
    pub magic: [u8; 4],
    /// Capture/session id (the "vmu sequence")
    pub id: u32,
    /// Nanosecond ticks since [`epoch`]
    pub ticks: i64,
}

impl CaptureHeader {
    pub fn new(id: u32, acquired: DateTime<Utc>) -> Self {
        let ticks = (acquired - epoch()).num_nanoseconds().unwrap_or(i64::MAX);
        Self {
            magic: MAGIC,
            id,
            ticks,
        }
    }

    /// Absolute capture time
    pub fn acquired(&self) -> DateTime<Utc> {
        epoch() + Duration::nanoseconds(self.ticks)
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.id.to_be_bytes());
        buf[8..16].copy_from_slice(&self.ticks.to_be_bytes());
        buf
    }
}

/// Capture file contents once the header has been validated
#[derive(Debug, Clone)]
pub struct Capture {
    pub header: CaptureHeader,
    pub acquired: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl Capture {
    pub fn id(&self) -> u32 {
        self.header.id
    }
}

/// Build the byte image of a capture file
pub fn encode_capture(header: &CaptureHeader, records: &[RawRecord], layout: Layout) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_SIZE + records.len() * crate::RECORD_SIZE);
    data.extend_from_slice(&header.encode());
    for record in records {
        data.extend_from_slice(&record.encode(layout));
    }
    data
}

/// Information carried by the capture file name.
///
/// Names follow `<prefix>_<upi...>_<x>_<seq>_<YYYYMMDD>_<HHMMSS>_<suffix>`;
/// the unit id may itself contain underscores.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaptureName {
    pub upi: String,
    pub sequence: Option<u32>,
    pub acquired: Option<NaiveDateTime>,
}

impl CaptureName {
    pub fn parse(path: &Path) -> Self {
        let base = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let parts: Vec<&str> = base.split('_').collect();
        let n = parts.len();

        let upi = if n >= 6 {
            parts[1..n - 5].join("_")
        } else {
            String::new()
        };
        let (sequence, acquired) = if n >= 4 {
            let when = format!("{}_{}", parts[n - 3], parts[n - 2]);
            (
                parts[n - 4].parse().ok(),
                NaiveDateTime::parse_from_str(&when, "%Y%m%d_%H%M%S").ok(),
            )
        } else {
            (None, None)
        };

        Self {
            upi,
            sequence,
            acquired,
        }
    }

    /// Traversal ordering: acquisition time, then file sequence, with a
    /// lexical fallback when either name carries no time.
    pub fn compare_paths(a: &Path, b: &Path) -> std::cmp::Ordering {
        let (na, nb) = (Self::parse(a), Self::parse(b));
        match (na.acquired, nb.acquired) {
            (Some(ta), Some(tb)) => ta
                .cmp(&tb)
                .then(na.sequence.unwrap_or(0).cmp(&nb.sequence.unwrap_or(0))),
            _ => a.file_name().cmp(&b.file_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_header_encode_acquired() {
        let when = Utc.with_ymd_and_hms(2019, 3, 18, 12, 59, 0).unwrap();
        let header = CaptureHeader::new(42, when);
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], b"MMA ");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 42]);
        assert_eq!(header.acquired(), when);
    }

    #[test]
    fn test_epoch() {
        assert_eq!(epoch().to_rfc3339(), "1980-01-06T00:00:00+00:00");
        let header = CaptureHeader {
            magic: MAGIC,
            id: 0,
            ticks: 1_500,
        };
        assert_eq!(header.acquired() - epoch(), Duration::nanoseconds(1_500));
    }

    #[test]
    fn test_capture_name_parse() {
        let name =
            CaptureName::parse(Path::new("/data/MMA_LAB_UNIT_01_0042_20190318_125900_7.dat"));
        assert_eq!(name.upi, "LAB_UNIT");
        assert_eq!(name.sequence, Some(42));
        assert_eq!(
            name.acquired.map(|t| t.to_string()),
            Some("2019-03-18 12:59:00".to_string())
        );
    }

    #[test]
    fn test_capture_name_short() {
        let name = CaptureName::parse(Path::new("capture.dat"));
        assert_eq!(name, CaptureName::default());
    }

    #[test]
    fn test_compare_paths() {
        let mut files = vec![
            PathBuf::from("MMA_U_01_0002_20190318_130000_1.dat"),
            PathBuf::from("MMA_U_01_0009_20190318_125900_1.dat"),
            PathBuf::from("MMA_U_01_0001_20190318_130000_1.dat"),
        ];
        files.sort_by(|a, b| CaptureName::compare_paths(a, b));
        assert_eq!(
            files[0].to_str().unwrap(),
            "MMA_U_01_0009_20190318_125900_1.dat"
        );
        assert_eq!(
            files[1].to_str().unwrap(),
            "MMA_U_01_0001_20190318_130000_1.dat"
        );
    }
}
