#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Acceleration sub-samples packed per axis in one record
pub const MEAS_COUNT: usize = 9;

/// Size in bytes of one encoded record, identical for both layouts
pub const RECORD_SIZE: usize = 64;

/// Instrument axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Record layout generation.
///
/// Both layouts occupy [`RECORD_SIZE`] bytes on disk; they differ in how the
/// sixteen-bit words are indexed once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Layout {
    /// u16 sequence prefix followed by 31 signed fields
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "a", alias = "A"))]
    A,
    /// 32 signed fields, the sequence number being field 0
    #[cfg_attr(feature = "serde", serde(rename = "b", alias = "B"))]
    B,
}

impl Layout {
    /// Number of signed fields kept in [`RawRecord::fields`]
    pub fn field_count(self) -> usize {
        match self {
            Layout::A => 31,
            Layout::B => 32,
        }
    }

    /// Whether the sequence number is encoded ahead of the fields
    pub fn has_sequence_prefix(self) -> bool {
        matches!(self, Layout::A)
    }

    /// Field index of the raw temperature count for an axis
    pub fn temperature_index(self, axis: Axis) -> usize {
        match self {
            Layout::A => axis.index(),
            Layout::B => 1 + axis.index(),
        }
    }

    /// Field index of the first acceleration sub-sample for an axis; the
    /// following ones are spaced by a stride of three.
    pub fn acceleration_start(self, axis: Axis) -> usize {
        match self {
            Layout::A => 4 + axis.index(),
            Layout::B => 5 + axis.index(),
        }
    }

    /// Field indices of the nine acceleration sub-samples of an axis
    pub fn acceleration_indices(self, axis: Axis) -> impl Iterator<Item = usize> {
        (self.acceleration_start(axis)..self.field_count())
            .step_by(3)
            .take(MEAS_COUNT)
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Layout::A),
            "b" | "legacy" => Ok(Layout::B),
            other => Err(format!("unknown record layout '{other}' (expected a or b)")),
        }
    }
}

/// One decoded record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRecord {
    pub seq: u16,
    pub fields: Vec<i16>,
    /// Adler-32 of the exact encoded bytes, used as deduplication key
    pub checksum: u32,
    /// Set by the reassembler when a sequence discontinuity makes the
    /// timing of this record unreliable
    pub unreliable: bool,
}

impl RawRecord {
    /// Build a record from its sequence number and fields; the checksum is
    /// computed from the layout encoding.
    ///
    /// For [`Layout::B`] field 0 is overwritten with the sequence number so
    /// that the two stay consistent.
    pub fn new(seq: u16, mut fields: Vec<i16>, layout: Layout) -> Self {
        fields.resize(layout.field_count(), 0);
        if layout == Layout::B {
            fields[0] = seq as i16;
        }
        let mut record = Self {
            seq,
            fields,
            checksum: 0,
            unreliable: false,
        };
        record.checksum = adler2::adler32_slice(&record.encode(layout));
        record
    }

    /// Big-endian encoding of the record as it appears in a capture payload
    pub fn encode(&self, layout: Layout) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut pos = 0;
        if layout.has_sequence_prefix() {
            buf[..2].copy_from_slice(&self.seq.to_be_bytes());
            pos = 2;
        }
        for value in self.fields.iter().take(layout.field_count()) {
            buf[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
            pos += 2;
        }
        buf
    }

    /// Raw temperature count of an axis
    pub fn temperature(&self, layout: Layout, axis: Axis) -> i16 {
        self.fields
            .get(layout.temperature_index(axis))
            .copied()
            .unwrap_or_default()
    }

    /// Raw acceleration sub-samples of an axis
    pub fn accelerations(&self, layout: Layout, axis: Axis) -> [i16; MEAS_COUNT] {
        let mut values = [0i16; MEAS_COUNT];
        for (slot, index) in values.iter_mut().zip(layout.acceleration_indices(axis)) {
            *slot = self.fields.get(index).copied().unwrap_or_default();
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_a_indices() {
        let x: Vec<usize> = Layout::A.acceleration_indices(Axis::X).collect();
        let z: Vec<usize> = Layout::A.acceleration_indices(Axis::Z).collect();
        assert_eq!(x, vec![4, 7, 10, 13, 16, 19, 22, 25, 28]);
        assert_eq!(z, vec![6, 9, 12, 15, 18, 21, 24, 27, 30]);
        assert_eq!(Layout::A.temperature_index(Axis::Y), 1);
    }

    #[test]
    fn test_layout_b_indices() {
        let x: Vec<usize> = Layout::B.acceleration_indices(Axis::X).collect();
        let z: Vec<usize> = Layout::B.acceleration_indices(Axis::Z).collect();
        assert_eq!(x, vec![5, 8, 11, 14, 17, 20, 23, 26, 29]);
        assert_eq!(z, vec![7, 10, 13, 16, 19, 22, 25, 28, 31]);
        assert_eq!(Layout::B.temperature_index(Axis::X), 1);
    }

    #[test]
    fn test_layouts_share_byte_encoding() {
        let fields_a: Vec<i16> = (0..31).map(|i| i * 3 - 40).collect();
        let mut fields_b = vec![0i16];
        fields_b.extend_from_slice(&fields_a);

        let a = RawRecord::new(0xBEEF, fields_a, Layout::A);
        let b = RawRecord::new(0xBEEF, fields_b, Layout::B);
        assert_eq!(a.encode(Layout::A), b.encode(Layout::B));
        assert_eq!(a.checksum, b.checksum);
        assert_eq!(
            a.accelerations(Layout::A, Axis::Y),
            b.accelerations(Layout::B, Axis::Y)
        );
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("A".parse::<Layout>().unwrap(), Layout::A);
        assert_eq!("legacy".parse::<Layout>().unwrap(), Layout::B);
        assert!("c".parse::<Layout>().is_err());
    }
}
