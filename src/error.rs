use std::fmt;

/// Errors raised while reading, decoding or exporting MMA captures
#[derive(Debug)]
pub enum MMAError {
    /// I/O errors
    Io(std::io::Error),
    /// Container magic does not match `MMA `
    InvalidFormat { magic: [u8; 4] },
    /// Fewer bytes than a container header
    TruncatedHeader { available: usize },
    /// Payload ends in the middle of a record
    TruncatedRecord {
        offset: usize,
        available: usize,
        expected: usize,
    },
    /// Invalid calibration table or schedule
    Config(String),
    /// Export format error
    Export(String),
}

impl MMAError {
    /// True for errors that end a decode pass but leave earlier records usable
    pub fn is_truncation(&self) -> bool {
        matches!(self, MMAError::TruncatedRecord { .. })
    }
}

impl fmt::Display for MMAError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MMAError::Io(err) => write!(f, "I/O error: {}", err),
            MMAError::InvalidFormat { magic } => {
                write!(
                    f,
                    "Invalid format: bad magic {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            MMAError::TruncatedHeader { available } => write!(
                f,
                "Truncated header: {} bytes available, {} required",
                available,
                crate::types::HEADER_SIZE
            ),
            MMAError::TruncatedRecord {
                offset,
                available,
                expected,
            } => write!(
                f,
                "Truncated record at payload offset {}: {} of {} bytes",
                offset, available, expected
            ),
            MMAError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MMAError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for MMAError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MMAError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MMAError {
    fn from(err: std::io::Error) -> Self {
        MMAError::Io(err)
    }
}

#[cfg(feature = "csv")]
impl From<csv::Error> for MMAError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(err) => MMAError::Io(err),
            kind => MMAError::Export(format!("{:?}", kind)),
        }
    }
}

pub type Result<T> = std::result::Result<T, MMAError>;
