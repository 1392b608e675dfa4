use crate::error::{MMAError, Result};
use crate::parser::stream::ByteStream;
use crate::types::{Capture, CaptureHeader, HEADER_SIZE, MAGIC};
use log::debug;
use std::path::Path;

/// Read and validate a capture file
pub fn open_capture(path: &Path) -> Result<Capture> {
    let data = std::fs::read(path)?;
    debug!("{}: {} bytes", path.display(), data.len());
    read_capture(&data)
}

/// Validate the container header of an in-memory capture and split off the
/// record payload.
pub fn read_capture(data: &[u8]) -> Result<Capture> {
    let mut stream = ByteStream::new(data);
    let header = read_header(&mut stream)?;
    Ok(Capture {
        acquired: header.acquired(),
        header,
        payload: stream.rest().to_vec(),
    })
}

pub fn read_header(stream: &mut ByteStream<'_>) -> Result<CaptureHeader> {
    if stream.remaining() < HEADER_SIZE {
        return Err(MMAError::TruncatedHeader {
            available: stream.remaining(),
        });
    }
    let magic: [u8; 4] = stream.read_array()?;
    if magic != MAGIC {
        return Err(MMAError::InvalidFormat { magic });
    }
    Ok(CaptureHeader {
        magic,
        id: stream.read_u32()?,
        ticks: stream.read_i64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::epoch;
    use chrono::Duration;

    fn header_bytes(magic: &[u8; 4], id: u32, ticks: i64) -> Vec<u8> {
        let mut data = magic.to_vec();
        data.extend_from_slice(&id.to_be_bytes());
        data.extend_from_slice(&ticks.to_be_bytes());
        data
    }

    #[test]
    fn test_read_capture() {
        let mut data = header_bytes(b"MMA ", 7, 3_600_000_000_000);
        data.extend_from_slice(&[1, 2, 3]);
        let capture = read_capture(&data).unwrap();
        assert_eq!(capture.id(), 7);
        assert_eq!(capture.acquired, epoch() + Duration::hours(1));
        assert_eq!(capture.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_bad_magic() {
        let data = header_bytes(b"MMB ", 7, 0);
        match read_capture(&data) {
            Err(MMAError::InvalidFormat { magic }) => assert_eq!(&magic, b"MMB "),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes(b"MMA ", 7, 0);
        match read_capture(&data[..10]) {
            Err(MMAError::TruncatedHeader { available }) => assert_eq!(available, 10),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_payload() {
        let data = header_bytes(b"MMA ", 1, -1_000);
        let capture = read_capture(&data).unwrap();
        assert!(capture.payload.is_empty());
        assert!(capture.acquired < epoch());
    }
}
