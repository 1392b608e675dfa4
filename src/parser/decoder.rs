use crate::error::{MMAError, Result};
use crate::parser::stream::ByteStream;
use crate::types::{Layout, RawRecord, RECORD_SIZE};

/// Single forward pass over a record payload.
///
/// Yields one [`RawRecord`] per full record. A trailing partial record is
/// reported once as [`MMAError::TruncatedRecord`], after which the iterator
/// is exhausted.
pub struct RecordDecoder<'a> {
    stream: ByteStream<'a>,
    layout: Layout,
    done: bool,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(payload: &'a [u8], layout: Layout) -> Self {
        Self {
            stream: ByteStream::new(payload),
            layout,
            done: false,
        }
    }

    /// Byte offset of the next record in the payload
    pub fn offset(&self) -> usize {
        self.stream.pos
    }

    fn decode_one(&mut self) -> Result<RawRecord> {
        let offset = self.stream.pos;
        let available = self.stream.remaining();
        if available < RECORD_SIZE {
            return Err(MMAError::TruncatedRecord {
                offset,
                available,
                expected: RECORD_SIZE,
            });
        }
        let bytes = self.stream.read_bytes(RECORD_SIZE)?;
        let mut record_stream = ByteStream::new(bytes);

        let prefix = if self.layout.has_sequence_prefix() {
            Some(record_stream.read_u16()?)
        } else {
            None
        };
        let mut fields = Vec::with_capacity(self.layout.field_count());
        for _ in 0..self.layout.field_count() {
            fields.push(record_stream.read_i16()?);
        }
        let seq = match prefix {
            Some(seq) => seq,
            None => fields[0] as u16,
        };

        Ok(RawRecord {
            seq,
            fields,
            checksum: adler2::adler32_slice(bytes),
            unreliable: false,
        })
    }
}

impl Iterator for RecordDecoder<'_> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.stream.remaining() == 0 {
            return None;
        }
        let result = self.decode_one();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Decode a payload eagerly.
///
/// Returns the complete records and, if the payload ends with a partial
/// record, the truncation error alongside them.
pub fn decode_records(payload: &[u8], layout: Layout) -> (Vec<RawRecord>, Option<MMAError>) {
    let mut records = Vec::with_capacity(payload.len() / RECORD_SIZE);
    for item in RecordDecoder::new(payload, layout) {
        match item {
            Ok(record) => records.push(record),
            Err(err) => return (records, Some(err)),
        }
    }
    (records, None)
}
