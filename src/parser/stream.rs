use crate::error::{MMAError, Result};

/// Big-endian reader over a capture image
pub struct ByteStream<'a> {
    data: &'a [u8],
    pub pos: usize,
    end: usize,
    pub eof: bool,
}

impl<'a> ByteStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            eof: data.is_empty(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Take the next `len` bytes, or fail without consuming anything
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            self.eof = true;
            return Err(MMAError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        self.eof = self.pos >= self.end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Everything not read yet
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.end;
        self.eof = true;
        bytes
    }
}
