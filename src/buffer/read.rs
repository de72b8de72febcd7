//! Read buffer for decoding Thrift binary protocol data
//!
//! Provides methods for reading the binary protocol primitives from a byte
//! buffer. Running out of data is reported as [`Error::BufferUnderflow`],
//! which the transport uses to detect a partially received message.

use bytes::Bytes;

use crate::constants::MAX_LENGTH;
use crate::error::{Error, Result};

/// A buffer for reading Thrift binary protocol data
#[derive(Debug)]
pub struct ReadBuffer {
    /// The underlying byte data
    data: Bytes,
    /// Current read position
    pos: usize,
}

impl ReadBuffer {
    /// Create a new ReadBuffer from bytes
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a new ReadBuffer from a byte slice
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
            pos: 0,
        }
    }

    /// Get the current position in the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the total length of the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to be read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Get a slice of the remaining bytes (without advancing position)
    #[inline]
    pub fn remaining_bytes(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Check if there are at least `n` bytes remaining
    #[inline]
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Skip `n` bytes in the buffer
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure_remaining(n)?;
        self.pos += n;
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    #[inline]
    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(Error::BufferUnderflow {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_remaining(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    // =========================================================================
    // Raw byte reads
    // =========================================================================

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Read raw bytes and return as a new Bytes (zero-copy slice)
    pub fn read_bytes_owned(&mut self, n: usize) -> Result<Bytes> {
        self.ensure_remaining(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    // =========================================================================
    // Big-endian integer reads (network byte order)
    // =========================================================================

    /// Read a signed byte
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a 16-bit signed integer
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Read a 32-bit signed integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Read a 32-bit unsigned integer
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a 64-bit signed integer
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Read an IEEE 754 double
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.read_array()?)))
    }

    /// Read a boolean (any non-zero byte is true)
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    // =========================================================================
    // Length-prefixed reads
    // =========================================================================

    /// Read an i32 length prefix and validate it
    pub fn read_length(&mut self) -> Result<usize> {
        let length = self.read_i32()?;
        if length < 0 || length as usize > MAX_LENGTH {
            return Err(Error::InvalidLength(length as i64));
        }
        Ok(length as usize)
    }

    /// Read binary data prefixed by its i32 length
    pub fn read_binary(&mut self) -> Result<Bytes> {
        let length = self.read_length()?;
        self.read_bytes_owned(length)
    }

    /// Read a UTF-8 string prefixed by its i32 length
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::DataConversion(format!("invalid UTF-8 string: {}", e)))
    }

    /// Peek at the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.data[self.pos])
    }
}

impl From<Vec<u8>> for ReadBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}

impl From<Bytes> for ReadBuffer {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let mut buf = ReadBuffer::from_slice(&[0x42, 0x43]);
        assert_eq!(buf.read_u8().unwrap(), 0x42);
        assert_eq!(buf.read_u8().unwrap(), 0x43);
        assert!(buf.read_u8().is_err());
    }

    #[test]
    fn test_read_i16() {
        let mut buf = ReadBuffer::from_slice(&[0xff, 0xfe]);
        assert_eq!(buf.read_i16().unwrap(), -2);
    }

    #[test]
    fn test_read_i32() {
        let mut buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(buf.read_i32().unwrap(), 0x01020304);
    }

    #[test]
    fn test_read_i64() {
        let mut buf = ReadBuffer::from_slice(&[0xff; 8]);
        assert_eq!(buf.read_i64().unwrap(), -1);
    }

    #[test]
    fn test_read_f64() {
        let mut buf = ReadBuffer::from_slice(&1.5f64.to_be_bytes());
        assert_eq!(buf.read_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_read_string() {
        let mut buf = ReadBuffer::from_slice(&[0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c']);
        assert_eq!(buf.read_string().unwrap(), "abc");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_read_string_underflow() {
        let mut buf = ReadBuffer::from_slice(&[0x00, 0x00, 0x00, 0x05, b'a']);
        assert!(matches!(
            buf.read_string(),
            Err(Error::BufferUnderflow { needed: 5, available: 1 })
        ));
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut buf = ReadBuffer::from_slice(&[0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(buf.read_binary(), Err(Error::InvalidLength(-1))));
    }

    #[test]
    fn test_skip() {
        let mut buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03, 0x04]);
        buf.skip(2).unwrap();
        assert_eq!(buf.read_u8().unwrap(), 0x03);
    }

    #[test]
    fn test_remaining() {
        let buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03]);
        assert_eq!(buf.remaining(), 3);
        assert!(buf.has_remaining(3));
        assert!(!buf.has_remaining(4));
    }

    #[test]
    fn test_peek() {
        let buf = ReadBuffer::from_slice(&[0x42, 0x43]);
        assert_eq!(buf.peek_u8().unwrap(), 0x42);
        assert_eq!(buf.peek_u8().unwrap(), 0x42); // Still 0x42, not consumed
    }
}
