//! Write buffer for encoding Thrift binary protocol data

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::MAX_LENGTH;
use crate::error::{Error, Result};

/// A buffer for writing Thrift binary protocol data
#[derive(Debug)]
pub struct WriteBuffer {
    /// The underlying byte buffer
    data: BytesMut,
}

impl WriteBuffer {
    /// Create a new WriteBuffer with default capacity
    pub fn new() -> Self {
        Self {
            data: BytesMut::with_capacity(1024),
        }
    }

    /// Create a new WriteBuffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the current length of data in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents as a byte slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable Bytes
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    // =========================================================================
    // Primitive writes
    // =========================================================================

    /// Write a single byte
    pub fn write_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    /// Write a signed byte
    pub fn write_i8(&mut self, value: i8) {
        self.data.put_i8(value);
    }

    /// Write a boolean as a single byte
    pub fn write_bool(&mut self, value: bool) {
        self.data.put_u8(u8::from(value));
    }

    /// Write a 16-bit signed integer
    pub fn write_i16(&mut self, value: i16) {
        self.data.put_i16(value);
    }

    /// Write a 32-bit signed integer
    pub fn write_i32(&mut self, value: i32) {
        self.data.put_i32(value);
    }

    /// Write a 32-bit unsigned integer
    pub fn write_u32(&mut self, value: u32) {
        self.data.put_u32(value);
    }

    /// Write a 64-bit signed integer
    pub fn write_i64(&mut self, value: i64) {
        self.data.put_i64(value);
    }

    /// Write an IEEE 754 double
    pub fn write_f64(&mut self, value: f64) {
        self.data.put_f64(value);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    // =========================================================================
    // Length-prefixed writes
    // =========================================================================

    /// Write an i32 length prefix
    pub fn write_length(&mut self, length: usize) -> Result<()> {
        if length > MAX_LENGTH {
            return Err(Error::InvalidLength(length as i64));
        }
        self.write_i32(length as i32);
        Ok(())
    }

    /// Write binary data prefixed by its i32 length
    pub fn write_binary(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_length(bytes.len())?;
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write a UTF-8 string prefixed by its byte length
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes())
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
