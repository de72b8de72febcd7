//! Thrift binary protocol encoding/decoding
//!
//! This module implements the subset of the Thrift binary protocol needed to
//! speak TCLIService: message envelopes, struct field headers, containers and
//! skipping of fields this client does not know about.

mod header;

pub use header::MessageHeader;

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{MessageType, ThriftType};
use crate::error::{Error, Result};

/// Maximum struct nesting accepted while skipping unknown fields
const MAX_SKIP_DEPTH: usize = 64;

/// A Thrift struct that can be written to and read from the binary protocol
pub trait ThriftStruct: Sized {
    /// Struct name, used in error messages
    const NAME: &'static str;

    /// Encode the struct (fields followed by STOP)
    fn write(&self, buf: &mut WriteBuffer) -> Result<()>;

    /// Decode the struct, skipping unknown fields
    fn read(buf: &mut ReadBuffer) -> Result<Self>;
}

// =============================================================================
// Field helpers
// =============================================================================

/// Write a field header
pub fn write_field_begin(buf: &mut WriteBuffer, field_type: ThriftType, id: i16) {
    buf.write_u8(field_type as u8);
    buf.write_i16(id);
}

/// Write the STOP marker that ends a struct
pub fn write_field_stop(buf: &mut WriteBuffer) {
    buf.write_u8(ThriftType::Stop as u8);
}

/// Read a field header, returning `None` at the STOP marker
pub fn read_field_begin(buf: &mut ReadBuffer) -> Result<Option<(ThriftType, i16)>> {
    let field_type = ThriftType::try_from(buf.read_u8()?)?;
    if field_type == ThriftType::Stop {
        return Ok(None);
    }
    let id = buf.read_i16()?;
    Ok(Some((field_type, id)))
}

/// Write a string field
pub fn write_string_field(buf: &mut WriteBuffer, id: i16, value: &str) -> Result<()> {
    write_field_begin(buf, ThriftType::String, id);
    buf.write_string(value)
}

/// Write a binary field
pub fn write_binary_field(buf: &mut WriteBuffer, id: i16, value: &[u8]) -> Result<()> {
    write_field_begin(buf, ThriftType::String, id);
    buf.write_binary(value)
}

/// Write an i32 field
pub fn write_i32_field(buf: &mut WriteBuffer, id: i16, value: i32) {
    write_field_begin(buf, ThriftType::I32, id);
    buf.write_i32(value);
}

/// Write an i64 field
pub fn write_i64_field(buf: &mut WriteBuffer, id: i16, value: i64) {
    write_field_begin(buf, ThriftType::I64, id);
    buf.write_i64(value);
}

/// Write a bool field
pub fn write_bool_field(buf: &mut WriteBuffer, id: i16, value: bool) {
    write_field_begin(buf, ThriftType::Bool, id);
    buf.write_bool(value);
}

/// Write a nested struct field
pub fn write_struct_field<T: ThriftStruct>(buf: &mut WriteBuffer, id: i16, value: &T) -> Result<()> {
    write_field_begin(buf, ThriftType::Struct, id);
    value.write(buf)
}

/// Write a `list<string>` field
pub fn write_string_list_field(buf: &mut WriteBuffer, id: i16, values: &[String]) -> Result<()> {
    write_field_begin(buf, ThriftType::List, id);
    write_list_begin(buf, ThriftType::String, values.len())?;
    for value in values {
        buf.write_string(value)?;
    }
    Ok(())
}

/// Write a `map<string, string>` field
pub fn write_string_map_field(
    buf: &mut WriteBuffer,
    id: i16,
    entries: &[(String, String)],
) -> Result<()> {
    write_field_begin(buf, ThriftType::Map, id);
    buf.write_u8(ThriftType::String as u8);
    buf.write_u8(ThriftType::String as u8);
    buf.write_length(entries.len())?;
    for (key, value) in entries {
        buf.write_string(key)?;
        buf.write_string(value)?;
    }
    Ok(())
}

// =============================================================================
// Container helpers
// =============================================================================

/// Write a list/set header
pub fn write_list_begin(buf: &mut WriteBuffer, element_type: ThriftType, size: usize) -> Result<()> {
    buf.write_u8(element_type as u8);
    buf.write_length(size)
}

/// Read a list/set header
pub fn read_list_begin(buf: &mut ReadBuffer) -> Result<(ThriftType, usize)> {
    let element_type = ThriftType::try_from(buf.read_u8()?)?;
    let size = buf.read_length()?;
    Ok((element_type, size))
}

/// Read a list whose elements must be of `expected` type
pub fn read_list<T>(
    buf: &mut ReadBuffer,
    expected: ThriftType,
    mut read_element: impl FnMut(&mut ReadBuffer) -> Result<T>,
) -> Result<Vec<T>> {
    let (element_type, size) = read_list_begin(buf)?;
    if size > 0 && element_type != expected {
        return Err(Error::protocol(format!(
            "list element type {:?}, expected {:?}",
            element_type, expected
        )));
    }
    // Cap the pre-allocation; the length prefix is untrusted
    let mut out = Vec::with_capacity(size.min(buf.remaining()));
    for _ in 0..size {
        out.push(read_element(buf)?);
    }
    Ok(out)
}

/// Read a `map<string, string>`
pub fn read_string_map(buf: &mut ReadBuffer) -> Result<Vec<(String, String)>> {
    let key_type = ThriftType::try_from(buf.read_u8()?)?;
    let value_type = ThriftType::try_from(buf.read_u8()?)?;
    let size = buf.read_length()?;
    if size > 0 && (key_type != ThriftType::String || value_type != ThriftType::String) {
        return Err(Error::protocol(format!(
            "map<{:?}, {:?}>, expected map<string, string>",
            key_type, value_type
        )));
    }
    let mut out = Vec::with_capacity(size.min(buf.remaining()));
    for _ in 0..size {
        let key = buf.read_string()?;
        let value = buf.read_string()?;
        out.push((key, value));
    }
    Ok(out)
}

/// Skip a value of the given type
pub fn skip(buf: &mut ReadBuffer, field_type: ThriftType) -> Result<()> {
    skip_depth(buf, field_type, 0)
}

fn skip_depth(buf: &mut ReadBuffer, field_type: ThriftType, depth: usize) -> Result<()> {
    if depth > MAX_SKIP_DEPTH {
        return Err(Error::protocol("struct nesting too deep"));
    }

    match field_type {
        ThriftType::Stop | ThriftType::Void => Ok(()),
        ThriftType::Bool | ThriftType::Byte => buf.skip(1),
        ThriftType::I16 => buf.skip(2),
        ThriftType::I32 => buf.skip(4),
        ThriftType::Double | ThriftType::I64 => buf.skip(8),
        ThriftType::String => {
            let length = buf.read_length()?;
            buf.skip(length)
        }
        ThriftType::Struct => {
            while let Some((nested, _)) = read_field_begin(buf)? {
                skip_depth(buf, nested, depth + 1)?;
            }
            Ok(())
        }
        ThriftType::Map => {
            let key_type = ThriftType::try_from(buf.read_u8()?)?;
            let value_type = ThriftType::try_from(buf.read_u8()?)?;
            let size = buf.read_length()?;
            for _ in 0..size {
                skip_depth(buf, key_type, depth + 1)?;
                skip_depth(buf, value_type, depth + 1)?;
            }
            Ok(())
        }
        ThriftType::Set | ThriftType::List => {
            let (element_type, size) = read_list_begin(buf)?;
            for _ in 0..size {
                skip_depth(buf, element_type, depth + 1)?;
            }
            Ok(())
        }
    }
}

/// Unwrap a required field decoded as `Option`
pub fn required<T>(value: Option<T>, name: &'static str, field: &'static str) -> Result<T> {
    value.ok_or(Error::MissingField { name, field })
}

// =============================================================================
// Message envelopes
// =============================================================================

/// Exception payload sent in place of a reply when the server cannot process a call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationException {
    /// Human readable message
    pub message: String,
    /// Exception kind (unknown method, bad sequence id, internal error, ...)
    pub kind: i32,
}

impl ThriftStruct for ApplicationException {
    const NAME: &'static str = "TApplicationException";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_string_field(buf, 1, &self.message)?;
        write_i32_field(buf, 2, self.kind);
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut out = Self::default();
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::String) => out.message = buf.read_string()?,
                (2, ThriftType::I32) => out.kind = buf.read_i32()?,
                _ => skip(buf, field_type)?,
            }
        }
        Ok(out)
    }
}

impl From<ApplicationException> for Error {
    fn from(exception: ApplicationException) -> Self {
        Error::Application {
            kind: exception.kind,
            message: exception.message,
        }
    }
}

/// Encode a CALL message whose args struct carries `request` as field 1
pub fn encode_call<T: ThriftStruct>(method: &str, seq_id: i32, request: &T) -> Result<Bytes> {
    let mut buf = WriteBuffer::new();
    MessageHeader::call(method, seq_id).write(&mut buf)?;
    write_struct_field(&mut buf, 1, request)?;
    write_field_stop(&mut buf);
    Ok(buf.freeze())
}

/// Encode a REPLY message whose result struct carries `response` as field 0
pub fn encode_reply<T: ThriftStruct>(method: &str, seq_id: i32, response: &T) -> Result<Bytes> {
    let mut buf = WriteBuffer::new();
    MessageHeader::new(method, MessageType::Reply, seq_id).write(&mut buf)?;
    write_struct_field(&mut buf, 0, response)?;
    write_field_stop(&mut buf);
    Ok(buf.freeze())
}

/// Encode an EXCEPTION message
pub fn encode_exception(method: &str, seq_id: i32, exception: &ApplicationException) -> Result<Bytes> {
    let mut buf = WriteBuffer::new();
    MessageHeader::new(method, MessageType::Exception, seq_id).write(&mut buf)?;
    exception.write(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode the reply to `method`/`seq_id` from a complete message
///
/// Fails with [`Error::BufferUnderflow`] when `buf` holds only part of the
/// message, so a buffered transport can read more and retry.
pub fn decode_reply<T: ThriftStruct>(buf: &mut ReadBuffer, method: &str, seq_id: i32) -> Result<T> {
    let header = MessageHeader::read(buf)?;

    match header.message_type {
        MessageType::Reply => {}
        MessageType::Exception => {
            let exception = ApplicationException::read(buf)?;
            return Err(exception.into());
        }
        other => {
            return Err(Error::protocol(format!(
                "expected reply to {}, got {:?}",
                method, other
            )));
        }
    }

    if header.name != method {
        return Err(Error::protocol(format!(
            "reply for {} while waiting for {}",
            header.name, method
        )));
    }
    if header.seq_id != seq_id {
        return Err(Error::protocol(format!(
            "reply sequence id {} does not match call {}",
            header.seq_id, seq_id
        )));
    }

    let mut success = None;
    while let Some((field_type, id)) = read_field_begin(buf)? {
        match (id, field_type) {
            (0, ThriftType::Struct) => success = Some(T::read(buf)?),
            _ => skip(buf, field_type)?,
        }
    }
    required(success, T::NAME, "success")
}

/// Decode a CALL message, returning its header and the request from field 1
///
/// Used on the answering side of the protocol (stub servers in tests).
pub fn decode_call<T: ThriftStruct>(buf: &mut ReadBuffer) -> Result<(MessageHeader, T)> {
    let header = MessageHeader::read(buf)?;
    if header.message_type != MessageType::Call {
        return Err(Error::protocol(format!(
            "expected call, got {:?}",
            header.message_type
        )));
    }

    let mut request = None;
    while let Some((field_type, id)) = read_field_begin(buf)? {
        match (id, field_type) {
            (1, ThriftType::Struct) => request = Some(T::read(buf)?),
            _ => skip(buf, field_type)?,
        }
    }
    Ok((header, required(request, T::NAME, "request")?))
}
