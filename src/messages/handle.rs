//! Session and operation handles
//!
//! Both are opaque server-issued tokens. The client never interprets the
//! identifier bytes; it only echoes them back on later calls.

use std::fmt;

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{OperationType, ThriftType};
use crate::error::Result;
use crate::protocol::{
    read_field_begin, required, skip, write_binary_field, write_bool_field, write_field_begin,
    write_field_stop, write_i32_field, write_struct_field, ThriftStruct,
};

/// Opaque `{guid, secret}` pair identifying a session or an operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HandleIdentifier {
    /// Server-chosen unique id
    pub guid: Bytes,
    /// Server-chosen secret
    pub secret: Bytes,
}

impl HandleIdentifier {
    /// Create an identifier from raw bytes
    pub fn new(guid: impl Into<Bytes>, secret: impl Into<Bytes>) -> Self {
        Self {
            guid: guid.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Display for HandleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret stays out of logs
        for byte in self.guid.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl ThriftStruct for HandleIdentifier {
    const NAME: &'static str = "THandleIdentifier";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_binary_field(buf, 1, &self.guid)?;
        write_binary_field(buf, 2, &self.secret)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut guid = None;
        let mut secret = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::String) => guid = Some(buf.read_binary()?),
                (2, ThriftType::String) => secret = Some(buf.read_binary()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            guid: required(guid, Self::NAME, "guid")?,
            secret: required(secret, Self::NAME, "secret")?,
        })
    }
}

/// Handle for an open session
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    /// Session identifier
    pub session_id: HandleIdentifier,
}

impl SessionHandle {
    /// Wrap an identifier
    pub fn new(session_id: HandleIdentifier) -> Self {
        Self { session_id }
    }
}

impl ThriftStruct for SessionHandle {
    const NAME: &'static str = "TSessionHandle";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_id)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_id = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_id = Some(HandleIdentifier::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_id: required(session_id, Self::NAME, "sessionId")?,
        })
    }
}

/// Handle for one submitted statement or metadata request
#[derive(Debug, Clone, PartialEq)]
pub struct OperationHandle {
    /// Operation identifier
    pub operation_id: HandleIdentifier,
    /// Kind of operation that produced this handle
    pub operation_type: OperationType,
    /// Whether the operation produced rows that can be fetched
    pub has_result_set: bool,
    /// Rows touched by a DML statement, when the engine reports it
    pub modified_row_count: Option<f64>,
}

impl OperationHandle {
    /// Create an operation handle
    pub fn new(operation_id: HandleIdentifier, operation_type: OperationType, has_result_set: bool) -> Self {
        Self {
            operation_id,
            operation_type,
            has_result_set,
            modified_row_count: None,
        }
    }
}

impl ThriftStruct for OperationHandle {
    const NAME: &'static str = "TOperationHandle";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.operation_id)?;
        write_i32_field(buf, 2, self.operation_type as i32);
        write_bool_field(buf, 3, self.has_result_set);
        if let Some(count) = self.modified_row_count {
            write_field_begin(buf, ThriftType::Double, 4);
            buf.write_f64(count);
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut operation_id = None;
        let mut operation_type = None;
        let mut has_result_set = None;
        let mut modified_row_count = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => operation_id = Some(HandleIdentifier::read(buf)?),
                (2, ThriftType::I32) => {
                    operation_type = Some(OperationType::from_i32(buf.read_i32()?))
                }
                (3, ThriftType::Bool) => has_result_set = Some(buf.read_bool()?),
                (4, ThriftType::Double) => modified_row_count = Some(buf.read_f64()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            operation_id: required(operation_id, Self::NAME, "operationId")?,
            operation_type: required(operation_type, Self::NAME, "operationType")?,
            has_result_set: required(has_result_set, Self::NAME, "hasResultSet")?,
            modified_row_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_display_hides_secret() {
        let id = HandleIdentifier::new(vec![0xde, 0xad], vec![0xbe, 0xef]);
        assert_eq!(id.to_string(), "dead");
    }

    #[test]
    fn test_operation_handle_optional_row_count() {
        let mut handle = OperationHandle::new(
            HandleIdentifier::new(vec![1], vec![2]),
            OperationType::ExecuteStatement,
            false,
        );
        handle.modified_row_count = Some(3.0);

        let mut buf = WriteBuffer::new();
        handle.write(&mut buf).unwrap();
        let parsed = OperationHandle::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, handle);
    }

    #[test]
    fn test_session_handle_requires_id() {
        let mut buf = WriteBuffer::new();
        write_field_stop(&mut buf);
        let err = SessionHandle::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::MissingField {
                field: "sessionId",
                ..
            }
        ));
    }
}
