//! ExecuteStatement / CloseOperation messages

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::ThriftType;
use crate::error::Result;
use crate::protocol::{
    read_field_begin, read_string_map, required, skip, write_bool_field, write_field_stop,
    write_i64_field, write_string_field, write_string_map_field, write_struct_field, ThriftStruct,
};

use super::{OperationReq, OperationResp, SessionHandle, StatusResp};

/// Request to run one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteStatementReq {
    /// Owning session
    pub session_handle: SessionHandle,
    /// Statement text
    pub statement: String,
    /// Per-statement configuration overrides
    pub conf_overlay: Vec<(String, String)>,
    /// Return before the statement finishes
    pub run_async: bool,
    /// Server-side timeout in seconds (0 = none)
    pub query_timeout: i64,
}

impl ExecuteStatementReq {
    /// Synchronous execution with no overrides
    pub fn new(session_handle: SessionHandle, statement: impl Into<String>) -> Self {
        Self {
            session_handle,
            statement: statement.into(),
            conf_overlay: Vec::new(),
            run_async: false,
            query_timeout: 0,
        }
    }
}

impl ThriftStruct for ExecuteStatementReq {
    const NAME: &'static str = "TExecuteStatementReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_handle)?;
        write_string_field(buf, 2, &self.statement)?;
        if !self.conf_overlay.is_empty() {
            write_string_map_field(buf, 3, &self.conf_overlay)?;
        }
        write_bool_field(buf, 4, self.run_async);
        if self.query_timeout != 0 {
            write_i64_field(buf, 5, self.query_timeout);
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_handle = None;
        let mut statement = None;
        let mut conf_overlay = Vec::new();
        let mut run_async = false;
        let mut query_timeout = 0;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                (2, ThriftType::String) => statement = Some(buf.read_string()?),
                (3, ThriftType::Map) => conf_overlay = read_string_map(buf)?,
                (4, ThriftType::Bool) => run_async = buf.read_bool()?,
                (5, ThriftType::I64) => query_timeout = buf.read_i64()?,
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, Self::NAME, "sessionHandle")?,
            statement: required(statement, Self::NAME, "statement")?,
            conf_overlay,
            run_async,
            query_timeout,
        })
    }
}

/// Response to [`ExecuteStatementReq`]
pub type ExecuteStatementResp = OperationResp;

/// Request releasing an operation's server-side resources
pub type CloseOperationReq = OperationReq;

/// Response to [`CloseOperationReq`]
pub type CloseOperationResp = StatusResp;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::OperationType;
    use crate::messages::{HandleIdentifier, OperationHandle};

    #[test]
    fn test_execute_statement_roundtrip() {
        let mut req = ExecuteStatementReq::new(SessionHandle::default(), "SELECT 1");
        req.conf_overlay.push(("hive.exec.parallel".into(), "true".into()));
        let mut buf = WriteBuffer::new();
        req.write(&mut buf).unwrap();
        let parsed = ExecuteStatementReq::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, req);
        assert!(!parsed.run_async);
    }

    #[test]
    fn test_execute_statement_resp_without_handle() {
        let resp = ExecuteStatementResp {
            status: crate::messages::Status::error("ParseException line 1:0"),
            operation_handle: None,
        };
        let mut buf = WriteBuffer::new();
        resp.write(&mut buf).unwrap();
        let parsed = ExecuteStatementResp::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert!(parsed.operation_handle.is_none());
        assert!(parsed.status.check().is_err());
    }

    #[test]
    fn test_close_operation_req() {
        let handle = OperationHandle::new(
            HandleIdentifier::new(vec![9u8; 16], vec![0u8; 16]),
            OperationType::ExecuteStatement,
            true,
        );
        let req = CloseOperationReq {
            operation_handle: handle,
        };
        let mut buf = WriteBuffer::new();
        req.write(&mut buf).unwrap();
        let parsed = CloseOperationReq::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, req);
    }
}
