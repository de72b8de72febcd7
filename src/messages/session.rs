//! OpenSession / CloseSession messages

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{ProtocolVersion, ThriftType, CLIENT_PROTOCOL};
use crate::error::Result;
use crate::protocol::{
    read_field_begin, read_string_map, required, skip, write_field_stop, write_i32_field,
    write_string_field, write_string_map_field, write_struct_field, ThriftStruct,
};

use super::{SessionHandle, Status};

/// Request to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionReq {
    /// Protocol version the client speaks
    pub client_protocol: i32,
    /// Session user
    pub username: Option<String>,
    /// Session password
    pub password: Option<String>,
    /// Session-level configuration overrides
    pub configuration: Vec<(String, String)>,
}

impl OpenSessionReq {
    /// Create a request for the client's fixed protocol version
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client_protocol: CLIENT_PROTOCOL as i32,
            username: Some(username.into()),
            password: Some(password.into()),
            configuration: Vec::new(),
        }
    }
}

impl ThriftStruct for OpenSessionReq {
    const NAME: &'static str = "TOpenSessionReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_i32_field(buf, 1, self.client_protocol);
        if let Some(username) = &self.username {
            write_string_field(buf, 2, username)?;
        }
        if let Some(password) = &self.password {
            write_string_field(buf, 3, password)?;
        }
        if !self.configuration.is_empty() {
            write_string_map_field(buf, 4, &self.configuration)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut client_protocol = None;
        let mut username = None;
        let mut password = None;
        let mut configuration = Vec::new();
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::I32) => client_protocol = Some(buf.read_i32()?),
                (2, ThriftType::String) => username = Some(buf.read_string()?),
                (3, ThriftType::String) => password = Some(buf.read_string()?),
                (4, ThriftType::Map) => configuration = read_string_map(buf)?,
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            client_protocol: required(client_protocol, Self::NAME, "client_protocol")?,
            username,
            password,
            configuration,
        })
    }
}

/// Response to [`OpenSessionReq`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionResp {
    /// Request status
    pub status: Status,
    /// Protocol version the server settled on
    pub server_protocol_version: i32,
    /// Handle of the new session (absent on failure)
    pub session_handle: Option<SessionHandle>,
    /// Effective session configuration
    pub configuration: Vec<(String, String)>,
}

impl OpenSessionResp {
    /// Successful response carrying `handle`
    pub fn success(handle: SessionHandle) -> Self {
        Self {
            status: Status::success(),
            server_protocol_version: CLIENT_PROTOCOL as i32,
            session_handle: Some(handle),
            configuration: Vec::new(),
        }
    }
}

impl ThriftStruct for OpenSessionResp {
    const NAME: &'static str = "TOpenSessionResp";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.status)?;
        write_i32_field(buf, 2, self.server_protocol_version);
        if let Some(handle) = &self.session_handle {
            write_struct_field(buf, 3, handle)?;
        }
        if !self.configuration.is_empty() {
            write_string_map_field(buf, 4, &self.configuration)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status = None;
        let mut server_protocol_version = None;
        let mut session_handle = None;
        let mut configuration = Vec::new();
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => status = Some(Status::read(buf)?),
                (2, ThriftType::I32) => server_protocol_version = Some(buf.read_i32()?),
                (3, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                (4, ThriftType::Map) => configuration = read_string_map(buf)?,
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status: required(status, Self::NAME, "status")?,
            // Failed responses from some servers omit the version
            server_protocol_version: server_protocol_version.unwrap_or(ProtocolVersion::V1 as i32),
            session_handle,
            configuration,
        })
    }
}

/// Request to close a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSessionReq {
    /// Session to close
    pub session_handle: SessionHandle,
}

impl ThriftStruct for CloseSessionReq {
    const NAME: &'static str = "TCloseSessionReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_handle)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_handle = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, Self::NAME, "sessionHandle")?,
        })
    }
}

/// Response carrying only a status (CloseSession, CloseOperation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResp {
    /// Request status
    pub status: Status,
}

impl StatusResp {
    /// Successful response
    pub fn success() -> Self {
        Self {
            status: Status::success(),
        }
    }
}

impl ThriftStruct for StatusResp {
    const NAME: &'static str = "TStatusResp";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.status)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => status = Some(Status::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status: required(status, Self::NAME, "status")?,
        })
    }
}

/// Response to [`CloseSessionReq`]
pub type CloseSessionResp = StatusResp;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::HandleIdentifier;

    #[test]
    fn test_open_session_req_uses_v7() {
        let req = OpenSessionReq::new("anonymous", "");
        assert_eq!(req.client_protocol, 6);

        let mut buf = WriteBuffer::new();
        req.write(&mut buf).unwrap();
        // First field: i32 id 1 carrying the protocol version
        assert_eq!(&buf.as_slice()[..7], &[0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x06]);
    }

    #[test]
    fn test_open_session_resp_roundtrip() {
        let resp = OpenSessionResp {
            configuration: vec![("use:database".into(), "default".into())],
            ..OpenSessionResp::success(SessionHandle::new(HandleIdentifier::new(
                vec![1u8; 16],
                vec![2u8; 16],
            )))
        };
        let mut buf = WriteBuffer::new();
        resp.write(&mut buf).unwrap();
        let parsed = OpenSessionResp::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_failed_open_session_without_handle() {
        let resp = OpenSessionResp {
            status: Status::error("Peer indicated failure: Error validating the login"),
            server_protocol_version: 6,
            session_handle: None,
            configuration: Vec::new(),
        };
        let mut buf = WriteBuffer::new();
        resp.write(&mut buf).unwrap();
        let parsed = OpenSessionResp::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert!(parsed.session_handle.is_none());
        assert!(parsed.status.check().is_err());
    }
}
