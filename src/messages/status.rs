//! Response status (`TStatus`)

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{StatusCode, ThriftType};
use crate::error::{Error, Result};
use crate::protocol::{
    read_field_begin, read_list, required, skip, write_i32_field, write_field_stop,
    write_string_field, write_string_list_field, ThriftStruct,
};

/// Status carried by every TCLIService response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Raw status code (see [`StatusCode`])
    pub status_code: i32,
    /// Informational messages (server-side stack trace on errors)
    pub info_messages: Vec<String>,
    /// SQL state, if any
    pub sql_state: Option<String>,
    /// Engine-specific error code
    pub error_code: Option<i32>,
    /// Error message
    pub error_message: Option<String>,
}

impl Status {
    /// A plain SUCCESS status
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::Success as i32,
            info_messages: Vec::new(),
            sql_state: None,
            error_code: None,
            error_message: None,
        }
    }

    /// An ERROR status with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Error as i32,
            error_message: Some(message.into()),
            ..Self::success()
        }
    }

    /// Decoded status code, if known
    pub fn code(&self) -> Option<StatusCode> {
        StatusCode::from_i32(self.status_code)
    }

    /// Whether the status reports a failed request
    ///
    /// Unknown codes are treated as failures.
    pub fn is_failure(&self) -> bool {
        self.code().map(|code| code.is_failure()).unwrap_or(true)
    }

    /// Turn a failure status into [`Error::Server`]
    pub fn check(&self) -> Result<()> {
        if !self.is_failure() {
            return Ok(());
        }

        let message = self
            .error_message
            .clone()
            .or_else(|| self.info_messages.first().cloned())
            .unwrap_or_else(|| "request failed without an error message".to_string());

        Err(Error::Server {
            code: self.status_code,
            message,
            sql_state: self.sql_state.clone(),
            error_code: self.error_code,
        })
    }
}

impl ThriftStruct for Status {
    const NAME: &'static str = "TStatus";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_i32_field(buf, 1, self.status_code);
        if !self.info_messages.is_empty() {
            write_string_list_field(buf, 2, &self.info_messages)?;
        }
        if let Some(sql_state) = &self.sql_state {
            write_string_field(buf, 3, sql_state)?;
        }
        if let Some(error_code) = self.error_code {
            write_i32_field(buf, 4, error_code);
        }
        if let Some(message) = &self.error_message {
            write_string_field(buf, 5, message)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status_code = None;
        let mut info_messages = Vec::new();
        let mut sql_state = None;
        let mut error_code = None;
        let mut error_message = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::I32) => status_code = Some(buf.read_i32()?),
                (2, ThriftType::List) => {
                    info_messages = read_list(buf, ThriftType::String, |b| b.read_string())?
                }
                (3, ThriftType::String) => sql_state = Some(buf.read_string()?),
                (4, ThriftType::I32) => error_code = Some(buf.read_i32()?),
                (5, ThriftType::String) => error_message = Some(buf.read_string()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status_code: required(status_code, Self::NAME, "statusCode")?,
            info_messages,
            sql_state,
            error_code,
            error_message,
        })
    }
}
