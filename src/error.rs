//! Error types for the Hive client
//!
//! This module defines all error types that can occur while talking to a
//! HiveServer2 engine, from low-level Thrift codec errors up to engine-reported
//! statement failures and result decoding errors.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Hive client
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// General protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unknown Thrift field type code
    #[error("invalid Thrift field type: {0}")]
    InvalidFieldType(u8),

    /// Unknown SASL negotiation status byte
    #[error("invalid SASL negotiation status: {0:#04x}")]
    InvalidSaslStatus(u8),

    /// Required struct field missing from a decoded message
    #[error("missing required field {field} in {name}")]
    MissingField {
        name: &'static str,
        field: &'static str,
    },

    /// Server answered a call with a TApplicationException
    #[error("Thrift application exception ({kind}): {message}")]
    Application { kind: i32, message: String },

    // =========================================================================
    // Buffer Errors
    // =========================================================================
    /// Buffer underflow - not enough data to read
    #[error("buffer underflow: need {needed} bytes but only {available} available")]
    BufferUnderflow { needed: usize, available: usize },

    /// Negative or oversized length prefix
    #[error("invalid length prefix: {0}")]
    InvalidLength(i64),

    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// Connection closed unexpectedly
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// Connection timeout
    #[error("connection timeout after {0:?}")]
    ConnectionTimeout(std::time::Duration),

    /// Operation needs an open session
    #[error("no open session")]
    NotConnected,

    /// Connect called while a session is open or opening
    #[error("session already open or opening")]
    AlreadyConnected,

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// SASL negotiation rejected by the peer
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// Engine returned an error status for a request
    #[error("server error ({code}){}: {message}",
        sql_state.as_ref().map(|s| format!(" [SQLSTATE {}]", s)).unwrap_or_default())]
    Server {
        code: i32,
        message: String,
        sql_state: Option<String>,
        error_code: Option<i32>,
    },

    /// Statement produced no result set where one was required
    #[error("statement returned no result set")]
    NoResultSet,

    /// A single-value result did not fit in one page
    #[error("result truncated after {rows} rows")]
    TruncatedResult { rows: usize },

    // =========================================================================
    // Decode Errors
    // =========================================================================
    /// Column type id has no value field mapping
    #[error("unsupported column type {type_id} for column {column}")]
    UnsupportedColumnType { column: String, type_id: i32 },

    /// Requested column does not exist in the result metadata
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Column filter matched no metadata column
    #[error("column filter matched no columns: {0:?}")]
    EmptyProjection(Vec<String>),

    /// Column values arrived in a different variant than the metadata implies
    #[error("column {column}: expected {expected} values, got {actual}")]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Data conversion error
    #[error("data conversion error: {0}")]
    DataConversion(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Identifier cannot be used in generated SQL
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed | Error::ConnectionTimeout(_) | Error::Io(_)
        )
    }

    /// Check if the transport can no longer be trusted after this error
    ///
    /// Raised mid-RPC, these leave the byte stream in an unknown position, so
    /// the session built on it is abandoned.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::ConnectionClosed
                | Error::ConnectionTimeout(_)
                | Error::Protocol(_)
                | Error::BufferUnderflow { .. }
                | Error::InvalidLength(_)
                | Error::InvalidFieldType(_)
                | Error::InvalidSaslStatus(_)
                | Error::DataConversion(_)
        )
    }

    /// Check if the engine or the SASL peer rejected the credentials
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::AuthenticationFailed(_))
    }

    /// Check if this error was reported by the engine in a response status
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. } | Error::Application { .. })
    }

    /// Check if this error came from turning a row set into a table
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedColumnType { .. }
                | Error::ColumnNotFound(_)
                | Error::EmptyProjection(_)
                | Error::ColumnTypeMismatch { .. }
                | Error::DataConversion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::Server {
            code: 3,
            message: "Table not found 'nope'".to_string(),
            sql_state: Some("42S02".to_string()),
            error_code: Some(10001),
        };
        assert_eq!(
            err.to_string(),
            "server error (3) [SQLSTATE 42S02]: Table not found 'nope'"
        );
    }

    #[test]
    fn test_server_error_display_without_state() {
        let err = Error::Server {
            code: 4,
            message: "Invalid SessionHandle".to_string(),
            sql_state: None,
            error_code: None,
        };
        assert_eq!(err.to_string(), "server error (4): Invalid SessionHandle");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "x")).is_connection_error());
        assert!(!Error::NotConnected.is_connection_error());
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::protocol("sequence id mismatch").is_fatal());
        assert!(Error::InvalidLength(-1).is_fatal());
        assert!(Error::BufferUnderflow {
            needed: 4,
            available: 1
        }
        .is_fatal());
        // Complete replies the engine chose to reject leave the stream usable
        assert!(!Error::Application {
            kind: 1,
            message: "unknown method".into()
        }
        .is_fatal());
        assert!(!Error::MissingField {
            name: "TOperationResp",
            field: "operationHandle"
        }
        .is_fatal());
        assert!(!Error::Server {
            code: 3,
            message: "bad".into(),
            sql_state: None,
            error_code: None
        }
        .is_fatal());
        assert!(!Error::NotConnected.is_fatal());
    }

    #[test]
    fn test_classifiers() {
        assert!(Error::AuthenticationFailed("bad".into()).is_auth_error());
        assert!(Error::ColumnNotFound("a".into()).is_decode_error());
        assert!(Error::EmptyProjection(vec!["x".into()]).is_decode_error());
        assert!(!Error::NoResultSet.is_decode_error());
        assert!(Error::Application {
            kind: 1,
            message: "unknown method".into()
        }
        .is_server_error());
    }
}
