//! Protocol constants
//!
//! Thrift binary protocol codes, the SASL negotiation status bytes and the
//! TCLIService enums used by HiveServer2.

use crate::error::Error;

// =============================================================================
// Thrift Binary Protocol
// =============================================================================

/// Strict binary protocol version marker (upper 16 bits of the message header)
pub const BINARY_VERSION_1: u32 = 0x8001_0000;

/// Mask selecting the version bits of the message header
pub const BINARY_VERSION_MASK: u32 = 0xffff_0000;

/// Mask selecting the message type bits of the message header
pub const BINARY_TYPE_MASK: u32 = 0x0000_00ff;

/// Upper bound accepted for a single length prefix (strings, lists, frames)
pub const MAX_LENGTH: usize = 256 * 1024 * 1024;

/// Thrift field/element type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ThriftType {
    /// End of struct marker
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    /// Strings and binary share this code
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl TryFrom<u8> for ThriftType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ThriftType::Stop),
            1 => Ok(ThriftType::Void),
            2 => Ok(ThriftType::Bool),
            3 => Ok(ThriftType::Byte),
            4 => Ok(ThriftType::Double),
            6 => Ok(ThriftType::I16),
            8 => Ok(ThriftType::I32),
            10 => Ok(ThriftType::I64),
            11 => Ok(ThriftType::String),
            12 => Ok(ThriftType::Struct),
            13 => Ok(ThriftType::Map),
            14 => Ok(ThriftType::Set),
            15 => Ok(ThriftType::List),
            _ => Err(Error::InvalidFieldType(value)),
        }
    }
}

/// Thrift message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            _ => Err(Error::protocol(format!("invalid message type: {}", value))),
        }
    }
}

// =============================================================================
// SASL Negotiation
// =============================================================================

/// Size of the SASL status byte
pub const SASL_STATUS_BYTES: usize = 1;

/// Size of the SASL payload length prefix
pub const SASL_PAYLOAD_LENGTH_BYTES: usize = 4;

/// Total SASL message header size
pub const SASL_HEADER_SIZE: usize = SASL_STATUS_BYTES + SASL_PAYLOAD_LENGTH_BYTES;

/// Mechanism name sent in the START message
pub const SASL_MECHANISM_PLAIN: &str = "PLAIN";

/// Thrift SASL negotiation status (first byte of each handshake message)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum SaslStatus {
    Start = 0x01,
    Ok = 0x02,
    Bad = 0x03,
    Error = 0x04,
    Complete = 0x05,
}

impl TryFrom<u8> for SaslStatus {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0x01 => Ok(SaslStatus::Start),
            0x02 => Ok(SaslStatus::Ok),
            0x03 => Ok(SaslStatus::Bad),
            0x04 => Ok(SaslStatus::Error),
            0x05 => Ok(SaslStatus::Complete),
            _ => Err(Error::InvalidSaslStatus(value)),
        }
    }
}

// =============================================================================
// TCLIService Enums
// =============================================================================

/// `TIMESTAMP WITH LOCAL TIME ZONE`, sent by newer servers and not decodable
pub const TIMESTAMP_LOCAL_TZ_TYPE_ID: i32 = 22;

/// Primitive column type ids (`TTypeId`)
///
/// Only ids with a value field mapping are listed. Wire id 22
/// ([`TIMESTAMP_LOCAL_TZ_TYPE_ID`]) and anything newer stay raw `i32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum TypeId {
    Boolean = 0,
    TinyInt = 1,
    SmallInt = 2,
    Int = 3,
    BigInt = 4,
    Float = 5,
    Double = 6,
    String = 7,
    Timestamp = 8,
    Binary = 9,
    Array = 10,
    Map = 11,
    Struct = 12,
    Union = 13,
    UserDefined = 14,
    Decimal = 15,
    Null = 16,
    Date = 17,
    Varchar = 18,
    Char = 19,
    IntervalYearMonth = 20,
    IntervalDayTime = 21,
}

impl TypeId {
    /// Every type id defined by the protocol, in wire order
    pub const ALL: [TypeId; 22] = [
        TypeId::Boolean,
        TypeId::TinyInt,
        TypeId::SmallInt,
        TypeId::Int,
        TypeId::BigInt,
        TypeId::Float,
        TypeId::Double,
        TypeId::String,
        TypeId::Timestamp,
        TypeId::Binary,
        TypeId::Array,
        TypeId::Map,
        TypeId::Struct,
        TypeId::Union,
        TypeId::UserDefined,
        TypeId::Decimal,
        TypeId::Null,
        TypeId::Date,
        TypeId::Varchar,
        TypeId::Char,
        TypeId::IntervalYearMonth,
        TypeId::IntervalDayTime,
    ];

    /// Look up a type id by its wire value
    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Engine-side type name
    pub fn name(&self) -> &'static str {
        match self {
            TypeId::Boolean => "BOOLEAN",
            TypeId::TinyInt => "TINYINT",
            TypeId::SmallInt => "SMALLINT",
            TypeId::Int => "INT",
            TypeId::BigInt => "BIGINT",
            TypeId::Float => "FLOAT",
            TypeId::Double => "DOUBLE",
            TypeId::String => "STRING",
            TypeId::Timestamp => "TIMESTAMP",
            TypeId::Binary => "BINARY",
            TypeId::Array => "ARRAY",
            TypeId::Map => "MAP",
            TypeId::Struct => "STRUCT",
            TypeId::Union => "UNIONTYPE",
            TypeId::UserDefined => "USER_DEFINED",
            TypeId::Decimal => "DECIMAL",
            TypeId::Null => "NULL",
            TypeId::Date => "DATE",
            TypeId::Varchar => "VARCHAR",
            TypeId::Char => "CHAR",
            TypeId::IntervalYearMonth => "INTERVAL_YEAR_MONTH",
            TypeId::IntervalDayTime => "INTERVAL_DAY_TIME",
        }
    }
}

/// Response status codes (`TStatusCode`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum StatusCode {
    Success = 0,
    SuccessWithInfo = 1,
    StillExecuting = 2,
    Error = 3,
    InvalidHandle = 4,
}

impl StatusCode {
    /// Look up a status code by its wire value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(StatusCode::Success),
            1 => Some(StatusCode::SuccessWithInfo),
            2 => Some(StatusCode::StillExecuting),
            3 => Some(StatusCode::Error),
            4 => Some(StatusCode::InvalidHandle),
            _ => None,
        }
    }

    /// Whether this code reports a failed request
    pub fn is_failure(&self) -> bool {
        matches!(self, StatusCode::Error | StatusCode::InvalidHandle)
    }
}

/// Client protocol versions (`TProtocolVersion`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum ProtocolVersion {
    V1 = 0,
    V2 = 1,
    V3 = 2,
    V4 = 3,
    V5 = 4,
    V6 = 5,
    V7 = 6,
    V8 = 7,
    V9 = 8,
    V10 = 9,
}

/// The single protocol version this client negotiates
pub const CLIENT_PROTOCOL: ProtocolVersion = ProtocolVersion::V7;

/// Operation types (`TOperationType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum OperationType {
    ExecuteStatement = 0,
    GetTypeInfo = 1,
    GetCatalogs = 2,
    GetSchemas = 3,
    GetTables = 4,
    GetTableTypes = 5,
    GetColumns = 6,
    GetFunctions = 7,
    Unknown = 8,
}

impl OperationType {
    /// Look up an operation type by its wire value; unknown values map to `Unknown`
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => OperationType::ExecuteStatement,
            1 => OperationType::GetTypeInfo,
            2 => OperationType::GetCatalogs,
            3 => OperationType::GetSchemas,
            4 => OperationType::GetTables,
            5 => OperationType::GetTableTypes,
            6 => OperationType::GetColumns,
            7 => OperationType::GetFunctions,
            _ => OperationType::Unknown,
        }
    }
}

/// Fetch orientation (`TFetchOrientation`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum FetchOrientation {
    #[default]
    Next = 0,
    Prior = 1,
    Relative = 2,
    Absolute = 3,
    First = 4,
    Last = 5,
}

// =============================================================================
// Metadata Column Names
// =============================================================================

/// Column names returned by the metadata operations
#[allow(missing_docs)]
pub mod metadata_column {
    pub const TABLE_SCHEM: &str = "TABLE_SCHEM";
    pub const TABLE_NAME: &str = "TABLE_NAME";
    pub const COLUMN_NAME: &str = "COLUMN_NAME";
    pub const TYPE_NAME: &str = "TYPE_NAME";
    pub const IS_NULLABLE: &str = "IS_NULLABLE";

    /// Text column produced by `SHOW CREATE TABLE`
    pub const CREATE_TABLE_STATEMENT: &str = "createtab_stmt";

    /// Subset of GetColumns output kept by column listings
    pub const COLUMN_LISTING: [&str; 5] =
        [TABLE_SCHEM, TABLE_NAME, COLUMN_NAME, TYPE_NAME, IS_NULLABLE];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sasl_status_roundtrip() {
        for byte in 1u8..=5 {
            let status = SaslStatus::try_from(byte).unwrap();
            assert_eq!(status as u8, byte);
        }
        assert!(matches!(
            SaslStatus::try_from(0x06),
            Err(Error::InvalidSaslStatus(0x06))
        ));
    }

    #[test]
    fn test_type_id_from_i32() {
        assert_eq!(TypeId::from_i32(0), Some(TypeId::Boolean));
        assert_eq!(TypeId::from_i32(21), Some(TypeId::IntervalDayTime));
        assert_eq!(TypeId::from_i32(TIMESTAMP_LOCAL_TZ_TYPE_ID), None);
        assert_eq!(TypeId::from_i32(23), None);
        assert_eq!(TypeId::from_i32(-1), None);
        for (idx, type_id) in TypeId::ALL.iter().enumerate() {
            assert_eq!(*type_id as i32, idx as i32);
        }
    }

    #[test]
    fn test_thrift_type_rejects_unknown() {
        assert_eq!(ThriftType::try_from(12).unwrap(), ThriftType::Struct);
        assert!(matches!(
            ThriftType::try_from(5),
            Err(Error::InvalidFieldType(5))
        ));
    }

    #[test]
    fn test_status_code_failure() {
        assert!(StatusCode::Error.is_failure());
        assert!(StatusCode::InvalidHandle.is_failure());
        assert!(!StatusCode::SuccessWithInfo.is_failure());
        assert!(!StatusCode::StillExecuting.is_failure());
        assert_eq!(StatusCode::from_i32(9), None);
    }
}
