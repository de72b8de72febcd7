//! Thrift message header encoding/decoding
//!
//! Every call and reply starts with a strict binary protocol header:
//!
//! ```text
//! +--------+--------+--------+--------+------------------+--------+--------+--------+--------+
//! | 0x80   | 0x01   | 0x00   | type   | name (i32 len +  |          sequence id (i32)        |
//! |        version         |        |  UTF-8 bytes)    |                                   |
//! +--------+--------+--------+--------+------------------+--------+--------+--------+--------+
//! ```

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{MessageType, BINARY_TYPE_MASK, BINARY_VERSION_1, BINARY_VERSION_MASK};
use crate::error::{Error, Result};

/// Thrift message header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Method name
    pub name: String,
    /// Call, reply, exception or oneway
    pub message_type: MessageType,
    /// Sequence id pairing a reply with its call
    pub seq_id: i32,
}

impl MessageHeader {
    /// Create a new message header
    pub fn new(name: impl Into<String>, message_type: MessageType, seq_id: i32) -> Self {
        Self {
            name: name.into(),
            message_type,
            seq_id,
        }
    }

    /// Create a CALL header
    pub fn call(name: impl Into<String>, seq_id: i32) -> Self {
        Self::new(name, MessageType::Call, seq_id)
    }

    /// Read a strict message header from a buffer
    pub fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let word = buf.read_u32()?;
        if word & BINARY_VERSION_MASK != BINARY_VERSION_1 {
            return Err(Error::protocol(format!(
                "bad message version {:#010x} (non-strict or foreign protocol)",
                word & BINARY_VERSION_MASK
            )));
        }

        let message_type = MessageType::try_from((word & BINARY_TYPE_MASK) as u8)?;
        let name = buf.read_string()?;
        let seq_id = buf.read_i32()?;

        Ok(Self {
            name,
            message_type,
            seq_id,
        })
    }

    /// Write the header to a buffer
    pub fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(BINARY_VERSION_1 | self.message_type as u32);
        buf.write_string(&self.name)?;
        buf.write_i32(self.seq_id);
        Ok(())
    }
}
