//! Buffer abstractions for Thrift binary protocol encoding/decoding
//!
//! This module provides the byte buffers used by the Thrift codec and the
//! SASL framer. All multi-byte integers are big-endian (network byte order).

mod read;
mod write;

pub use read::ReadBuffer;
pub use write::WriteBuffer;
