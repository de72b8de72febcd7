//! SASL negotiation message framing
//!
//! Each negotiation message is `[status: u8][length: u32 BE][payload]`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{SaslStatus, SASL_HEADER_SIZE, SASL_STATUS_BYTES};
use crate::error::{Error, Result};

/// One negotiation message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslMessage {
    /// Negotiation status
    pub status: SaslStatus,
    /// Mechanism name, credentials or server text depending on status
    pub payload: Bytes,
}

impl SaslMessage {
    /// Create a message
    pub fn new(status: SaslStatus, payload: impl Into<Bytes>) -> Self {
        Self {
            status,
            payload: payload.into(),
        }
    }

    /// Message with an empty payload
    pub fn empty(status: SaslStatus) -> Self {
        Self::new(status, Bytes::new())
    }

    /// Payload as text (lossy)
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Total encoded length
    pub fn encoded_len(&self) -> usize {
        SASL_HEADER_SIZE + self.payload.len()
    }

    /// Encode to wire format
    pub fn encode(&self) -> Result<Bytes> {
        let length = u32::try_from(self.payload.len())
            .map_err(|_| Error::InvalidLength(self.payload.len() as i64))?;
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.status as u8);
        buf.put_u32(length);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

/// Pull decoder over an accumulating receive buffer
#[derive(Debug, Default)]
pub struct SaslDecoder {
    buf: BytesMut,
}

impl SaslDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of buffered, not yet decoded bytes
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete message, if one is buffered
    ///
    /// The buffer is left untouched when the message is incomplete.
    pub fn decode(&mut self) -> Result<Option<SaslMessage>> {
        if self.buf.len() < SASL_HEADER_SIZE {
            return Ok(None);
        }

        let status_byte = self.buf[0];
        let mut length_bytes = &self.buf[SASL_STATUS_BYTES..SASL_HEADER_SIZE];
        let length = length_bytes.get_u32() as usize;
        if self.buf.len() < SASL_HEADER_SIZE + length {
            return Ok(None);
        }

        let status = SaslStatus::try_from(status_byte)?;
        let mut message = self.buf.split_to(SASL_HEADER_SIZE + length);
        message.advance(SASL_HEADER_SIZE);
        Ok(Some(SaslMessage::new(status, message.freeze())))
    }

    /// Take every byte not yet decoded
    pub fn take_remaining(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_start() {
        let encoded = SaslMessage::new(SaslStatus::Start, &b"PLAIN"[..]).encode().unwrap();
        assert_eq!(&encoded[..], &[1, 0, 0, 0, 5, b'P', b'L', b'A', b'I', b'N']);
    }

    #[test]
    fn test_encode_empty_payload() {
        let encoded = SaslMessage::empty(SaslStatus::Ok).encode().unwrap();
        assert_eq!(&encoded[..], &[2, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_uses_byte_length() {
        let encoded = SaslMessage::new(SaslStatus::Complete, "é".as_bytes().to_vec())
            .encode()
            .unwrap();
        assert_eq!(&encoded[1..5], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut decoder = SaslDecoder::new();
        decoder.extend(&[5, 0, 0]);
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut decoder = SaslDecoder::new();
        decoder.extend(&[3, 0, 0, 0, 4, b'n', b'o']);
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), 7);
        decoder.extend(b"pe");
        let message = decoder.decode().unwrap().unwrap();
        assert_eq!(message.status, SaslStatus::Bad);
        assert_eq!(message.payload_text(), "nope");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_concatenated() {
        let mut wire = SaslMessage::empty(SaslStatus::Ok).encode().unwrap().to_vec();
        wire.extend_from_slice(&SaslMessage::new(SaslStatus::Complete, &b"ok"[..]).encode().unwrap());
        wire.extend_from_slice(b"\x00\x00");

        let mut decoder = SaslDecoder::new();
        decoder.extend(&wire);
        assert_eq!(decoder.decode().unwrap().unwrap().status, SaslStatus::Ok);
        assert_eq!(decoder.decode().unwrap().unwrap().status, SaslStatus::Complete);
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(&decoder.take_remaining()[..], b"\x00\x00");
    }

    #[test]
    fn test_decode_unknown_status() {
        let mut decoder = SaslDecoder::new();
        decoder.extend(&[9, 0, 0, 0, 0]);
        assert!(matches!(decoder.decode(), Err(Error::InvalidSaslStatus(9))));
    }
}
