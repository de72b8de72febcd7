//! SASL PLAIN handshake
//!
//! HiveServer2 in any mode other than `NOSASL` expects a SASL negotiation on
//! the raw socket before the first Thrift message. The client sends `START`
//! with the mechanism name and then, without waiting, `COMPLETE` with the
//! PLAIN credentials. The server answers `COMPLETE` on success or `BAD` /
//! `ERROR` with a reason. From then on every Thrift message is framed with a
//! 4-byte length.
//!
//! [`PlainNegotiation`] is the I/O-free state machine; [`plain_handshake`]
//! drives it over a [`Transport`].

mod frame;

pub use frame::{SaslDecoder, SaslMessage};

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{SaslStatus, SASL_MECHANISM_PLAIN};
use crate::error::{Error, Result};
use crate::transport::{Framing, Transport};

/// Terminal result of a negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaslOutcome {
    /// Server accepted the credentials
    Authenticated {
        /// Bytes received after the server's `COMPLETE` message
        leftover: Bytes,
    },
    /// Server rejected the negotiation
    Rejected {
        /// `BAD` or `ERROR`
        status: SaslStatus,
        /// Server-supplied reason
        message: String,
    },
}

/// Client side of a PLAIN negotiation
#[derive(Debug, Default)]
pub struct PlainNegotiation {
    decoder: SaslDecoder,
    finished: bool,
}

impl PlainNegotiation {
    /// Create a negotiation with an empty receive buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// The two messages the client sends up front: `START` and `COMPLETE`
    pub fn initial_messages(username: &str, password: &str) -> [SaslMessage; 2] {
        [
            SaslMessage::new(SaslStatus::Start, SASL_MECHANISM_PLAIN.as_bytes().to_vec()),
            SaslMessage::new(SaslStatus::Complete, plain_credentials(username, password)),
        ]
    }

    /// Whether a terminal outcome has been reported
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed received bytes
    ///
    /// Returns the outcome once a terminal message arrives. Input after that
    /// is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<SaslOutcome>> {
        if self.finished {
            return Ok(None);
        }
        self.decoder.extend(chunk);

        loop {
            let message = match self.decoder.decode() {
                Ok(Some(message)) => message,
                Ok(None) => return Ok(None),
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            };
            tracing::trace!(status = ?message.status, len = message.payload.len(), "SASL message");
            match message.status {
                SaslStatus::Complete => {
                    self.finished = true;
                    return Ok(Some(SaslOutcome::Authenticated {
                        leftover: self.decoder.take_remaining(),
                    }));
                }
                SaslStatus::Bad | SaslStatus::Error => {
                    self.finished = true;
                    return Ok(Some(SaslOutcome::Rejected {
                        status: message.status,
                        message: message.payload_text(),
                    }));
                }
                SaslStatus::Ok => {
                    tracing::debug!("SASL OK from server, waiting for COMPLETE");
                }
                SaslStatus::Start => {
                    self.finished = true;
                    return Err(Error::protocol("unexpected SASL START from server"));
                }
            }
        }
    }
}

/// PLAIN credentials: empty authorization id, then user and password, NUL separated
fn plain_credentials(username: &str, password: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(username.len() + password.len() + 2);
    buf.put_u8(0);
    buf.put_slice(username.as_bytes());
    buf.put_u8(0);
    buf.put_slice(password.as_bytes());
    buf.freeze()
}

/// Run the PLAIN handshake and switch the transport to SASL framing
///
/// Holds the transport exclusively for the duration. Bytes the server sent
/// after `COMPLETE` are pushed back for the RPC reader.
pub async fn plain_handshake<T>(transport: &mut T, username: &str, password: &str) -> Result<()>
where
    T: Transport + ?Sized,
{
    tracing::debug!(username = username, "Starting SASL PLAIN handshake");

    for message in PlainNegotiation::initial_messages(username, password) {
        transport.write_raw(&message.encode()?).await?;
    }

    let mut negotiation = PlainNegotiation::new();
    loop {
        let chunk = transport.read_chunk().await?;
        match negotiation.feed(&chunk)? {
            Some(SaslOutcome::Authenticated { leftover }) => {
                if !leftover.is_empty() {
                    tracing::trace!(bytes = leftover.len(), "Returning bytes after SASL COMPLETE");
                    transport.unread(leftover);
                }
                transport.set_framing(Framing::Sasl);
                tracing::debug!("SASL PLAIN handshake complete");
                return Ok(());
            }
            Some(SaslOutcome::Rejected { status, message }) => {
                tracing::debug!(status = ?status, "SASL PLAIN handshake rejected");
                return Err(Error::AuthenticationFailed(message));
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(status: SaslStatus, payload: &[u8]) -> Vec<u8> {
        SaslMessage::new(status, payload.to_vec()).encode().unwrap().to_vec()
    }

    #[test]
    fn test_initial_messages() {
        let [start, complete] = PlainNegotiation::initial_messages("hive", "pw");
        assert_eq!(start.status, SaslStatus::Start);
        assert_eq!(&start.payload[..], b"PLAIN");
        assert_eq!(complete.status, SaslStatus::Complete);
        assert_eq!(&complete.payload[..], b"\0hive\0pw");
    }

    #[test]
    fn test_complete_with_leftover() {
        let mut negotiation = PlainNegotiation::new();
        let mut bytes = wire(SaslStatus::Complete, b"");
        bytes.extend_from_slice(&[0, 0, 0, 9]);

        let outcome = negotiation.feed(&bytes).unwrap();
        assert_eq!(
            outcome,
            Some(SaslOutcome::Authenticated {
                leftover: Bytes::from_static(&[0, 0, 0, 9])
            })
        );
        assert!(negotiation.is_finished());
        // reported once
        assert_eq!(negotiation.feed(&wire(SaslStatus::Complete, b"")).unwrap(), None);
    }

    #[test]
    fn test_bad_carries_message() {
        let mut negotiation = PlainNegotiation::new();
        let outcome = negotiation.feed(&wire(SaslStatus::Bad, b"Error validating the login")).unwrap();
        assert_eq!(
            outcome,
            Some(SaslOutcome::Rejected {
                status: SaslStatus::Bad,
                message: "Error validating the login".to_string()
            })
        );
    }

    #[test]
    fn test_ok_is_ignored_and_split_delivery() {
        let mut negotiation = PlainNegotiation::new();
        let mut bytes = wire(SaslStatus::Ok, b"");
        bytes.extend(wire(SaslStatus::Complete, b"done"));

        let (head, tail) = bytes.split_at(7);
        assert_eq!(negotiation.feed(head).unwrap(), None);
        assert!(!negotiation.is_finished());
        assert!(matches!(
            negotiation.feed(tail).unwrap(),
            Some(SaslOutcome::Authenticated { ref leftover }) if leftover.is_empty()
        ));
    }

    #[test]
    fn test_start_from_server_is_protocol_error() {
        let mut negotiation = PlainNegotiation::new();
        let err = negotiation.feed(&wire(SaslStatus::Start, b"PLAIN")).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
