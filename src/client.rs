//! Typed TCLIService client
//!
//! [`HiveService`] is the RPC surface the session layer depends on: one
//! method per TCLIService call, each taking a request struct and returning
//! the decoded response. [`ThriftClient`] implements it with the crate's
//! Thrift binary codec over any [`Transport`].

use bytes::{Bytes, BytesMut};

use crate::buffer::ReadBuffer;
use crate::constants::MAX_LENGTH;
use crate::error::{Error, Result};
use crate::messages::{
    CloseOperationReq, CloseOperationResp, CloseSessionReq, CloseSessionResp, ExecuteStatementReq,
    ExecuteStatementResp, FetchResultsReq, FetchResultsResp, GetColumnsReq, GetColumnsResp,
    GetResultSetMetadataReq, GetResultSetMetadataResp, GetSchemasReq, GetSchemasResp,
    GetTablesReq, GetTablesResp, OpenSessionReq, OpenSessionResp,
};
use crate::protocol::{decode_reply, encode_call, ThriftStruct};
use crate::transport::{Framing, TcpTransport, Transport};

/// TCLIService method names
pub mod method {
    #![allow(missing_docs)]
    pub const OPEN_SESSION: &str = "OpenSession";
    pub const CLOSE_SESSION: &str = "CloseSession";
    pub const GET_SCHEMAS: &str = "GetSchemas";
    pub const GET_TABLES: &str = "GetTables";
    pub const GET_COLUMNS: &str = "GetColumns";
    pub const EXECUTE_STATEMENT: &str = "ExecuteStatement";
    pub const GET_RESULT_SET_METADATA: &str = "GetResultSetMetadata";
    pub const FETCH_RESULTS: &str = "FetchResults";
    pub const CLOSE_OPERATION: &str = "CloseOperation";
}

/// The TCLIService calls used by [`Connection`](crate::Connection)
#[async_trait::async_trait]
pub trait HiveService: Send {
    /// OpenSession
    async fn open_session(&mut self, req: OpenSessionReq) -> Result<OpenSessionResp>;
    /// CloseSession
    async fn close_session(&mut self, req: CloseSessionReq) -> Result<CloseSessionResp>;
    /// GetSchemas
    async fn get_schemas(&mut self, req: GetSchemasReq) -> Result<GetSchemasResp>;
    /// GetTables
    async fn get_tables(&mut self, req: GetTablesReq) -> Result<GetTablesResp>;
    /// GetColumns
    async fn get_columns(&mut self, req: GetColumnsReq) -> Result<GetColumnsResp>;
    /// ExecuteStatement
    async fn execute_statement(&mut self, req: ExecuteStatementReq) -> Result<ExecuteStatementResp>;
    /// GetResultSetMetadata
    async fn get_result_set_metadata(
        &mut self,
        req: GetResultSetMetadataReq,
    ) -> Result<GetResultSetMetadataResp>;
    /// FetchResults
    async fn fetch_results(&mut self, req: FetchResultsReq) -> Result<FetchResultsResp>;
    /// CloseOperation
    async fn close_operation(&mut self, req: CloseOperationReq) -> Result<CloseOperationResp>;
    /// Release the underlying connection
    async fn close(&mut self) -> Result<()>;
}

/// Thrift binary protocol client over a [`Transport`]
pub struct ThriftClient<T: Transport = TcpTransport> {
    transport: T,
    seq_id: i32,
}

impl<T: Transport> ThriftClient<T> {
    /// Create a client; sequence ids start at 1
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            seq_id: 0,
        }
    }

    /// Get the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the client and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn next_seq_id(&mut self) -> i32 {
        self.seq_id = self.seq_id.wrapping_add(1);
        self.seq_id
    }

    /// Send one call and wait for its reply
    pub async fn call<Req, Resp>(&mut self, method: &str, request: &Req) -> Result<Resp>
    where
        Req: ThriftStruct + Sync,
        Resp: ThriftStruct,
    {
        let seq_id = self.next_seq_id();
        tracing::debug!(method = method, seq_id = seq_id, "Thrift call");

        let message = encode_call(method, seq_id, request)?;
        self.transport.send_message(message).await?;

        match self.transport.framing() {
            Framing::Sasl => {
                let frame = self.transport.receive_message().await?;
                let mut buf = ReadBuffer::new(frame);
                let reply = decode_reply(&mut buf, method, seq_id)?;
                if buf.remaining() > 0 {
                    tracing::trace!(bytes = buf.remaining(), "Ignoring trailing bytes in frame");
                }
                Ok(reply)
            }
            Framing::Buffered => self.receive_unframed(method, seq_id).await,
        }
    }

    /// Reassemble an unframed reply, reading until it decodes
    ///
    /// Chunks are appended in place and each decode attempt shares the same
    /// allocation, so buffered bytes are not copied again. Bytes past the
    /// reply go back to the transport.
    async fn receive_unframed<Resp: ThriftStruct>(&mut self, method: &str, seq_id: i32) -> Result<Resp> {
        let mut pending = BytesMut::new();
        loop {
            let chunk = self.transport.receive_message().await?;
            pending.extend_from_slice(&chunk);
            if pending.len() > MAX_LENGTH {
                return Err(Error::InvalidLength(pending.len() as i64));
            }

            let frozen = std::mem::take(&mut pending).freeze();
            let attempt = {
                let mut buf = ReadBuffer::new(frozen.clone());
                decode_reply(&mut buf, method, seq_id).map(|reply| (reply, buf.position()))
            };
            match attempt {
                Ok((reply, consumed)) => {
                    if consumed < frozen.len() {
                        self.transport.unread(frozen.slice(consumed..));
                    }
                    return Ok(reply);
                }
                Err(Error::BufferUnderflow { .. }) => {
                    tracing::trace!(buffered = frozen.len(), "Partial reply, reading more");
                    // Sole owner again, so this reclaims the allocation
                    pending = BytesMut::from(frozen);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait::async_trait]
impl<T: Transport> HiveService for ThriftClient<T> {
    async fn open_session(&mut self, req: OpenSessionReq) -> Result<OpenSessionResp> {
        self.call(method::OPEN_SESSION, &req).await
    }

    async fn close_session(&mut self, req: CloseSessionReq) -> Result<CloseSessionResp> {
        self.call(method::CLOSE_SESSION, &req).await
    }

    async fn get_schemas(&mut self, req: GetSchemasReq) -> Result<GetSchemasResp> {
        self.call(method::GET_SCHEMAS, &req).await
    }

    async fn get_tables(&mut self, req: GetTablesReq) -> Result<GetTablesResp> {
        self.call(method::GET_TABLES, &req).await
    }

    async fn get_columns(&mut self, req: GetColumnsReq) -> Result<GetColumnsResp> {
        self.call(method::GET_COLUMNS, &req).await
    }

    async fn execute_statement(&mut self, req: ExecuteStatementReq) -> Result<ExecuteStatementResp> {
        self.call(method::EXECUTE_STATEMENT, &req).await
    }

    async fn get_result_set_metadata(
        &mut self,
        req: GetResultSetMetadataReq,
    ) -> Result<GetResultSetMetadataResp> {
        self.call(method::GET_RESULT_SET_METADATA, &req).await
    }

    async fn fetch_results(&mut self, req: FetchResultsReq) -> Result<FetchResultsResp> {
        self.call(method::FETCH_RESULTS, &req).await
    }

    async fn close_operation(&mut self, req: CloseOperationReq) -> Result<CloseOperationResp> {
        self.call(method::CLOSE_OPERATION, &req).await
    }

    async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
