//! TCLIService request and response messages
//!
//! Each message implements [`ThriftStruct`](crate::protocol::ThriftStruct) in
//! both directions so a stub server can answer with the same types the client
//! decodes.

mod execute;
mod fetch;
mod handle;
mod metadata;
mod session;
mod status;

pub use execute::{CloseOperationReq, CloseOperationResp, ExecuteStatementReq, ExecuteStatementResp};
pub use fetch::{Column, FetchResultsReq, FetchResultsResp, RowSet, TypedColumn};
pub use handle::{HandleIdentifier, OperationHandle, SessionHandle};
pub use metadata::{
    ColumnDesc, GetColumnsReq, GetColumnsResp, GetResultSetMetadataReq, GetResultSetMetadataResp,
    GetSchemasReq, GetSchemasResp, GetTablesReq, GetTablesResp, OperationReq, OperationResp,
    TableSchema, UNKNOWN_TYPE_ID,
};
pub use session::{CloseSessionReq, CloseSessionResp, OpenSessionReq, OpenSessionResp, StatusResp};
pub use status::Status;
