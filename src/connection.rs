//! HiveServer2 session
//!
//! This module provides the main `Connection` type: one authenticated
//! transport carrying one session, with catalog discovery and statement
//! execution on top.
//!
//! # Example
//!
//! ```rust,no_run
//! use hive_rs::{AuthMode, Config, Connection};
//!
//! #[tokio::main]
//! async fn main() -> hive_rs::Result<()> {
//!     let config = Config::new("localhost", 10000)
//!         .credentials("hive", "")
//!         .auth(AuthMode::Plain);
//!     let mut conn = Connection::open(config).await?;
//!
//!     for schema in conn.list_schemas().await? {
//!         println!("{}", schema);
//!     }
//!
//!     let table = conn.execute_select("SELECT * FROM default.events LIMIT 10").await?;
//!     for row in &table.rows {
//!         println!("{:?}", row.values());
//!     }
//!
//!     conn.disconnect().await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::client::{HiveService, ThriftClient};
use crate::config::{AuthMode, Config};
use crate::constants::metadata_column;
use crate::error::{Error, Result};
use crate::messages::{
    CloseOperationReq, CloseSessionReq, ExecuteStatementReq, FetchResultsReq, GetColumnsReq,
    GetResultSetMetadataReq, GetSchemasReq, GetTablesReq, OpenSessionReq, OperationHandle,
    OperationResp, RowSet, SessionHandle, TableSchema,
};
use crate::result::{extract_strings, extract_table, NameList, ResultTable};
use crate::row::Value;
use crate::sasl::plain_handshake;
use crate::transport::{TcpTransport, Transport};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No transport, no session
    #[default]
    Disconnected,
    /// Transport or session being established
    Connecting,
    /// Session open; requests allowed
    Connected,
}

/// One fetched page with the metadata needed to decode it
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// Column metadata
    pub schema: TableSchema,
    /// Column-major page data
    pub rows: RowSet,
    /// The engine holds rows beyond this page
    pub has_more_rows: bool,
}

// Connection ID counter
static CONNECTION_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// A HiveServer2 session.
///
/// Every request method takes `&mut self`, so a connection never has more
/// than one RPC in flight. Use one connection per concurrent task.
///
/// Requests fail with [`Error::NotConnected`] unless the session is open.
/// Results are capped at one page ([`Config::name_page_size`] for name
/// listings, [`Config::row_page_size`] otherwise);
/// [`ResultTable::has_more_rows`] and [`NameList::has_more_rows`] report
/// truncation.
///
/// A transport failure during a request ([`Error::is_fatal`]) drops the
/// session: the connection goes back to [`SessionState::Disconnected`] and
/// may be connected again.
pub struct Connection<S: HiveService = ThriftClient> {
    service: Option<S>,
    session: Option<SessionHandle>,
    state: SessionState,
    server_protocol_version: Option<i32>,
    config: Config,
    id: u32,
}

impl<S: HiveService> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("session", &self.session.as_ref().map(|h| h.session_id.to_string()))
            .field("server_protocol_version", &self.server_protocol_version)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: HiveService> Connection<S> {
    /// Create a disconnected connection
    pub fn new(config: Config) -> Self {
        Self {
            service: None,
            session: None,
            state: SessionState::Disconnected,
            server_protocol_version: None,
            config,
            id: CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session is open
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Handle of the open session
    pub fn session_handle(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Protocol version the server answered OpenSession with
    pub fn server_protocol_version(&self) -> Option<i32> {
        self.server_protocol_version
    }

    /// Open a session over an already established service
    ///
    /// Used to plug in a transport other than TCP, or a stub.
    pub async fn connect_with_service(&mut self, service: S) -> Result<()> {
        self.begin_connect()?;
        self.open_session(service).await
    }

    fn begin_connect(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::AlreadyConnected);
        }
        self.config.validate()?;
        self.state = SessionState::Connecting;
        Ok(())
    }

    async fn open_session(&mut self, mut service: S) -> Result<()> {
        let request = OpenSessionReq::new(self.config.username.clone(), self.config.password());
        let opened = match service.open_session(request).await {
            Ok(resp) => resp.status.check().and_then(|_| {
                let handle = resp.session_handle.ok_or(Error::MissingField {
                    name: "TOpenSessionResp",
                    field: "sessionHandle",
                })?;
                Ok((handle, resp.server_protocol_version))
            }),
            Err(e) => Err(e),
        };

        match opened {
            Ok((handle, protocol)) => {
                tracing::info!(
                    conn_id = self.id,
                    session = %handle.session_id,
                    server_protocol = protocol,
                    "Session opened"
                );
                self.service = Some(service);
                self.session = Some(handle);
                self.server_protocol_version = Some(protocol);
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = service.close().await {
                    tracing::warn!(conn_id = self.id, error = %close_err, "Failed to close transport after OpenSession failure");
                }
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Close the session and the transport
    ///
    /// CloseSession is best-effort: failures are logged, not returned. The
    /// connection is disconnected afterwards even if closing the transport
    /// fails, in which case that error is returned.
    pub async fn disconnect(&mut self) -> Result<()> {
        let session = self.session.take();
        let service = self.service.take();
        self.state = SessionState::Disconnected;
        self.server_protocol_version = None;

        let Some(mut service) = service else {
            return Ok(());
        };

        if let Some(session_handle) = session {
            match service.close_session(CloseSessionReq { session_handle }).await {
                Ok(resp) => {
                    if let Err(e) = resp.status.check() {
                        tracing::warn!(conn_id = self.id, error = %e, "CloseSession rejected");
                    }
                }
                Err(e) => tracing::warn!(conn_id = self.id, error = %e, "CloseSession failed"),
            }
        }

        tracing::info!(conn_id = self.id, "Session closed");
        service.close().await
    }

    fn session(&self) -> Result<SessionHandle> {
        match (&self.state, &self.session) {
            (SessionState::Connected, Some(handle)) => Ok(handle.clone()),
            _ => Err(Error::NotConnected),
        }
    }

    fn service_mut(&mut self) -> Result<&mut S> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        self.service.as_mut().ok_or(Error::NotConnected)
    }

    /// Pass an RPC result through, abandoning the session on a fatal error
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::warn!(conn_id = self.id, error = %e, "Transport failed; session dropped");
                self.service = None;
                self.session = None;
                self.server_protocol_version = None;
                self.state = SessionState::Disconnected;
            }
        }
        result
    }

    /// List schema names (one page)
    pub async fn list_schemas(&mut self) -> Result<NameList> {
        let session_handle = self.session()?;
        tracing::debug!(conn_id = self.id, "Listing schemas");
        let resp = self
            .service_mut()?
            .get_schemas(GetSchemasReq::new(session_handle))
            .await;
        let operation = started_operation(self.settle(resp)?)?;

        self.fetch_names(operation, metadata_column::TABLE_SCHEM).await
    }

    /// List table names in `schema` (one page)
    pub async fn list_tables(&mut self, schema: &str) -> Result<NameList> {
        let session_handle = self.session()?;
        tracing::debug!(conn_id = self.id, schema = schema, "Listing tables");
        let resp = self
            .service_mut()?
            .get_tables(GetTablesReq::new(session_handle, schema))
            .await;
        let operation = started_operation(self.settle(resp)?)?;

        self.fetch_names(operation, metadata_column::TABLE_NAME).await
    }

    async fn fetch_names(&mut self, operation: OperationHandle, column: &str) -> Result<NameList> {
        let page = self.fetch_page(operation, self.config.name_page_size).await?;
        let names = extract_strings(&page.schema, &page.rows, column)?;
        if page.has_more_rows {
            tracing::debug!(
                conn_id = self.id,
                names = names.len(),
                "Name listing truncated at page size"
            );
        }
        Ok(NameList {
            names,
            has_more_rows: page.has_more_rows,
        })
    }

    /// Describe the columns of `schema.table` (one page)
    ///
    /// The table holds `TABLE_SCHEM`, `TABLE_NAME`, `COLUMN_NAME`,
    /// `TYPE_NAME` and `IS_NULLABLE`, in that order.
    pub async fn list_columns(&mut self, schema: &str, table: &str) -> Result<ResultTable> {
        let session_handle = self.session()?;
        tracing::debug!(conn_id = self.id, schema = schema, table = table, "Listing columns");
        let resp = self
            .service_mut()?
            .get_columns(GetColumnsReq::new(session_handle, schema, table))
            .await;
        let operation = started_operation(self.settle(resp)?)?;

        self.decode_page(
            operation,
            self.config.row_page_size,
            Some(&metadata_column::COLUMN_LISTING[..]),
        )
        .await
    }

    /// Run a statement and return the first page of its result
    ///
    /// Statements without a result set (DDL, INSERT) return an empty table.
    pub async fn execute_statement(&mut self, sql: &str) -> Result<ResultTable> {
        let operation = self.submit(sql).await?;
        if !operation.has_result_set {
            self.close_operation_quietly(operation).await;
            return Ok(ResultTable::default());
        }
        self.decode_page(operation, self.config.row_page_size, None).await
    }

    /// Run a query that must produce rows
    pub async fn execute_select(&mut self, sql: &str) -> Result<ResultTable> {
        let operation = self.submit(sql).await?;
        if !operation.has_result_set {
            self.close_operation_quietly(operation).await;
            return Err(Error::NoResultSet);
        }
        self.decode_page(operation, self.config.row_page_size, None).await
    }

    /// DDL of `schema.table` as reported by `SHOW CREATE TABLE`
    ///
    /// Fails with [`Error::TruncatedResult`] when the statement does not fit
    /// in one page ([`Config::row_page_size`] lines).
    pub async fn show_create_table(&mut self, schema: &str, table: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(schema)?,
            quote_identifier(table)?
        );
        let result = self.execute_select(&sql).await?;
        if result.has_more_rows {
            return Err(Error::TruncatedResult { rows: result.len() });
        }

        let index = match result.column_index(metadata_column::CREATE_TABLE_STATEMENT) {
            Some(index) => index,
            None if !result.columns.is_empty() => 0,
            None => {
                return Err(Error::ColumnNotFound(
                    metadata_column::CREATE_TABLE_STATEMENT.to_string(),
                ))
            }
        };

        let lines: Vec<String> = result
            .rows
            .iter()
            .map(|row| match row.get(index) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// First page of `SELECT * FROM schema.table`
    pub async fn get_table_records(&mut self, schema: &str, table: &str) -> Result<ResultTable> {
        let sql = format!(
            "SELECT * FROM {}.{}",
            quote_identifier(schema)?,
            quote_identifier(table)?
        );
        self.execute_select(&sql).await
    }

    /// Fetch metadata and one page for `operation`, then close it
    ///
    /// The operation is closed whether or not the fetch succeeded; a failure
    /// to close is logged.
    pub async fn fetch_page(&mut self, operation: OperationHandle, max_rows: i64) -> Result<ResultPage> {
        let page = self.fetch_page_open(&operation, max_rows).await;
        self.close_operation_quietly(operation).await;
        page
    }

    /// Release an operation's server-side resources
    pub async fn close_operation(&mut self, operation: OperationHandle) -> Result<()> {
        let resp = self
            .service_mut()?
            .close_operation(CloseOperationReq {
                operation_handle: operation,
            })
            .await;
        self.settle(resp)?.status.check()
    }

    async fn submit(&mut self, sql: &str) -> Result<OperationHandle> {
        let session_handle = self.session()?;
        tracing::debug!(conn_id = self.id, sql = sql, "Executing statement");
        let resp = self
            .service_mut()?
            .execute_statement(ExecuteStatementReq::new(session_handle, sql))
            .await;
        started_operation(self.settle(resp)?)
    }

    async fn decode_page(
        &mut self,
        operation: OperationHandle,
        max_rows: i64,
        filter: Option<&[&str]>,
    ) -> Result<ResultTable> {
        let page = self.fetch_page(operation, max_rows).await?;
        let mut table = extract_table(&page.schema, &page.rows, filter)?;
        table.has_more_rows = page.has_more_rows;
        if table.has_more_rows {
            tracing::debug!(
                conn_id = self.id,
                rows = table.len(),
                "Result truncated at page size"
            );
        }
        Ok(table)
    }

    async fn fetch_page_open(&mut self, operation: &OperationHandle, max_rows: i64) -> Result<ResultPage> {
        let metadata = self
            .service_mut()?
            .get_result_set_metadata(GetResultSetMetadataReq {
                operation_handle: operation.clone(),
            })
            .await;
        let metadata = self.settle(metadata)?;
        metadata.status.check()?;
        let schema = metadata.schema.ok_or(Error::MissingField {
            name: "TGetResultSetMetadataResp",
            field: "schema",
        })?;

        let fetched = self
            .service_mut()?
            .fetch_results(FetchResultsReq::next(operation.clone(), max_rows))
            .await;
        let fetched = self.settle(fetched)?;
        fetched.status.check()?;

        Ok(ResultPage {
            schema,
            rows: fetched.results.unwrap_or_default(),
            has_more_rows: fetched.has_more_rows,
        })
    }

    async fn close_operation_quietly(&mut self, operation: OperationHandle) {
        // Nothing to release once the transport is gone
        if !self.is_connected() {
            return;
        }
        let id = self.id;
        let operation_id = operation.operation_id.to_string();
        if let Err(e) = self.close_operation(operation).await {
            tracing::warn!(conn_id = id, operation = %operation_id, error = %e, "CloseOperation failed");
        }
    }
}

impl Connection<ThriftClient> {
    /// Connect, authenticate and open a session in one step
    pub async fn open(config: Config) -> Result<Self> {
        let mut conn = Self::new(config);
        conn.connect().await?;
        Ok(conn)
    }

    /// Open the TCP connection, run the handshake and open a session
    ///
    /// The configured timeout bounds the TCP connect only.
    pub async fn connect(&mut self) -> Result<()> {
        self.begin_connect()?;
        match establish(&self.config).await {
            Ok(client) => self.open_session(client).await,
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }
}

async fn establish(config: &Config) -> Result<ThriftClient> {
    let mut transport = TcpTransport::new();
    transport.connect_with_config(config).await?;

    if config.auth_mode == AuthMode::Plain {
        if let Err(e) = plain_handshake(&mut transport, &config.username, config.password()).await {
            let _ = transport.close().await;
            return Err(e);
        }
    }

    Ok(ThriftClient::new(transport))
}

/// Check the status of an operation-starting response and take its handle
fn started_operation(resp: OperationResp) -> Result<OperationHandle> {
    resp.status.check()?;
    resp.operation_handle.ok_or(Error::MissingField {
        name: "TOperationResp",
        field: "operationHandle",
    })
}

/// Quote a schema or table name for use in generated SQL
///
/// Wraps the name in backticks and doubles any backtick inside it. Empty
/// names and names containing NUL are rejected.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("default").unwrap(), "`default`");
        assert_eq!(quote_identifier("my table").unwrap(), "`my table`");
        assert_eq!(quote_identifier("a`b").unwrap(), "`a``b`");
    }

    #[test]
    fn test_quote_identifier_rejects() {
        assert!(matches!(quote_identifier(""), Err(Error::InvalidIdentifier(_))));
        assert!(matches!(quote_identifier("a\0b"), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_debug_hides_password() {
        let conn: Connection =
            Connection::new(Config::new("warehouse", 10000).credentials("etl", "s3cret"));
        let debug = format!("{:?}", conn);
        assert!(debug.contains("Disconnected"));
        assert!(debug.contains("warehouse"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let conn: Connection = Connection::new(Config::default());
        assert_eq!(conn.state(), SessionState::Disconnected);
        assert!(!conn.is_connected());
        assert!(conn.session_handle().is_none());
    }

    #[tokio::test]
    async fn test_requests_need_session() {
        let mut conn: Connection = Connection::new(Config::default());
        assert!(matches!(conn.list_schemas().await, Err(Error::NotConnected)));
        assert!(matches!(
            conn.execute_statement("SELECT 1").await,
            Err(Error::NotConnected)
        ));
        // disconnect on a fresh connection is a no-op
        conn.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_handshake_resets_state() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 256];
            let _ = socket.read(&mut request).await.unwrap();
            let bad = crate::sasl::SaslMessage::new(
                crate::constants::SaslStatus::Bad,
                &b"Error validating the login"[..],
            );
            socket.write_all(&bad.encode().unwrap()).await.unwrap();
            // The client hangs up after the rejection
            while socket.read(&mut request).await.unwrap_or(0) > 0 {}
        });

        let config = Config::new("127.0.0.1", port)
            .credentials("hive", "wrong")
            .auth(AuthMode::Plain);
        let mut conn: Connection = Connection::new(config);
        let err = conn.connect().await.unwrap_err();
        assert!(err.is_auth_error(), "{}", err);
        assert_eq!(conn.state(), SessionState::Disconnected);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused_resets_state() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut conn: Connection = Connection::new(Config::new("127.0.0.1", port));
        assert!(conn.connect().await.is_err());
        assert_eq!(conn.state(), SessionState::Disconnected);
    }
}
