#![warn(missing_docs)]

//! # hive-rs
//!
//! An async client for HiveServer2-compatible SQL engines, speaking the
//! Thrift `TCLIService` protocol directly. No Thrift code generator or JVM
//! required.
//!
//! ## Features
//!
//! - **SASL PLAIN** - Username/password handshake on the raw socket, then
//!   length-framed Thrift
//! - **Async/await** - Built on Tokio
//! - **Columnar decoding** - Typed column pages turned into rows, single
//!   columns or ordered column maps
//! - **Pluggable RPC** - The session layer depends only on [`HiveService`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hive_rs::{AuthMode, Config, Connection};
//!
//! #[tokio::main]
//! async fn main() -> hive_rs::Result<()> {
//!     let config = Config::new("localhost", 10000)
//!         .credentials("hive", "secret")
//!         .auth(AuthMode::Plain);
//!     let mut conn = Connection::open(config).await?;
//!
//!     let tables = conn.list_tables("default").await?;
//!     println!("{} tables", tables.len());
//!
//!     let result = conn.execute_select("SELECT id, name FROM default.users").await?;
//!     for row in &result.rows {
//!         let id = row.get_i64(0).unwrap_or(0);
//!         let name = row.get_string(1).unwrap_or("");
//!         println!("User {}: {}", id, name);
//!     }
//!
//!     conn.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! | Server `hive.server2.authentication` | [`AuthMode`] |
//! |------|------|
//! | `NOSASL` | [`AuthMode::NoSasl`] |
//! | `NONE`, `LDAP`, `CUSTOM` | [`AuthMode::Plain`] |
//!
//! ## Type Mapping
//!
//! | Hive Type | [`Value`] |
//! |-----------|-----------|
//! | BOOLEAN | `Boolean(bool)` |
//! | TINYINT | `TinyInt(i8)` |
//! | SMALLINT | `SmallInt(i16)` |
//! | INT | `Int(i32)` |
//! | BIGINT, TIMESTAMP | `BigInt(i64)` |
//! | FLOAT, DOUBLE | `Double(f64)` |
//! | STRING, VARCHAR, CHAR, DATE, DECIMAL, BINARY, complex types | `String(String)` |
//!
//! `TIMESTAMP WITH LOCAL TIME ZONE` columns cannot be decoded.
//!
//! ## Paging
//!
//! Every call returns at most one page: 1000 names for schema and table
//! listings, 50 rows otherwise (see [`Config`]).
//! [`ResultTable::has_more_rows`] and [`NameList::has_more_rows`] tell when
//! the engine had more. `SHOW CREATE TABLE` output that does not fit is an
//! error ([`Error::TruncatedResult`]) rather than a partial statement.
//!
//! ## Failures
//!
//! Engine-reported errors leave the session usable. A transport failure
//! during a request ([`Error::is_fatal`]) drops the session and the
//! connection must be connected again.

pub mod buffer;
pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod result;
pub mod row;
pub mod sasl;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use client::{HiveService, ThriftClient};
pub use config::{AuthMode, Config};
pub use connection::{quote_identifier, Connection, ResultPage, SessionState};
pub use constants::{FetchOrientation, StatusCode, TypeId};
pub use error::{Error, Result};
pub use result::{extract_column, extract_column_map, extract_strings, extract_table, NameList, ResultTable};
pub use row::{Row, Value};
pub use sasl::{plain_handshake, PlainNegotiation, SaslDecoder, SaslMessage, SaslOutcome};
pub use transport::{Framing, TcpTransport, Transport};
pub use types::{column_field, column_field_for_id, ColumnField};

// Re-export serde_json for users converting results to JSON
pub use serde_json;
