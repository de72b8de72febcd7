//! Connection configuration and address parsing
//!
//! Supports addresses of the form:
//! - `host`
//! - `host:port`
//! - `hive2://host[:port][/database]` (the database part is ignored)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default HiveServer2 Thrift port
pub const DEFAULT_PORT: u16 = 10000;

/// Username sent when none is configured
pub const DEFAULT_USERNAME: &str = "anonymous";

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Page cap for name listings (schemas, tables)
pub const DEFAULT_NAME_PAGE_SIZE: i64 = 1000;

/// Page cap for row-oriented results (columns, statements)
pub const DEFAULT_ROW_PAGE_SIZE: i64 = 50;

/// How the byte stream is authenticated before RPC traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No handshake; unframed Thrift directly on the socket
    #[default]
    NoSasl,
    /// SASL PLAIN handshake, then length-framed Thrift
    Plain,
}

impl FromStr for AuthMode {
    type Err = Error;

    /// `nosasl` disables the handshake; `plain`, `none`, `ldap` and `custom`
    /// all authenticate with PLAIN
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nosasl" => Ok(AuthMode::NoSasl),
            "plain" | "none" | "ldap" | "custom" => Ok(AuthMode::Plain),
            other => Err(Error::InvalidConfig(format!("unknown auth mode: {}", other))),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::NoSasl => write!(f, "NOSASL"),
            AuthMode::Plain => write!(f, "PLAIN"),
        }
    }
}

/// Connection configuration for a HiveServer2 endpoint.
///
/// # Examples
///
/// ```rust
/// use hive_rs::{AuthMode, Config};
/// use std::time::Duration;
///
/// let config = Config::new("warehouse.internal", 10000)
///     .credentials("etl", "secret")
///     .auth(AuthMode::Plain)
///     .connect_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.socket_addr(), "warehouse.internal:10000");
/// ```
///
/// Addresses can also be parsed:
///
/// ```rust
/// use hive_rs::Config;
///
/// let config: Config = "hive2://warehouse.internal:10001".parse().unwrap();
/// assert_eq!(config.port, 10001);
/// ```
#[derive(Clone)]
pub struct Config {
    /// Host to connect to
    pub host: String,
    /// Port to connect to
    pub port: u16,
    /// Session user
    pub username: String,
    /// Session password
    password: String,
    /// Handshake mode
    pub auth_mode: AuthMode,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Page cap for schema and table listings
    pub name_page_size: i64,
    /// Page cap for column listings and statement results
    pub row_page_size: i64,
}

impl Config {
    /// Create a configuration with default credentials and no handshake
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the handshake mode
    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the page cap for schema and table listings
    pub fn name_page_size(mut self, rows: i64) -> Self {
        self.name_page_size = rows;
        self
    }

    /// Set the page cap for column listings and statement results
    pub fn row_page_size(mut self, rows: i64) -> Self {
        self.row_page_size = rows;
        self
    }

    /// Get the password (for authentication)
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Set the password
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Set the username
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// Check that the values can be used to connect
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig("missing host".to_string()));
        }
        if self.name_page_size <= 0 || self.row_page_size <= 0 {
            return Err(Error::InvalidConfig("page sizes must be positive".to_string()));
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            auth_mode: AuthMode::NoSasl,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            name_page_size: DEFAULT_NAME_PAGE_SIZE,
            row_page_size: DEFAULT_ROW_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("connect_timeout", &self.connect_timeout)
            .field("name_page_size", &self.name_page_size)
            .field("row_page_size", &self.row_page_size)
            .finish()
    }
}

/// Parse `[hive2://]host[:port][/database]`
impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("hive2://").unwrap_or(s);
        let host_port = s.split('/').next().unwrap_or_default();

        if host_port.is_empty() {
            return Err(Error::InvalidConfig("empty address".to_string()));
        }

        let mut config = Config::default();
        match host_port.split_once(':') {
            Some((host, port)) => {
                config.host = host.to_string();
                config.port = port
                    .parse()
                    .map_err(|_| Error::InvalidConfig(format!("invalid port number: {}", port)))?;
            }
            None => config.host = host_port.to_string(),
        }

        if config.host.is_empty() {
            return Err(Error::InvalidConfig("missing host".to_string()));
        }

        Ok(config)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hive2://{}:{}", self.host, self.port)
    }
}
