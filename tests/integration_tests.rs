//! Integration tests for hive-rs against a real HiveServer2
//!
//! These tests require a running HiveServer2 instance. Set the following environment variables:
//! - HIVE_HOST: HiveServer2 host (default: localhost)
//! - HIVE_PORT: HiveServer2 port (default: 10000)
//! - HIVE_USER: username (default: anonymous)
//! - HIVE_PASSWORD: password (default: empty)
//! - HIVE_AUTH: `nosasl` or `plain` (default: plain)
//! - HIVE_TABLE: `schema.table` to read in the table tests (default: none, those tests return early)
//!
//! Run with: cargo test --test integration_tests -- --ignored

use hive_rs::{AuthMode, Config, Connection, Error};

/// Get test configuration from environment or use defaults
fn get_test_config() -> Config {
    let host = std::env::var("HIVE_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port: u16 = std::env::var("HIVE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(10000);
    let username = std::env::var("HIVE_USER").unwrap_or_else(|_| "anonymous".to_string());
    let password = std::env::var("HIVE_PASSWORD").unwrap_or_default();
    let auth: AuthMode = std::env::var("HIVE_AUTH")
        .ok()
        .and_then(|a| a.parse().ok())
        .unwrap_or(AuthMode::Plain);

    Config::new(host, port)
        .credentials(username, password)
        .auth(auth)
}

/// `HIVE_TABLE` split into schema and table
fn test_table() -> Option<(String, String)> {
    let qualified = std::env::var("HIVE_TABLE").ok()?;
    let (schema, table) = qualified.split_once('.')?;
    Some((schema.to_string(), table.to_string()))
}

/// Helper to connect using test configuration
async fn connect() -> Result<Connection, Error> {
    Connection::open(get_test_config()).await
}

mod session_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_connect_and_disconnect() {
        let mut conn = connect().await.expect("Failed to connect");
        assert!(conn.is_connected());
        assert!(conn.server_protocol_version().is_some());

        conn.disconnect().await.expect("Failed to disconnect");
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_wrong_password_rejected() {
        let config = get_test_config();
        if config.auth_mode != AuthMode::Plain {
            return;
        }
        let config = config.credentials("no_such_user", "definitely wrong");
        // Servers configured with NONE authentication accept any credentials
        match Connection::open(config).await {
            Ok(mut conn) => conn.disconnect().await.expect("Failed to disconnect"),
            Err(e) => assert!(e.is_auth_error() || e.is_connection_error(), "{}", e),
        }
    }

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_invalid_statement_reports_server_error() {
        let mut conn = connect().await.expect("Failed to connect");

        let err = conn
            .execute_statement("SELECT * FROM table_that_does_not_exist_4c1b")
            .await
            .unwrap_err();
        assert!(err.is_server_error(), "unexpected error: {}", err);

        // The session survives a failed statement
        conn.execute_select("SELECT 1").await.expect("Session unusable");
        conn.disconnect().await.expect("Failed to disconnect");
    }
}

mod catalog_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_list_schemas_includes_default() {
        let mut conn = connect().await.expect("Failed to connect");

        let schemas = conn.list_schemas().await.expect("Failed to list schemas");
        assert!(schemas.iter().any(|s| s == "default"), "{:?}", schemas);

        conn.disconnect().await.expect("Failed to disconnect");
    }

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_list_tables_and_columns() {
        let Some((schema, table)) = test_table() else {
            return;
        };
        let mut conn = connect().await.expect("Failed to connect");

        let tables = conn.list_tables(&schema).await.expect("Failed to list tables");
        assert!(tables.contains(&table), "{} not in {:?}", table, tables);

        let columns = conn
            .list_columns(&schema, &table)
            .await
            .expect("Failed to list columns");
        assert_eq!(
            columns.columns,
            vec!["TABLE_SCHEM", "TABLE_NAME", "COLUMN_NAME", "TYPE_NAME", "IS_NULLABLE"]
        );
        assert!(!columns.is_empty());

        conn.disconnect().await.expect("Failed to disconnect");
    }
}

mod query_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_select_literals() {
        let mut conn = connect().await.expect("Failed to connect");

        let table = conn
            .execute_select("SELECT 1 AS one, 'two' AS two, CAST(NULL AS INT) AS three")
            .await
            .expect("Query failed");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get_i64(0), Some(1));
        assert_eq!(table.rows[0].get_string(1), Some("two"));
        assert!(table.rows[0].is_null(2));

        conn.disconnect().await.expect("Failed to disconnect");
    }

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_set_statement_has_no_rows() {
        let mut conn = connect().await.expect("Failed to connect");

        let table = conn
            .execute_statement("SET hive.exec.dynamic.partition=true")
            .await
            .expect("SET failed");
        // Some server versions return the effective setting as a row
        assert!(table.len() <= 1);

        conn.disconnect().await.expect("Failed to disconnect");
    }

    #[tokio::test]
    #[ignore = "requires HiveServer2"]
    async fn test_table_records_and_ddl() {
        let Some((schema, table)) = test_table() else {
            return;
        };
        let mut conn = connect().await.expect("Failed to connect");

        let records = conn
            .get_table_records(&schema, &table)
            .await
            .expect("Failed to read table");
        assert!(records.len() <= conn.config().row_page_size as usize);

        let ddl = conn
            .show_create_table(&schema, &table)
            .await
            .expect("Failed to get DDL");
        assert!(ddl.to_uppercase().contains("CREATE"), "{}", ddl);

        conn.disconnect().await.expect("Failed to disconnect");
    }
}
