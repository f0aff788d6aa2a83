//! # Database
//!
//! Connection pools over SQLx for SQLite and PostgreSQL, plus creation of
//! the SQLite database file used by `app:database`.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

fn query_error(e: &sqlx::Error) -> Error {
    Error::Database {
        message: format!("Query error: {e}"),
    }
}

/// Database connection pool supporting multiple backends
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// SQLite connection pool
    Sqlite(SqlitePool),
    /// PostgreSQL connection pool
    Postgres(PgPool),
}

impl DatabasePool {
    /// Connect using the configured driver
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unsupported driver or a missing
    /// PostgreSQL URL, `Error::Database` if the connection fails
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = Some(config.max_connections);
        match config.driver.as_str() {
            "sqlite" => {
                let url = format!("sqlite:{}", config.sqlite_path.display());
                Self::connect_sqlite(&url, pool_size).await
            }
            "postgres" | "pgsql" => {
                let url = config.postgres_url.as_deref().ok_or_else(|| Error::Config {
                    message: "database.postgres_url is required for the postgres driver"
                        .to_string(),
                })?;
                Self::connect_postgres(url, pool_size).await
            }
            other => Err(Error::Config {
                message: format!("Unsupported database driver: {other}"),
            }),
        }
    }

    /// Connect to a SQLite database
    ///
    /// ```ignore
    /// let pool = DatabasePool::connect_sqlite("sqlite::memory:", None).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the connection fails
    pub async fn connect_sqlite(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.unwrap_or(5))
            .connect(url)
            .await
            .map_err(|e| Error::Database {
                message: format!("SQLite connection failed: {e}"),
            })?;

        Ok(Self::Sqlite(pool))
    }

    /// Connect to a PostgreSQL database
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the connection fails
    pub async fn connect_postgres(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.unwrap_or(5))
            .connect(url)
            .await
            .map_err(|e| Error::Database {
                message: format!("PostgreSQL connection failed: {e}"),
            })?;

        Ok(Self::Postgres(pool))
    }

    /// Create an empty SQLite database file, including parent directories
    ///
    /// An existing file is left as it is.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a directory cannot be created and
    /// `Error::Database` if SQLite cannot open the file
    pub async fn create_sqlite_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| Error::Database {
                message: format!("Cannot create {}: {e}", path.display()),
            })?;
        conn.close().await.map_err(|e| query_error(&e))?;

        info!(path = %path.display(), "SQLite database ready");
        Ok(())
    }

    /// Execute a statement that returns no rows
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the statement fails
    pub async fn execute(&self, query: &str) -> Result<u64> {
        let affected = match self {
            Self::Sqlite(pool) => sqlx::query(query)
                .execute(pool)
                .await
                .map_err(|e| query_error(&e))?
                .rows_affected(),
            Self::Postgres(pool) => sqlx::query(query)
                .execute(pool)
                .await
                .map_err(|e| query_error(&e))?
                .rows_affected(),
        };
        Ok(affected)
    }

    /// Fetch all rows as column-name maps
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails
    pub async fn fetch_all(&self, query: &str) -> Result<Vec<HashMap<String, DbValue>>> {
        match self {
            Self::Sqlite(pool) => {
                let rows: Vec<SqliteRow> = sqlx::query(query)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| query_error(&e))?;
                Ok(rows.iter().map(sqlite_row_to_map).collect())
            }
            Self::Postgres(pool) => {
                let rows: Vec<PgRow> = sqlx::query(query)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| query_error(&e))?;
                Ok(rows.iter().map(pg_row_to_map).collect())
            }
        }
    }

    /// Close the pool
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DbValue {
    /// SQL NULL
    Null,
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    String(String),
    /// Boolean
    Bool(bool),
    /// Binary data
    Bytes(Vec<u8>),
}

/// Decode column `i` as `Option<T>`; SQL NULL and undecodable values map to `Null`
fn decode<'r, R, T>(row: &'r R, i: usize, wrap: impl FnOnce(T) -> DbValue) -> DbValue
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    T: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    row.try_get::<Option<T>, _>(i)
        .ok()
        .flatten()
        .map_or(DbValue::Null, wrap)
}

fn sqlite_row_to_map(row: &SqliteRow) -> HashMap<String, DbValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = match column.type_info().name() {
                "INTEGER" => decode(row, i, DbValue::Int),
                "REAL" => decode(row, i, DbValue::Float),
                "BLOB" => decode(row, i, DbValue::Bytes),
                _ => decode(row, i, DbValue::String),
            };
            (column.name().to_string(), value)
        })
        .collect()
}

fn pg_row_to_map(row: &PgRow) -> HashMap<String, DbValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = match column.type_info().name() {
                "INT8" => decode(row, i, DbValue::Int),
                "INT4" => decode(row, i, |v: i32| DbValue::Int(v.into())),
                "INT2" => decode(row, i, |v: i16| DbValue::Int(v.into())),
                "FLOAT8" => decode(row, i, DbValue::Float),
                "FLOAT4" => decode(row, i, |v: f32| DbValue::Float(v.into())),
                "BOOL" => decode(row, i, DbValue::Bool),
                "BYTEA" => decode(row, i, DbValue::Bytes),
                _ => decode(row, i, DbValue::String),
            };
            (column.name().to_string(), value)
        })
        .collect()
}
