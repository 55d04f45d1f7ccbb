//! SQLite storage collaborator for relq, backed by `rusqlite`.
//!
//! [`SqliteStorage`] implements the engine's [`Storage`] trait. All database
//! work runs inside `tokio::task::spawn_blocking` so the blocking `rusqlite`
//! connection never stalls the async runtime; an async `Mutex` serializes
//! access to the single connection.
//!
//! In-memory databases (`:memory:`) are supported and are what the
//! integration tests run against.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use relq_core::{QueryError, QueryResult};
use relq_db::plan::compiler::Dialect;
use relq_db::row::Row;
use relq_db::storage::Storage;
use relq_db::value::Value;

/// A SQLite-backed [`Storage`] implementation.
pub struct SqliteStorage {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteStorage {
    /// Opens a SQLite database at the given path.
    ///
    /// File-based databases get WAL journal mode; foreign key enforcement is
    /// switched on for all databases.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the database cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> QueryResult<Self> {
        let path = path.into();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| QueryError::Storage(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| QueryError::Storage(format!("failed to set pragmas: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the database cannot be created.
    pub fn memory() -> QueryResult<Self> {
        Self::open(":memory:")
    }

    /// Runs a batch of semicolon-separated statements. Intended for schema
    /// setup.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> QueryResult<()> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute_batch(&sql)
                .map_err(|e| QueryError::Storage(format!("{e}")))
        })
        .await
        .map_err(|e| QueryError::Storage(format!("task join error: {e}")))?
    }

    /// Binds engine [`Value`]s to a prepared statement.
    ///
    /// Dates and datetimes are stored as ISO-8601 text (with a `T`
    /// separator) so SQLite's `strftime` can read them back.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> QueryResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(
                    idx,
                    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string().as_str(),
                ),
                Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string().as_str()),
            }
            .map_err(|e| QueryError::Storage(format!("bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite` row into the engine's generic [`Row`].
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> Row {
        let values: Vec<Value> = (0..column_names.len())
            .map(|i| {
                let val_ref = sqlite_row
                    .get_ref(i)
                    .unwrap_or(rusqlite::types::ValueRef::Null);
                match val_ref {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                    rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                    rusqlite::types::ValueRef::Text(b) => {
                        Value::String(String::from_utf8_lossy(b).to_string())
                    }
                    rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                }
            })
            .collect();
        Row::new(column_names.to_vec(), values)
    }
}

#[async_trait::async_trait]
impl Storage for SqliteStorage {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QueryResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| QueryError::Storage(format!("{e}")))?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt
                .raw_execute()
                .map_err(|e| QueryError::Storage(format!("{e}")))?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| QueryError::Storage(format!("task join error: {e}")))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> QueryResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| QueryError::Storage(format!("{e}")))?;

            let column_names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows
                .next()
                .map_err(|e| QueryError::Storage(format!("{e}")))?
            {
                rows.push(Self::convert_row(row, &column_names));
            }
            Ok(rows)
        })
        .await
        .map_err(|e| QueryError::Storage(format!("task join error: {e}")))?
    }
}
