//! Raw SQL passthrough.
//!
//! [`RawQuery`] hands a statement to the storage collaborator verbatim: the
//! engine performs no validation or rewriting. Result rows can still be
//! mapped through a [`Record`] implementation. Failures surface as
//! `RawExecution` carrying the statement text and the unmodified cause.

use tracing::debug;

use relq_core::{QueryError, QueryResult};

use crate::record::Record;
use crate::row::Row;
use crate::storage::Storage;
use crate::value::Value;

/// A raw SQL statement with bound parameters.
#[derive(Debug, Clone)]
pub struct RawQuery {
    sql: String,
    params: Vec<Value>,
}

impl RawQuery {
    /// Wraps a statement. The text is taken as-is.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a positional parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Returns the statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the statement and maps each row through `R`.
    ///
    /// # Errors
    ///
    /// `RawExecution` wrapping the storage failure, or row-mapping errors.
    pub async fn fetch<R: Record>(&self, storage: &dyn Storage) -> QueryResult<Vec<R>> {
        let rows = self.fetch_rows(storage).await?;
        rows.iter().map(|row| R::from_row(row)).collect()
    }

    /// Runs the statement and returns the rows unmapped.
    ///
    /// # Errors
    ///
    /// `RawExecution` wrapping the storage failure.
    pub async fn fetch_rows(&self, storage: &dyn Storage) -> QueryResult<Vec<Row>> {
        debug!(sql = %self.sql, "running raw query");
        storage
            .query(&self.sql, &self.params)
            .await
            .map_err(|source| QueryError::raw(&self.sql, source))
    }

    /// Runs a non-returning statement, yielding the affected-row count.
    ///
    /// # Errors
    ///
    /// `RawExecution` wrapping the storage failure.
    pub async fn execute(&self, storage: &dyn Storage) -> QueryResult<u64> {
        debug!(sql = %self.sql, "running raw statement");
        storage
            .execute(&self.sql, &self.params)
            .await
            .map_err(|source| QueryError::raw(&self.sql, source))
    }
}
