//! The storage collaborator trait.
//!
//! The engine generates parameterized SQL and hands it to a [`Storage`]
//! implementation; it never talks to a driver directly. Implementations
//! declare which [`Dialect`] they speak so the compiler can pick placeholder
//! style and dialect-specific expressions up front.

use async_trait::async_trait;
use relq_core::QueryResult;

use crate::plan::compiler::Dialect;
use crate::row::Row;
use crate::value::Value;

/// An async database connection the engine can run statements against.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The SQL dialect this storage speaks.
    fn dialect(&self) -> Dialect;

    /// Runs a statement that returns no rows, yielding the affected count.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the statement fails.
    async fn execute(&self, sql: &str, params: &[Value]) -> QueryResult<u64>;

    /// Runs a statement and returns its result rows.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the statement fails.
    async fn query(&self, sql: &str, params: &[Value]) -> QueryResult<Vec<Row>>;
}
