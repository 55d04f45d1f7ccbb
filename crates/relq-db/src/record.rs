//! The [`Record`] trait maps entity rows to Rust structs.
//!
//! Implementations are plain hand-written mappings; the engine asks a record
//! type for its entity name, reconstructs instances from [`Row`]s, and asks
//! instances for their column values when inserting.

use crate::row::Row;
use crate::value::Value;
use relq_core::QueryResult;

/// A Rust type that maps to one schema entity.
pub trait Record: Sized + Send + Sync {
    /// The schema entity this type maps to.
    const ENTITY: &'static str;

    /// Reconstructs an instance from a database row.
    ///
    /// # Errors
    ///
    /// Returns an error when an expected column is missing or has an
    /// unconvertible value.
    fn from_row(row: &Row) -> QueryResult<Self>;

    /// Returns the insertable column/value pairs of this instance.
    ///
    /// The primary key is excluded; the database assigns it.
    fn insert_values(&self) -> Vec<(&'static str, Value)>;

    /// Records the database-assigned primary key after an insert.
    fn set_pk(&mut self, pk: Value);
}
