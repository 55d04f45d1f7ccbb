//! Atomic write operations.
//!
//! The gateway owns the two write paths with correctness contracts:
//! `get_or_create` must create at most one row under concurrent callers,
//! and `bulk_create` must insert all records in one round trip.
//!
//! `get_or_create` never checks before inserting. It issues
//! `INSERT ... ON CONFLICT (unique cols) DO NOTHING` first and selects by
//! the unique fields afterwards, so two racing callers both land on the
//! same row and exactly one of them observes `created = true`. This
//! requires a uniqueness constraint on the unique columns.

use std::sync::Arc;

use tracing::debug;

use relq_core::{QueryError, QueryResult};

use crate::plan::compiler::SqlCompiler;
use crate::record::Record;
use crate::schema::Schema;
use crate::storage::Storage;
use crate::value::Value;

/// The entry point for writes.
#[derive(Clone)]
pub struct Gateway {
    schema: Arc<Schema>,
    storage: Arc<dyn Storage>,
}

impl Gateway {
    /// Creates a gateway over the given schema and storage.
    pub fn new(schema: Arc<Schema>, storage: Arc<dyn Storage>) -> Self {
        Self { schema, storage }
    }

    fn compiler(&self) -> SqlCompiler<'_> {
        SqlCompiler::new(&self.schema, self.storage.dialect())
    }

    /// Fetches the row matching `unique`, inserting it first if absent.
    ///
    /// Inserted rows carry the `unique` values plus `defaults`. Returns the
    /// row and whether this call created it. Two round trips: the
    /// conflict-skipping insert, then the select.
    ///
    /// # Errors
    ///
    /// `NotFound` when the row is missing even after the insert (the unique
    /// columns lack a uniqueness constraint, or a concurrent delete won);
    /// storage errors otherwise.
    pub async fn get_or_create<R: Record>(
        &self,
        unique: &[(&str, Value)],
        defaults: &[(&str, Value)],
    ) -> QueryResult<(R, bool)> {
        let mut columns: Vec<&str> = Vec::with_capacity(unique.len() + defaults.len());
        let mut values = Vec::with_capacity(unique.len() + defaults.len());
        for (col, value) in unique.iter().chain(defaults.iter()) {
            columns.push(*col);
            values.push(value.clone());
        }
        let unique_columns: Vec<&str> = unique.iter().map(|(col, _)| *col).collect();

        let (sql, params) =
            self.compiler()
                .insert_skip_conflict(R::ENTITY, &columns, values, &unique_columns)?;
        debug!(entity = R::ENTITY, %sql, "inserting if absent");
        let created = self.storage.execute(&sql, &params).await? > 0;

        let (sql, params) = self.compiler().select_by_columns(R::ENTITY, unique)?;
        debug!(entity = R::ENTITY, %sql, created, "selecting by unique fields");
        let rows = self.storage.query(&sql, &params).await?;
        match rows.first() {
            Some(row) => Ok((R::from_row(row)?, created)),
            None => Err(QueryError::not_found(R::ENTITY)),
        }
    }

    /// Inserts all records in one multi-row statement and fills in their
    /// database-assigned primary keys.
    ///
    /// All-or-nothing behavior is the statement-level atomicity of the
    /// storage collaborator: a violation anywhere fails the whole insert.
    ///
    /// # Errors
    ///
    /// Storage errors, or a `Storage` error when the backend returns a
    /// different number of keys than records inserted.
    pub async fn bulk_create<R: Record>(&self, mut records: Vec<R>) -> QueryResult<Vec<R>> {
        if records.is_empty() {
            return Ok(records);
        }
        let columns: Vec<&'static str> = records[0]
            .insert_values()
            .into_iter()
            .map(|(col, _)| col)
            .collect();
        let rows: Vec<Vec<Value>> = records
            .iter()
            .map(|record| {
                record
                    .insert_values()
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect()
            })
            .collect();

        let (sql, params) = self.compiler().bulk_insert(R::ENTITY, &columns, rows)?;
        debug!(entity = R::ENTITY, count = records.len(), %sql, "bulk inserting");
        let returned = self.storage.query(&sql, &params).await?;
        if returned.len() != records.len() {
            return Err(QueryError::Storage(format!(
                "bulk insert into {} returned {} keys for {} records",
                R::ENTITY,
                returned.len(),
                records.len(),
            )));
        }
        for (record, row) in records.iter_mut().zip(&returned) {
            record.set_pk(row.get_by_index(0)?);
        }
        Ok(records)
    }
}
