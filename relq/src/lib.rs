//! # relq
//!
//! A minimal embeddable relational query layer.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `relq` for the whole layer, or on the individual
//! crates for finer-grained control.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relq::db::{Planner, Predicate, Schema};
//! use relq::sqlite::SqliteStorage;
//!
//! # use relq::core::QueryResult;
//! # use relq::db::{Record, Row, Value};
//! # #[derive(Debug)]
//! # struct Book { id: Option<i64>, name: String }
//! # impl Record for Book {
//! #     const ENTITY: &'static str = "book";
//! #     fn from_row(row: &Row) -> QueryResult<Self> {
//! #         Ok(Self { id: row.get("id")?, name: row.get("name")? })
//! #     }
//! #     fn insert_values(&self) -> Vec<(&'static str, Value)> {
//! #         vec![("name", Value::from(self.name.clone()))]
//! #     }
//! #     fn set_pk(&mut self, pk: Value) { self.id = pk.as_int(); }
//! # }
//! # fn make_schema() -> Schema { Schema::new(vec![]) }
//! # async fn demo() -> QueryResult<()> {
//! let schema = Arc::new(make_schema());
//! let storage = Arc::new(SqliteStorage::memory()?);
//! let planner = Planner::new(Arc::clone(&schema), storage);
//!
//! let dune = planner
//!     .query::<Book>()
//!     .filter(Predicate::eq(&schema, "book", "name", "Dune")?)
//!     .get()
//!     .await?;
//! # let _ = dune; Ok(())
//! # }
//! ```

/// Error taxonomy and logging setup.
pub use relq_core as core;

/// The engine: schema metadata, predicate algebra, planner, gateway.
pub use relq_db as db;

/// SQLite storage collaborator.
#[cfg(feature = "sqlite")]
pub use relq_sqlite as sqlite;

// Third-party re-exports so callers share the layer's versions.
pub use async_trait;
pub use chrono;
pub use tokio;
pub use tracing;

/// The types most callers need.
pub mod prelude {
    pub use relq_core::{QueryError, QueryResult};
    pub use relq_db::{
        AggregateCmp, AggregateOp, DistinctKey, Gateway, GroupKey, OrderBy, Planner, Predicate,
        Projection, QuerySpec, RawQuery, Record, Row, Schema, Storage, Value, Which,
    };
    #[cfg(feature = "sqlite")]
    pub use relq_sqlite::SqliteStorage;
}
