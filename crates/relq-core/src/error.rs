//! Error types for the relq query layer.
//!
//! Every fallible call in the engine returns [`QueryError`]. Each variant
//! carries enough context (entity name, offending path or field) to diagnose
//! a failure without inspecting the generated SQL. The engine never retries
//! or swallows an error; retries are a caller concern.

use thiserror::Error;

/// A convenience alias used throughout the workspace.
pub type QueryResult<T> = Result<T, QueryError>;

/// The error taxonomy of the query layer.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A predicate could not be built: the field path does not resolve
    /// through the schema's relationship graph, a range has low > high, or
    /// the compared values have incompatible types.
    #[error("invalid predicate on {entity}.{path}: {reason}")]
    InvalidPredicate {
        /// The entity the predicate was built against.
        entity: String,
        /// The dotted field path as given by the caller.
        path: String,
        /// Why the predicate was rejected.
        reason: String,
    },

    /// `earliest`/`latest` was requested but no ordering field was given and
    /// the entity declares no default.
    #[error("{entity}: earliest/latest requires an ordering field")]
    MissingOrderingField {
        /// The entity being fetched.
        entity: String,
    },

    /// A required single-row fetch matched no rows.
    #[error("{entity} matching query does not exist")]
    NotFound {
        /// The entity being fetched.
        entity: String,
    },

    /// A single-row fetch matched more than one row.
    #[error("get returned more than one {entity} -- it returned {count}")]
    MultipleRows {
        /// The entity being fetched.
        entity: String,
        /// How many rows actually matched.
        count: usize,
    },

    /// A grouped aggregation referenced a grouping key that does not exist
    /// in the schema. An empty group list is not an error.
    #[error("aggregation over {entity} grouped by unknown key {group}")]
    AggregationOnEmptySet {
        /// The entity being aggregated.
        entity: String,
        /// The grouping key that failed to resolve.
        group: String,
    },

    /// A raw statement failed inside the storage collaborator. The cause is
    /// surfaced unmodified.
    #[error("raw statement failed: {statement}: {source}")]
    RawExecution {
        /// The statement text as submitted by the caller.
        statement: String,
        /// The storage collaborator's failure.
        #[source]
        source: Box<QueryError>,
    },

    /// A failure reported by the storage collaborator (connection, bind,
    /// constraint, or row-conversion errors).
    #[error("storage error: {0}")]
    Storage(String),
}

impl QueryError {
    /// Builds an [`QueryError::InvalidPredicate`] with owned context.
    pub fn invalid_predicate(
        entity: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPredicate {
            entity: entity.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`QueryError::NotFound`] for the given entity.
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// Wraps a storage failure as a raw-execution error, preserving the
    /// statement text for diagnosis.
    pub fn raw(statement: impl Into<String>, source: Self) -> Self {
        Self::RawExecution {
            statement: statement.into(),
            source: Box::new(source),
        }
    }
}
