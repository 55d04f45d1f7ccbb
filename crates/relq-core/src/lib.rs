//! # relq-core
//!
//! Foundation types for the relq query layer. This crate has no engine
//! dependencies and provides the error taxonomy and logging setup used by
//! every other crate in the workspace.
//!
//! ## Modules
//!
//! - [`error`] - The [`QueryError`](error::QueryError) taxonomy and result alias
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;

// Re-export the most commonly used types at the crate root.
pub use error::{QueryError, QueryResult};
