//! The row exchange type.
//!
//! [`Row`] is how storage collaborators hand result data back to the engine:
//! a list of column names and their values, with typed access through the
//! [`FromValue`] trait.

use crate::value::Value;
use relq_core::{QueryError, QueryResult};

/// A generic database row.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> QueryResult<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| QueryError::Storage(format!("column '{column}' not found in row")))?;
        T::from_value(&self.values[idx])
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> QueryResult<T> {
        if idx >= self.values.len() {
            return Err(QueryError::Storage(format!(
                "column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            )));
        }
        T::from_value(&self.values[idx])
    }

    /// Returns a reference to the raw value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> QueryResult<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(QueryError::Storage(format!("expected Int, got {value:?}"))),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(QueryError::Storage(format!(
                "expected Float, got {value:?}"
            ))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            // SQLite stores booleans as integers.
            Value::Int(i) => Ok(*i != 0),
            _ => Err(QueryError::Storage(format!("expected Bool, got {value:?}"))),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(QueryError::Storage(format!(
                "expected String, got {value:?}"
            ))),
        }
    }
}

impl FromValue for chrono::NaiveDate {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            // Storage collaborators without a native date type return text.
            Value::String(s) => s
                .parse()
                .map_err(|e| QueryError::Storage(format!("bad date '{s}': {e}"))),
            _ => Err(QueryError::Storage(format!("expected Date, got {value:?}"))),
        }
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => s
                .parse()
                .map_err(|e| QueryError::Storage(format!("bad datetime '{s}': {e}"))),
            _ => Err(QueryError::Storage(format!(
                "expected DateTime, got {value:?}"
            ))),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => s
                .parse()
                .map_err(|e| QueryError::Storage(format!("bad uuid '{s}': {e}"))),
            _ => Err(QueryError::Storage(format!("expected Uuid, got {value:?}"))),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> QueryResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}
