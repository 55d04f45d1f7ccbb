//! The composable filter algebra.
//!
//! A [`Predicate`] is an immutable tree of comparison leaves combined with
//! `&` (AND), `|` (OR), and `!` (NOT). Leaves are validated against the
//! [`Schema`] at construction: unknown paths, malformed ranges, and
//! type-incompatible comparisons are rejected before any SQL exists.
//!
//! Negation is kept symbolic. `!!p` simplifies back to `p`, and the compiler
//! renders `NOT (...)` around the inner condition, so a doubly negated
//! predicate selects exactly the rows the original does.

use std::ops::{BitAnd, BitOr, Not};

use relq_core::{QueryError, QueryResult};

use crate::schema::{FieldKind, FieldPath, Schema};
use crate::value::Value;

/// A single comparison against a resolved field path.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// The resolved field path the comparison applies to.
    pub path: FieldPath,
    /// The comparison operator and its operand(s).
    pub op: CompareOp,
}

/// A comparison operator with its operand(s).
#[derive(Debug, Clone)]
pub enum CompareOp {
    /// Equal. `Value::Null` compiles to `IS NULL`.
    Eq(Value),
    /// Not equal. `Value::Null` compiles to `IS NOT NULL`.
    Neq(Value),
    /// Strictly greater than.
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Strictly less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
    /// Case-insensitive substring match on a text field.
    ContainsCi(String),
    /// Inclusive range, `lo <= field <= hi`.
    Range(Value, Value),
    /// Membership in a value list. An empty list matches no rows.
    In(Vec<Value>),
}

/// A composable filter condition.
///
/// # Examples
///
/// ```
/// use relq_db::{Predicate, Schema};
/// # fn demo(schema: &Schema) -> relq_core::QueryResult<()> {
/// let long_ago = chrono::NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
/// let p = Predicate::lt(schema, "author", "birth_day", long_ago)?
///     & !Predicate::contains_ci(schema, "author", "name", "anonymous")?;
/// # let _ = p; Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub enum Predicate {
    /// A single comparison.
    Leaf(Leaf),
    /// All children must hold. An empty conjunction matches every row.
    And(Vec<Predicate>),
    /// At least one child must hold. An empty disjunction matches no rows.
    Or(Vec<Predicate>),
    /// The child must not hold.
    Negate(Box<Predicate>),
}

impl Predicate {
    fn leaf(path: FieldPath, op: CompareOp) -> Self {
        Self::Leaf(Leaf { path, op })
    }

    /// Builds an equality comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn eq(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_typed(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Eq(value)))
    }

    /// Builds an inequality comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn neq(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_typed(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Neq(value)))
    }

    /// Builds a strictly-greater-than comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn gt(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_ordered(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Gt(value)))
    }

    /// Builds a greater-than-or-equal comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn gte(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_ordered(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Gte(value)))
    }

    /// Builds a strictly-less-than comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn lt(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_ordered(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Lt(value)))
    }

    /// Builds a less-than-or-equal comparison.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or the value's type does not
    /// match the field.
    pub fn lte(
        schema: &Schema,
        entity: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (path, value) = resolve_ordered(schema, entity, path, value.into())?;
        Ok(Self::leaf(path, CompareOp::Lte(value)))
    }

    /// Builds a case-insensitive substring match.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or does not end on a text field.
    pub fn contains_ci(
        schema: &Schema,
        entity: &str,
        path: &str,
        needle: impl Into<String>,
    ) -> QueryResult<Self> {
        let resolved = schema.resolve_path(entity, path)?;
        if resolved.kind != FieldKind::Text {
            return Err(QueryError::invalid_predicate(
                entity,
                path,
                "contains requires a text field",
            ));
        }
        Ok(Self::leaf(resolved, CompareOp::ContainsCi(needle.into())))
    }

    /// Builds an inclusive range comparison, `lo <= field <= hi`.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve, the bounds are of incomparable
    /// types, or `lo > hi`.
    pub fn range(
        schema: &Schema,
        entity: &str,
        path: &str,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> QueryResult<Self> {
        let (resolved, lo) = resolve_ordered(schema, entity, path, lo.into())?;
        let hi = hi.into();
        check_kind(&resolved, &hi).map_err(|reason| {
            QueryError::invalid_predicate(entity, path, reason)
        })?;
        match lo.compare(&hi) {
            Some(ord) if ord != std::cmp::Ordering::Greater => {
                Ok(Self::leaf(resolved, CompareOp::Range(lo, hi)))
            }
            Some(_) => Err(QueryError::invalid_predicate(
                entity,
                path,
                format!("range lower bound {lo} exceeds upper bound {hi}"),
            )),
            None => Err(QueryError::invalid_predicate(
                entity,
                path,
                "range bounds are of incomparable types",
            )),
        }
    }

    /// Builds a membership comparison. An empty list matches no rows.
    ///
    /// # Errors
    ///
    /// Fails when the path does not resolve or any value's type does not
    /// match the field.
    pub fn is_in<V: Into<Value>>(
        schema: &Schema,
        entity: &str,
        path: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QueryResult<Self> {
        let resolved = schema.resolve_path(entity, path)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        for v in &values {
            check_kind(&resolved, v)
                .map_err(|reason| QueryError::invalid_predicate(entity, path, reason))?;
        }
        Ok(Self::leaf(resolved, CompareOp::In(values)))
    }
}

/// Resolves a path and checks the operand's type against the field kind.
fn resolve_typed(
    schema: &Schema,
    entity: &str,
    path: &str,
    value: Value,
) -> QueryResult<(FieldPath, Value)> {
    let resolved = schema.resolve_path(entity, path)?;
    check_kind(&resolved, &value)
        .map_err(|reason| QueryError::invalid_predicate(entity, path, reason))?;
    Ok((resolved, value))
}

/// As [`resolve_typed`], additionally rejecting `Null` operands, which have
/// no defined ordering.
fn resolve_ordered(
    schema: &Schema,
    entity: &str,
    path: &str,
    value: Value,
) -> QueryResult<(FieldPath, Value)> {
    if value.is_null() {
        return Err(QueryError::invalid_predicate(
            entity,
            path,
            "NULL has no ordering; use eq/neq for NULL checks",
        ));
    }
    resolve_typed(schema, entity, path, value)
}

fn check_kind(path: &FieldPath, value: &Value) -> Result<(), String> {
    let ok = match value {
        Value::Null => true,
        Value::Bool(_) => path.kind == FieldKind::Boolean,
        Value::Int(_) => matches!(path.kind, FieldKind::Integer | FieldKind::Float),
        Value::Float(_) => path.kind == FieldKind::Float,
        Value::String(_) => path.kind == FieldKind::Text,
        Value::Bytes(_) => false,
        Value::Date(_) => path.kind == FieldKind::Date,
        Value::DateTime(_) => path.kind == FieldKind::DateTime,
        Value::Uuid(_) => path.kind == FieldKind::Uuid,
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "value {value:?} is incompatible with {:?} field '{}'",
            path.kind, path.raw
        ))
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    /// Combines two predicates with AND, flattening nested conjunctions.
    fn bitand(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl BitOr for Predicate {
    type Output = Self;

    /// Combines two predicates with OR, flattening nested disjunctions.
    fn bitor(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (other, Self::Or(mut right)) => {
                right.insert(0, other);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl Not for Predicate {
    type Output = Self;

    /// Negates the predicate. A double negation returns the original tree.
    fn not(self) -> Self {
        match self {
            Self::Negate(inner) => *inner,
            other => Self::Negate(Box::new(other)),
        }
    }
}
