//! Lazy query building and execution.
//!
//! A [`QuerySpec`] accumulates directives through consuming builder methods
//! without touching the database. Terminal methods compile the spec into one
//! parameterized statement for the storage collaborator's dialect and run
//! it. [`LazyRows`] holds a compiled statement and re-executes it on every
//! `fetch`, so a query handle observes writes made between iterations.

pub mod compiler;

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use relq_core::{QueryError, QueryResult};

use crate::predicate::Predicate;
use crate::record::Record;
use crate::row::Row;
use crate::schema::Schema;
use crate::storage::Storage;
use crate::value::Value;

use compiler::SqlCompiler;

/// An ordering directive. The target is a local field or an annotation
/// alias.
#[derive(Debug, Clone)]
pub struct OrderBy {
    /// The field path or annotation alias to order by.
    pub target: String,
    /// Descending when `true`.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on the given target.
    pub fn asc(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            descending: false,
        }
    }

    /// Descending order on the given target.
    pub fn desc(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            descending: true,
        }
    }
}

/// Which single row a [`QuerySpec::fetch_one`] call selects.
#[derive(Debug, Clone)]
pub enum Which {
    /// The first row under the spec's ordering (primary key order when the
    /// spec has none).
    First,
    /// The last row under the spec's ordering, selected by reversing it.
    Last,
    /// The row with the smallest value of the given field, or of the
    /// entity's default ordering field when `None`.
    Earliest(Option<String>),
    /// The row with the largest value of the given field, or of the
    /// entity's default ordering field when `None`.
    Latest(Option<String>),
}

/// Which columns a row-returning query selects.
#[derive(Debug, Clone, Default)]
pub enum Projection {
    /// All entity columns.
    #[default]
    All,
    /// Only the named fields (plus the primary key). Entries may traverse
    /// to-one relations (`"publisher.name"`), fetched through a LEFT JOIN.
    Only(Vec<String>),
    /// All entity columns except the named ones (the primary key is always
    /// kept).
    Except(Vec<String>),
}

/// The deduplication key for [`QuerySpec::distinct_by`].
#[derive(Debug, Clone)]
pub enum DistinctKey {
    /// One row per distinct value of a local field.
    Field(String),
    /// One row per distinct calendar year of a local date field.
    Year(String),
}

/// The grouping key for [`QuerySpec::aggregate_by`].
#[derive(Debug, Clone)]
pub enum GroupKey {
    /// Group by a local field.
    Field(String),
    /// Group by the calendar year of a local date field.
    Year(String),
}

/// An aggregate function.
#[derive(Debug, Clone)]
pub enum AggregateOp {
    /// Row count.
    Count,
    /// Sum of a field. Over zero rows this is SQL NULL, surfaced as
    /// [`Value::Null`].
    Sum(String),
}

/// The comparison applied to an annotation by
/// [`QuerySpec::filter_annotation`].
#[derive(Debug, Clone, Copy)]
pub enum AggregateCmp {
    /// Equal.
    Eq,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl AggregateCmp {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A named relation aggregate attached to each result row.
#[derive(Debug, Clone)]
pub(crate) struct Annotation {
    pub(crate) alias: String,
    pub(crate) op: AggregateOp,
    pub(crate) path: String,
}

/// A comparison against an annotation, applied in the WHERE clause.
#[derive(Debug, Clone)]
pub(crate) struct AnnotationFilter {
    pub(crate) alias: String,
    pub(crate) cmp: AggregateCmp,
    pub(crate) value: Value,
}

/// The entry point for reads: hands out [`QuerySpec`]s bound to a schema
/// and a storage collaborator.
#[derive(Clone)]
pub struct Planner {
    schema: Arc<Schema>,
    storage: Arc<dyn Storage>,
}

impl Planner {
    /// Creates a planner over the given schema and storage.
    pub fn new(schema: Arc<Schema>, storage: Arc<dyn Storage>) -> Self {
        Self { schema, storage }
    }

    /// Returns the schema this planner resolves against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Starts an empty query for a record type.
    pub fn query<R: Record>(&self) -> QuerySpec<R> {
        QuerySpec {
            schema: Arc::clone(&self.schema),
            storage: Arc::clone(&self.storage),
            entity: R::ENTITY,
            predicate: None,
            order: Vec::new(),
            projection: Projection::All,
            distinct: None,
            annotations: Vec::new(),
            annotation_filters: Vec::new(),
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }
}

/// A lazy, composable query over one entity.
///
/// Builder methods consume and return the spec; nothing runs until a
/// terminal method is called.
pub struct QuerySpec<R: Record> {
    pub(crate) schema: Arc<Schema>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) entity: &'static str,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) order: Vec<OrderBy>,
    pub(crate) projection: Projection,
    pub(crate) distinct: Option<DistinctKey>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) annotation_filters: Vec<AnnotationFilter>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for QuerySpec<R> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            storage: Arc::clone(&self.storage),
            entity: self.entity,
            predicate: self.predicate.clone(),
            order: self.order.clone(),
            projection: self.projection.clone(),
            distinct: self.distinct.clone(),
            annotations: self.annotations.clone(),
            annotation_filters: self.annotation_filters.clone(),
            limit: self.limit,
            offset: self.offset,
            _marker: PhantomData,
        }
    }
}

impl<R: Record> QuerySpec<R> {
    // ── builder methods ────────────────────────────────────────────────

    /// Narrows the query with a predicate, ANDed with any existing filter.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing & predicate,
            None => predicate,
        });
        self
    }

    /// Removes rows matching the predicate. Sugar for `filter(!predicate)`.
    #[must_use]
    pub fn exclude(self, predicate: Predicate) -> Self {
        self.filter(!predicate)
    }

    /// Appends an ordering directive.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Keeps at most one row per distinct key value. Within each group the
    /// row with the lowest primary key survives.
    #[must_use]
    pub fn distinct_by(mut self, key: DistinctKey) -> Self {
        self.distinct = Some(key);
        self
    }

    /// Restricts which columns row-returning queries select.
    #[must_use]
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Attaches a count of a to-many relation to each row under `alias`.
    #[must_use]
    pub fn annotate_count(mut self, relation: impl Into<String>, alias: impl Into<String>) -> Self {
        self.annotations.push(Annotation {
            alias: alias.into(),
            op: AggregateOp::Count,
            path: relation.into(),
        });
        self
    }

    /// Attaches a sum over a to-many relation's field to each row under
    /// `alias`. The path takes the form `"relation.field"`.
    #[must_use]
    pub fn annotate_sum(mut self, path: impl Into<String>, alias: impl Into<String>) -> Self {
        let path = path.into();
        self.annotations.push(Annotation {
            alias: alias.into(),
            op: AggregateOp::Sum(path.clone()),
            path,
        });
        self
    }

    /// Keeps only rows whose annotation satisfies the comparison.
    #[must_use]
    pub fn filter_annotation(
        mut self,
        alias: impl Into<String>,
        cmp: AggregateCmp,
        value: impl Into<Value>,
    ) -> Self {
        self.annotation_filters.push(AnnotationFilter {
            alias: alias.into(),
            cmp,
            value: value.into(),
        });
        self
    }

    // ── SQL inspection ─────────────────────────────────────────────────

    fn compiler(&self) -> SqlCompiler<'_> {
        SqlCompiler::new(&self.schema, self.storage.dialect())
    }

    /// Compiles the row-returning statement without executing it.
    ///
    /// # Errors
    ///
    /// Fails when a directive references something the schema does not
    /// define.
    pub fn select_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        self.compiler().select(self)
    }

    /// Compiles the count statement without executing it.
    ///
    /// # Errors
    ///
    /// Fails when the filter references something the schema does not
    /// define.
    pub fn count_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        self.compiler().count(self)
    }

    /// Compiles the existence probe without executing it.
    ///
    /// # Errors
    ///
    /// Fails when the filter references something the schema does not
    /// define.
    pub fn exists_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        self.compiler().exists(self)
    }

    // ── terminal operations ────────────────────────────────────────────

    /// Counts matching rows. Zero on an empty set, never an error.
    ///
    /// # Errors
    ///
    /// Fails on compilation or storage errors.
    pub async fn count(&self) -> QueryResult<i64> {
        let (sql, params) = self.count_sql()?;
        debug!(entity = self.entity, %sql, "counting rows");
        let rows = self.storage.query(&sql, &params).await?;
        rows.first().map_or(Ok(0), |row| row.get_by_index(0))
    }

    /// Reports whether any row matches.
    ///
    /// # Errors
    ///
    /// Fails on compilation or storage errors.
    pub async fn exists(&self) -> QueryResult<bool> {
        let (sql, params) = self.exists_sql()?;
        debug!(entity = self.entity, %sql, "probing existence");
        let rows = self.storage.query(&sql, &params).await?;
        rows.first().map_or(Ok(false), |row| row.get_by_index(0))
    }

    /// Compiles the query into a restartable row producer.
    ///
    /// # Errors
    ///
    /// Fails when a directive references something the schema does not
    /// define.
    pub fn rows(&self) -> QueryResult<LazyRows<R>> {
        let (sql, params) = self.select_sql()?;
        Ok(LazyRows {
            sql,
            params,
            storage: Arc::clone(&self.storage),
            _marker: PhantomData,
        })
    }

    /// Fetches all matching records in one round trip.
    ///
    /// # Errors
    ///
    /// Fails on compilation, storage, or row-mapping errors.
    pub async fn fetch_all(&self) -> QueryResult<Vec<R>> {
        self.rows()?.fetch().await
    }

    /// Fetches all matching rows without mapping them to records. Useful
    /// with a narrowing [`Projection`].
    ///
    /// # Errors
    ///
    /// Fails on compilation or storage errors.
    pub async fn fetch_rows(&self) -> QueryResult<Vec<Row>> {
        let (sql, params) = self.select_sql()?;
        debug!(entity = self.entity, %sql, "fetching rows");
        self.storage.query(&sql, &params).await
    }

    /// Fetches a single row selected by `which`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row matches; `MissingOrderingField` when
    /// earliest/latest has no field to order by.
    pub async fn fetch_one(&self, which: Which) -> QueryResult<R> {
        let order = self.ordering_for(&which)?;
        let mut narrowed = self.clone();
        narrowed.order = order;
        narrowed.limit = Some(1);
        let (sql, params) = narrowed.select_sql()?;
        debug!(entity = self.entity, %sql, "fetching one row");
        let rows = self.storage.query(&sql, &params).await?;
        match rows.first() {
            Some(row) => R::from_row(row),
            None => Err(QueryError::not_found(self.entity)),
        }
    }

    /// Fetches the unique matching row.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row matches; `MultipleRows` when more than one
    /// does.
    pub async fn get(&self) -> QueryResult<R> {
        let mut narrowed = self.clone();
        // Two rows are enough to prove non-uniqueness.
        narrowed.limit = Some(2);
        let (sql, params) = narrowed.select_sql()?;
        debug!(entity = self.entity, %sql, "fetching unique row");
        let rows = self.storage.query(&sql, &params).await?;
        match rows.len() {
            0 => Err(QueryError::not_found(self.entity)),
            1 => R::from_row(&rows[0]),
            n => Err(QueryError::MultipleRows {
                entity: self.entity.to_string(),
                count: n,
            }),
        }
    }

    /// Computes one aggregate over the filtered set.
    ///
    /// `Sum` over zero rows yields [`Value::Null`], mirroring SQL.
    ///
    /// # Errors
    ///
    /// Fails on compilation or storage errors.
    pub async fn aggregate(&self, op: AggregateOp) -> QueryResult<Value> {
        let (sql, params) = self.compiler().aggregate(self, &op)?;
        debug!(entity = self.entity, %sql, "aggregating");
        let rows = self.storage.query(&sql, &params).await?;
        rows.first().map_or(Ok(Value::Null), |row| row.get_by_index(0))
    }

    /// Computes one aggregate per group, returned as `(group key, value)`
    /// pairs in group-key order. An empty filtered set yields an empty
    /// list, not an error.
    ///
    /// # Errors
    ///
    /// `AggregationOnEmptySet` when the group key does not resolve.
    pub async fn aggregate_by(
        &self,
        op: AggregateOp,
        group: GroupKey,
    ) -> QueryResult<Vec<(Value, Value)>> {
        let (sql, params) = self.compiler().aggregate_by(self, &op, &group)?;
        debug!(entity = self.entity, %sql, "aggregating by group");
        let rows = self.storage.query(&sql, &params).await?;
        rows.iter()
            .map(|row| Ok((row.get_by_index(0)?, row.get_by_index(1)?)))
            .collect()
    }

    /// Resolves a [`Which`] into an effective ordering.
    fn ordering_for(&self, which: &Which) -> QueryResult<Vec<OrderBy>> {
        let pk = self.schema.entity_or_err(self.entity)?.pk_column;
        match which {
            Which::First => Ok(if self.order.is_empty() {
                vec![OrderBy::asc(pk)]
            } else {
                self.order.clone()
            }),
            Which::Last => Ok(if self.order.is_empty() {
                vec![OrderBy::desc(pk)]
            } else {
                self.order
                    .iter()
                    .map(|o| OrderBy {
                        target: o.target.clone(),
                        descending: !o.descending,
                    })
                    .collect()
            }),
            Which::Earliest(field) => {
                let field = self.extremal_field(field.as_deref())?;
                Ok(vec![OrderBy::asc(field)])
            }
            Which::Latest(field) => {
                let field = self.extremal_field(field.as_deref())?;
                Ok(vec![OrderBy::desc(field)])
            }
        }
    }

    fn extremal_field(&self, given: Option<&str>) -> QueryResult<String> {
        if let Some(field) = given {
            return Ok(field.to_string());
        }
        self.schema
            .entity_or_err(self.entity)?
            .latest_by
            .map(str::to_string)
            .ok_or_else(|| QueryError::MissingOrderingField {
                entity: self.entity.to_string(),
            })
    }
}

/// A compiled, restartable row producer.
///
/// Every [`fetch`](Self::fetch) re-executes the statement, so a handle held
/// across writes observes them.
pub struct LazyRows<R> {
    sql: String,
    params: Vec<Value>,
    storage: Arc<dyn Storage>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> LazyRows<R> {
    /// Returns the compiled statement.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the statement and maps the rows.
    ///
    /// # Errors
    ///
    /// Fails on storage or row-mapping errors.
    pub async fn fetch(&self) -> QueryResult<Vec<R>> {
        let rows = self.storage.query(&self.sql, &self.params).await?;
        rows.iter().map(|row| R::from_row(row)).collect()
    }
}
