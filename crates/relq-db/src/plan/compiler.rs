//! Translation of query specs into parameterized SQL.
//!
//! The compiler is a pure function from a [`QuerySpec`] (plus schema and
//! dialect) to one SQL string and its parameter list. Relation-traversing
//! predicate leaves are lowered to correlated `EXISTS` subqueries rather
//! than joins, so filtering through a to-many relation never duplicates
//! base rows and each OR branch stays an independent existence check.
//!
//! `distinct_by` is lowered to the portable
//! `pk IN (SELECT MIN(pk) ... GROUP BY key)` form: at most one row per key
//! survives, and the tie-break is the lowest identity on every backend.

use relq_core::{QueryError, QueryResult};

use crate::predicate::{CompareOp, Leaf, Predicate};
use crate::record::Record;
use crate::schema::{EntityDef, Hop, RelationDef, RelationKind, Schema};
use crate::value::Value;

use super::{AggregateOp, Annotation, DistinctKey, GroupKey, Projection, QuerySpec};

/// The SQL dialect a storage collaborator speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL: `$n` placeholders, `ILIKE`, `EXTRACT(YEAR FROM ...)`.
    Postgres,
    /// SQLite: `?` placeholders, `LOWER(...) LIKE`, `strftime('%Y', ...)`.
    Sqlite,
}

impl Dialect {
    /// Returns the placeholder for the `n`-th parameter (1-based).
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            Self::Sqlite => "?".to_string(),
        }
    }

    /// Returns the expression extracting the calendar year of `expr` as an
    /// integer.
    pub fn year_expr(self, expr: &str) -> String {
        match self {
            Self::Postgres => format!("CAST(EXTRACT(YEAR FROM {expr}) AS INTEGER)"),
            Self::Sqlite => format!("CAST(strftime('%Y', {expr}) AS INTEGER)"),
        }
    }
}

/// Escapes LIKE wildcards so a needle matches literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Mutable compilation state: collected parameters and an alias sequence.
struct Ctx {
    dialect: Dialect,
    params: Vec<Value>,
    alias_seq: usize,
}

impl Ctx {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
            alias_seq: 0,
        }
    }

    /// Appends a parameter and returns its placeholder.
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn next_alias(&mut self, prefix: &str) -> String {
        self.alias_seq += 1;
        format!("{prefix}{}", self.alias_seq)
    }
}

/// Compiles query specs into SQL for one dialect.
pub struct SqlCompiler<'a> {
    schema: &'a Schema,
    dialect: Dialect,
}

impl<'a> SqlCompiler<'a> {
    /// Creates a compiler for the given schema and dialect.
    pub fn new(schema: &'a Schema, dialect: Dialect) -> Self {
        Self { schema, dialect }
    }

    /// Compiles a row-returning SELECT honoring projection, distinct-by,
    /// ordering, limit, and offset.
    ///
    /// # Errors
    ///
    /// Fails when a directive references something the schema does not
    /// define.
    pub fn select<R: Record>(&self, spec: &QuerySpec<R>) -> QueryResult<(String, Vec<Value>)> {
        let entity = self.schema.entity_or_err(spec.entity)?;
        let mut ctx = Ctx::new(self.dialect);

        let (mut columns, joins) = self.projection_columns(entity, &spec.projection)?;
        for ann in &spec.annotations {
            let expr = self.annotation_expr(entity, ann, "t0")?;
            columns.push(format!("{expr} AS {}", ann.alias));
        }

        let mut sql = format!(
            "SELECT {} FROM {} AS t0",
            columns.join(", "),
            entity.table
        );
        for join in joins {
            sql.push_str(&format!(" {join}"));
        }

        let conditions = self.conditions(spec, entity, "t0", &mut ctx)?;
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }

        if let Some(order) = self.order_sql(spec, entity)? {
            sql.push_str(&format!(" ORDER BY {order}"));
        }
        self.push_limits(&mut sql, spec.limit, spec.offset);

        Ok((sql, ctx.params))
    }

    /// Compiles `SELECT COUNT(*)` over the filtered set.
    ///
    /// # Errors
    ///
    /// Fails when the filter references something the schema does not define.
    pub fn count<R: Record>(&self, spec: &QuerySpec<R>) -> QueryResult<(String, Vec<Value>)> {
        let entity = self.schema.entity_or_err(spec.entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let mut sql = format!("SELECT COUNT(*) AS count FROM {} AS t0", entity.table);
        let conditions = self.conditions(spec, entity, "t0", &mut ctx)?;
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        Ok((sql, ctx.params))
    }

    /// Compiles an `EXISTS` probe over the filtered set.
    ///
    /// # Errors
    ///
    /// Fails when the filter references something the schema does not define.
    pub fn exists<R: Record>(&self, spec: &QuerySpec<R>) -> QueryResult<(String, Vec<Value>)> {
        let entity = self.schema.entity_or_err(spec.entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let mut inner = format!("SELECT 1 FROM {} AS t0", entity.table);
        let conditions = self.conditions(spec, entity, "t0", &mut ctx)?;
        if !conditions.is_empty() {
            inner.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        Ok((format!("SELECT EXISTS ({inner}) AS present"), ctx.params))
    }

    /// Compiles a single aggregate over the filtered set.
    ///
    /// # Errors
    ///
    /// Fails when the aggregated field is not a local field of the entity.
    pub fn aggregate<R: Record>(
        &self,
        spec: &QuerySpec<R>,
        op: &AggregateOp,
    ) -> QueryResult<(String, Vec<Value>)> {
        let entity = self.schema.entity_or_err(spec.entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let expr = self.aggregate_expr(spec.entity, op, "t0")?;
        let mut sql = format!("SELECT {expr} AS agg FROM {} AS t0", entity.table);
        let conditions = self.conditions(spec, entity, "t0", &mut ctx)?;
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        Ok((sql, ctx.params))
    }

    /// Compiles a grouped aggregate, one output row per group key.
    ///
    /// # Errors
    ///
    /// Fails with `AggregationOnEmptySet` when the group key does not
    /// resolve in the schema.
    pub fn aggregate_by<R: Record>(
        &self,
        spec: &QuerySpec<R>,
        op: &AggregateOp,
        group: &GroupKey,
    ) -> QueryResult<(String, Vec<Value>)> {
        let entity = self.schema.entity_or_err(spec.entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let group_expr = self.group_expr(spec.entity, group, "t0")?;
        let agg_expr = self.aggregate_expr(spec.entity, op, "t0")?;
        let mut sql = format!(
            "SELECT {group_expr} AS group_key, {agg_expr} AS agg FROM {} AS t0",
            entity.table
        );
        let conditions = self.conditions(spec, entity, "t0", &mut ctx)?;
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        sql.push_str(&format!(" GROUP BY {group_expr} ORDER BY group_key"));
        Ok((sql, ctx.params))
    }

    /// Compiles `INSERT ... ON CONFLICT (unique) DO NOTHING`.
    ///
    /// # Errors
    ///
    /// Fails when the entity is unknown.
    pub fn insert_skip_conflict(
        &self,
        entity: &str,
        columns: &[&str],
        values: Vec<Value>,
        unique: &[&str],
    ) -> QueryResult<(String, Vec<Value>)> {
        let def = self.schema.entity_or_err(entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let placeholders: Vec<String> = values.into_iter().map(|v| ctx.bind(v)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
            def.table,
            columns.join(", "),
            placeholders.join(", "),
            unique.join(", "),
        );
        Ok((sql, ctx.params))
    }

    /// Compiles one multi-row INSERT returning the assigned primary keys.
    ///
    /// # Errors
    ///
    /// Fails when the entity is unknown.
    pub fn bulk_insert(
        &self,
        entity: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> QueryResult<(String, Vec<Value>)> {
        let def = self.schema.entity_or_err(entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let placeholders: Vec<String> = row.into_iter().map(|v| ctx.bind(v)).collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING {}",
            def.table,
            columns.join(", "),
            tuples.join(", "),
            def.pk_column,
        );
        Ok((sql, ctx.params))
    }

    /// Compiles a SELECT of all entity columns matched by column equality.
    ///
    /// # Errors
    ///
    /// Fails when the entity is unknown.
    pub fn select_by_columns(
        &self,
        entity: &str,
        pairs: &[(&str, Value)],
    ) -> QueryResult<(String, Vec<Value>)> {
        let def = self.schema.entity_or_err(entity)?;
        let mut ctx = Ctx::new(self.dialect);
        let columns: Vec<String> = def.columns().iter().map(|c| format!("t0.{c}")).collect();
        let mut sql = format!(
            "SELECT {} FROM {} AS t0",
            columns.join(", "),
            def.table
        );
        let conditions: Vec<String> = pairs
            .iter()
            .map(|(col, value)| {
                if value.is_null() {
                    format!("t0.{col} IS NULL")
                } else {
                    format!("t0.{col} = {}", ctx.bind(value.clone()))
                }
            })
            .collect();
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        Ok((sql, ctx.params))
    }

    // ── internals ──────────────────────────────────────────────────────

    /// Collects the WHERE conditions: the filter predicate, annotation
    /// filters, and the distinct-by membership clause.
    fn conditions<R: Record>(
        &self,
        spec: &QuerySpec<R>,
        entity: &EntityDef,
        alias: &str,
        ctx: &mut Ctx,
    ) -> QueryResult<Vec<String>> {
        let mut conditions = Vec::new();
        if let Some(pred) = &spec.predicate {
            conditions.push(self.condition(alias, spec.entity, pred, ctx)?);
        }
        for filter in &spec.annotation_filters {
            let ann = spec
                .annotations
                .iter()
                .find(|a| a.alias == filter.alias)
                .ok_or_else(|| {
                    QueryError::invalid_predicate(
                        spec.entity,
                        &filter.alias,
                        "unknown annotation alias",
                    )
                })?;
            let expr = self.annotation_expr(entity, ann, alias)?;
            let ph = ctx.bind(filter.value.clone());
            conditions.push(format!("{expr} {} {ph}", filter.cmp.sql()));
        }
        if let Some(key) = &spec.distinct {
            conditions.push(self.distinct_clause(spec, entity, alias, key, ctx)?);
        }
        Ok(conditions)
    }

    /// Renders `alias.pk IN (SELECT MIN(pk) ... GROUP BY key)`.
    ///
    /// The subquery repeats the spec's own filter so grouping happens over
    /// the filtered set, and the lowest primary key wins within each group.
    fn distinct_clause<R: Record>(
        &self,
        spec: &QuerySpec<R>,
        entity: &EntityDef,
        alias: &str,
        key: &DistinctKey,
        ctx: &mut Ctx,
    ) -> QueryResult<String> {
        let key_expr = match key {
            DistinctKey::Field(path) => format!("d0.{}", self.local_column(spec.entity, path)?),
            DistinctKey::Year(path) => {
                let column = self.local_column(spec.entity, path)?;
                self.dialect.year_expr(&format!("d0.{column}"))
            }
        };
        let mut inner = format!(
            "SELECT MIN(d0.{}) FROM {} AS d0",
            entity.pk_column, entity.table
        );
        if let Some(pred) = &spec.predicate {
            let cond = self.condition("d0", spec.entity, pred, ctx)?;
            inner.push_str(&format!(" WHERE {cond}"));
        }
        inner.push_str(&format!(" GROUP BY {key_expr}"));
        Ok(format!("{alias}.{} IN ({inner})", entity.pk_column))
    }

    /// Renders a predicate tree as one SQL condition.
    fn condition(
        &self,
        alias: &str,
        entity: &str,
        pred: &Predicate,
        ctx: &mut Ctx,
    ) -> QueryResult<String> {
        match pred {
            Predicate::Leaf(leaf) => {
                if leaf.path.entity != entity {
                    return Err(QueryError::invalid_predicate(
                        entity,
                        &leaf.path.raw,
                        format!("predicate was built for entity '{}'", leaf.path.entity),
                    ));
                }
                self.leaf_condition(alias, leaf, ctx)
            }
            Predicate::And(children) => {
                self.connective(alias, entity, children, " AND ", "1 = 1", ctx)
            }
            Predicate::Or(children) => self.connective(alias, entity, children, " OR ", "1 = 0", ctx),
            Predicate::Negate(inner) => {
                let cond = self.condition(alias, entity, inner, ctx)?;
                Ok(format!("NOT ({cond})"))
            }
        }
    }

    /// Joins child conditions with `sep`. `empty` supplies the rendering of
    /// a childless connective: true for a conjunction, false for a
    /// disjunction.
    fn connective(
        &self,
        alias: &str,
        entity: &str,
        children: &[Predicate],
        sep: &str,
        empty: &str,
        ctx: &mut Ctx,
    ) -> QueryResult<String> {
        if children.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = children
            .iter()
            .map(|c| self.condition(alias, entity, c, ctx))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!("({})", parts.join(sep)))
    }

    /// Renders one comparison leaf, walking relation hops as nested
    /// correlated `EXISTS` subqueries.
    fn leaf_condition(&self, alias: &str, leaf: &Leaf, ctx: &mut Ctx) -> QueryResult<String> {
        self.hop_condition(alias, &leaf.path.hops, &leaf.path.column, &leaf.op, ctx)
    }

    fn hop_condition(
        &self,
        alias: &str,
        hops: &[Hop],
        column: &str,
        op: &CompareOp,
        ctx: &mut Ctx,
    ) -> QueryResult<String> {
        let Some(hop) = hops.first() else {
            return Ok(self.terminal_condition(alias, column, op, ctx));
        };
        match &hop.kind {
            RelationKind::ForeignKey { column: fk } => {
                let next = ctx.next_alias("s");
                let inner = self.hop_condition(&next, &hops[1..], column, op, ctx)?;
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {} AS {next} WHERE {next}.{} = {alias}.{fk} AND {inner})",
                    hop.target_table, hop.target_pk,
                ))
            }
            RelationKind::ReverseForeignKey { remote_column } => {
                let next = ctx.next_alias("s");
                let inner = self.hop_condition(&next, &hops[1..], column, op, ctx)?;
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {} AS {next} WHERE {next}.{remote_column} = {alias}.{} AND {inner})",
                    hop.target_table, hop.source_pk,
                ))
            }
            RelationKind::ManyToMany {
                join_table,
                local_column,
                remote_column,
            } => {
                let link = ctx.next_alias("j");
                let next = ctx.next_alias("s");
                let inner = self.hop_condition(&next, &hops[1..], column, op, ctx)?;
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {join_table} AS {link} JOIN {} AS {next} ON {next}.{} = {link}.{remote_column} WHERE {link}.{local_column} = {alias}.{} AND {inner})",
                    hop.target_table, hop.target_pk, hop.source_pk,
                ))
            }
        }
    }

    fn terminal_condition(&self, alias: &str, column: &str, op: &CompareOp, ctx: &mut Ctx) -> String {
        let col = format!("{alias}.{column}");
        match op {
            CompareOp::Eq(Value::Null) => format!("{col} IS NULL"),
            CompareOp::Neq(Value::Null) => format!("{col} IS NOT NULL"),
            CompareOp::Eq(v) => format!("{col} = {}", ctx.bind(v.clone())),
            CompareOp::Neq(v) => format!("{col} <> {}", ctx.bind(v.clone())),
            CompareOp::Gt(v) => format!("{col} > {}", ctx.bind(v.clone())),
            CompareOp::Gte(v) => format!("{col} >= {}", ctx.bind(v.clone())),
            CompareOp::Lt(v) => format!("{col} < {}", ctx.bind(v.clone())),
            CompareOp::Lte(v) => format!("{col} <= {}", ctx.bind(v.clone())),
            CompareOp::ContainsCi(needle) => {
                let pattern = format!("%{}%", escape_like(needle));
                match self.dialect {
                    Dialect::Postgres => {
                        format!("{col} ILIKE {} ESCAPE '\\'", ctx.bind(pattern.into()))
                    }
                    Dialect::Sqlite => format!(
                        "LOWER({col}) LIKE {} ESCAPE '\\'",
                        ctx.bind(pattern.to_lowercase().into()),
                    ),
                }
            }
            CompareOp::Range(lo, hi) => format!(
                "{col} BETWEEN {} AND {}",
                ctx.bind(lo.clone()),
                ctx.bind(hi.clone()),
            ),
            CompareOp::In(values) if values.is_empty() => "1 = 0".to_string(),
            CompareOp::In(values) => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| ctx.bind(v.clone())).collect();
                format!("{col} IN ({})", placeholders.join(", "))
            }
        }
    }

    /// Builds the SELECT column list and any LEFT JOINs a projection of
    /// to-one relation columns requires.
    fn projection_columns(
        &self,
        entity: &EntityDef,
        projection: &Projection,
    ) -> QueryResult<(Vec<String>, Vec<String>)> {
        match projection {
            Projection::All => Ok((
                entity.columns().iter().map(|c| format!("t0.{c}")).collect(),
                Vec::new(),
            )),
            Projection::Except(dropped) => {
                let columns = entity
                    .columns()
                    .iter()
                    .filter(|c| **c == entity.pk_column || !dropped.iter().any(|d| d == *c))
                    .map(|c| format!("t0.{c}"))
                    .collect();
                Ok((columns, Vec::new()))
            }
            Projection::Only(fields) => {
                let mut columns = vec![format!("t0.{}", entity.pk_column)];
                let mut joins: Vec<String> = Vec::new();
                // prefix of relation names -> table alias
                let mut join_aliases: Vec<(String, String)> = Vec::new();
                for field in fields {
                    let path = self.schema.resolve_path(entity.name, field)?;
                    if path.is_local() {
                        if path.column != entity.pk_column {
                            columns.push(format!("t0.{}", path.column));
                        }
                        continue;
                    }
                    if path.crosses_to_many() {
                        return Err(QueryError::invalid_predicate(
                            entity.name,
                            field,
                            "projection through a to-many relation is not supported",
                        ));
                    }
                    let mut prev = "t0".to_string();
                    let mut prefix = String::new();
                    for hop in &path.hops {
                        if !prefix.is_empty() {
                            prefix.push('.');
                        }
                        prefix.push_str(hop.relation);
                        if let Some((_, alias)) =
                            join_aliases.iter().find(|(p, _)| *p == prefix)
                        {
                            prev = alias.clone();
                            continue;
                        }
                        let RelationKind::ForeignKey { column: fk } = &hop.kind else {
                            unreachable!("to-many hops rejected above");
                        };
                        let alias = format!("r{}", join_aliases.len() + 1);
                        joins.push(format!(
                            "LEFT JOIN {} AS {alias} ON {alias}.{} = {prev}.{fk}",
                            hop.target_table, hop.target_pk,
                        ));
                        join_aliases.push((prefix.clone(), alias.clone()));
                        prev = alias;
                    }
                    columns.push(format!("{prev}.{} AS \"{}\"", path.column, path.raw));
                }
                Ok((columns, joins))
            }
        }
    }

    /// Renders a correlated scalar subquery for a relation aggregate.
    fn annotation_expr(
        &self,
        entity: &EntityDef,
        ann: &Annotation,
        alias: &str,
    ) -> QueryResult<String> {
        let (relation_name, field) = match &ann.op {
            AggregateOp::Count => (ann.path.as_str(), None),
            AggregateOp::Sum(_) => {
                let Some((relation, field)) = ann.path.split_once('.') else {
                    return Err(QueryError::invalid_predicate(
                        entity.name,
                        &ann.path,
                        "sum annotation takes a 'relation.field' path",
                    ));
                };
                (relation, Some(field))
            }
        };
        let relation = entity.relation(relation_name).ok_or_else(|| {
            QueryError::invalid_predicate(
                entity.name,
                &ann.path,
                format!("'{relation_name}' is not a relation of '{}'", entity.name),
            )
        })?;
        self.relation_aggregate(entity, relation, field, alias)
    }

    fn relation_aggregate(
        &self,
        entity: &EntityDef,
        relation: &RelationDef,
        field: Option<&str>,
        alias: &str,
    ) -> QueryResult<String> {
        let target = self.schema.entity_or_err(relation.target)?;
        let agg = |table_alias: &str| match field {
            Some(f) => format!("SUM({table_alias}.{f})"),
            None => "COUNT(*)".to_string(),
        };
        match &relation.kind {
            RelationKind::ReverseForeignKey { remote_column } => Ok(format!(
                "(SELECT {} FROM {} AS a0 WHERE a0.{remote_column} = {alias}.{})",
                agg("a0"),
                target.table,
                entity.pk_column,
            )),
            RelationKind::ManyToMany {
                join_table,
                local_column,
                remote_column,
            } => match field {
                None => Ok(format!(
                    "(SELECT COUNT(*) FROM {join_table} AS l0 WHERE l0.{local_column} = {alias}.{})",
                    entity.pk_column,
                )),
                Some(_) => Ok(format!(
                    "(SELECT {} FROM {join_table} AS l0 JOIN {} AS a0 ON a0.{} = l0.{remote_column} WHERE l0.{local_column} = {alias}.{})",
                    agg("a0"),
                    target.table,
                    target.pk_column,
                    entity.pk_column,
                )),
            },
            RelationKind::ForeignKey { .. } => Err(QueryError::invalid_predicate(
                entity.name,
                relation.name,
                "annotations require a to-many relation",
            )),
        }
    }

    fn aggregate_expr(&self, entity: &str, op: &AggregateOp, alias: &str) -> QueryResult<String> {
        match op {
            AggregateOp::Count => Ok("COUNT(*)".to_string()),
            AggregateOp::Sum(field) => {
                let column = self.local_column(entity, field)?;
                Ok(format!("SUM({alias}.{column})"))
            }
        }
    }

    fn group_expr(&self, entity: &str, group: &GroupKey, alias: &str) -> QueryResult<String> {
        let path = match group {
            GroupKey::Field(p) | GroupKey::Year(p) => p,
        };
        let column = self.local_column(entity, path).map_err(|_| {
            QueryError::AggregationOnEmptySet {
                entity: entity.to_string(),
                group: path.clone(),
            }
        })?;
        match group {
            GroupKey::Field(_) => Ok(format!("{alias}.{column}")),
            GroupKey::Year(_) => Ok(self.dialect.year_expr(&format!("{alias}.{column}"))),
        }
    }

    fn order_sql<R: Record>(
        &self,
        spec: &QuerySpec<R>,
        entity: &EntityDef,
    ) -> QueryResult<Option<String>> {
        if spec.order.is_empty() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(spec.order.len());
        for order in &spec.order {
            let target = if spec.annotations.iter().any(|a| a.alias == order.target) {
                order.target.clone()
            } else {
                let column = self.local_column(entity.name, &order.target).map_err(|_| {
                    QueryError::invalid_predicate(
                        entity.name,
                        &order.target,
                        "ordering takes a local field or an annotation alias",
                    )
                })?;
                format!("t0.{column}")
            };
            let dir = if order.descending { "DESC" } else { "ASC" };
            parts.push(format!("{target} {dir}"));
        }
        Ok(Some(parts.join(", ")))
    }

    /// Resolves a path that must stay on the entity's own table.
    fn local_column(&self, entity: &str, path: &str) -> QueryResult<String> {
        let resolved = self.schema.resolve_path(entity, path)?;
        if !resolved.is_local() {
            return Err(QueryError::invalid_predicate(
                entity,
                path,
                "a local field is required here",
            ));
        }
        Ok(resolved.column)
    }

    fn push_limits(&self, sql: &mut String, limit: Option<u64>, offset: Option<u64>) {
        match (limit, offset) {
            (Some(n), Some(m)) => sql.push_str(&format!(" LIMIT {n} OFFSET {m}")),
            (Some(n), None) => sql.push_str(&format!(" LIMIT {n}")),
            (None, Some(m)) => match self.dialect {
                // SQLite has no bare OFFSET clause.
                Dialect::Sqlite => sql.push_str(&format!(" LIMIT -1 OFFSET {m}")),
                Dialect::Postgres => sql.push_str(&format!(" OFFSET {m}")),
            },
            (None, None) => {}
        }
    }
}
