//! Schema metadata and relationship-path resolution.
//!
//! A [`Schema`] is an explicitly constructed, immutable description of the
//! entities the query layer operates on: their tables, fields, and
//! relationships. It is passed into the planner and the predicate algebra at
//! construction time — there is no process-wide registry.
//!
//! Dotted field paths such as `"books.authors.birth_day"` are resolved
//! against the schema exactly once, producing a [`FieldPath`] that records
//! every relation hop and the terminal column. Resolution failures surface
//! as `InvalidPredicate` before any SQL is generated.

use relq_core::{QueryError, QueryResult};

/// Immutable entity/field/relationship metadata.
///
/// Safe to share across threads behind an `Arc`.
#[derive(Debug)]
pub struct Schema {
    entities: Vec<EntityDef>,
}

impl Schema {
    /// Creates a schema from entity definitions.
    pub fn new(entities: Vec<EntityDef>) -> Self {
        Self { entities }
    }

    /// Looks up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Looks up an entity by name, failing with `InvalidPredicate` context.
    pub fn entity_or_err(&self, name: &str) -> QueryResult<&EntityDef> {
        self.entity(name)
            .ok_or_else(|| QueryError::invalid_predicate(name, "", "unknown entity"))
    }

    /// Resolves a dotted field path from a root entity.
    ///
    /// All segments except the last must name relations; the last segment
    /// must name a field (or the primary key) of the entity the hops arrive
    /// at.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPredicate` when any segment fails to resolve.
    pub fn resolve_path(&self, entity: &str, path: &str) -> QueryResult<FieldPath> {
        let root = self.entity_or_err(entity)?;
        let segments: Vec<&str> = path.split('.').collect();
        if segments.is_empty() || path.is_empty() {
            return Err(QueryError::invalid_predicate(entity, path, "empty path"));
        }

        let mut current = root;
        let mut hops = Vec::new();
        for segment in &segments[..segments.len() - 1] {
            let relation = current.relation(segment).ok_or_else(|| {
                QueryError::invalid_predicate(
                    entity,
                    path,
                    format!("'{segment}' is not a relation of '{}'", current.name),
                )
            })?;
            let target = self.entity_or_err(relation.target)?;
            hops.push(Hop {
                relation: relation.name,
                kind: relation.kind.clone(),
                source_table: current.table,
                source_pk: current.pk_column,
                target_entity: target.name,
                target_table: target.table,
                target_pk: target.pk_column,
            });
            current = target;
        }

        let terminal = segments[segments.len() - 1];
        let kind = if terminal == current.pk_column {
            FieldKind::Integer
        } else {
            current
                .field(terminal)
                .map(|f| f.kind)
                .ok_or_else(|| {
                    QueryError::invalid_predicate(
                        entity,
                        path,
                        format!("'{terminal}' is not a field of '{}'", current.name),
                    )
                })?
        };

        Ok(FieldPath {
            entity: root.name,
            raw: path.to_string(),
            hops,
            column: terminal.to_string(),
            kind,
        })
    }
}

/// Metadata about one entity.
#[derive(Debug, Clone)]
pub struct EntityDef {
    /// The entity name used by callers (e.g. `"book"`).
    pub name: &'static str,
    /// The database table name.
    pub table: &'static str,
    /// The primary key column.
    pub pk_column: &'static str,
    /// Scalar field definitions (excluding the primary key).
    pub fields: Vec<FieldDef>,
    /// Relationships to other entities.
    pub relations: Vec<RelationDef>,
    /// Default ordering field for `earliest`/`latest` when the caller gives
    /// none.
    pub latest_by: Option<&'static str>,
}

impl EntityDef {
    /// Looks up a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Returns all column names, primary key first.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = vec![self.pk_column];
        cols.extend(self.fields.iter().map(|f| f.name));
        cols
    }
}

/// A scalar field definition. The field name doubles as the column name.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The field (and column) name.
    pub name: &'static str,
    /// The field's value kind.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a field definition.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// The value kind of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit integer.
    Integer,
    /// Double-precision float.
    Float,
    /// UTF-8 text.
    Text,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Boolean.
    Boolean,
    /// UUID.
    Uuid,
}

/// A relationship from one entity to another.
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// The relation name used in paths (e.g. `"books"`).
    pub name: &'static str,
    /// The target entity name.
    pub target: &'static str,
    /// How the relation is stored.
    pub kind: RelationKind,
}

impl RelationDef {
    /// Creates a relation definition.
    pub const fn new(name: &'static str, target: &'static str, kind: RelationKind) -> Self {
        Self { name, target, kind }
    }
}

/// How a relationship is stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// A to-one relation: this entity holds a foreign key column pointing
    /// at the target's primary key.
    ForeignKey {
        /// The local foreign key column.
        column: &'static str,
    },
    /// A to-many reverse relation: the target entity holds the foreign key.
    ReverseForeignKey {
        /// The foreign key column on the target's table.
        remote_column: &'static str,
    },
    /// A to-many relation through a join table.
    ManyToMany {
        /// The join table name.
        join_table: &'static str,
        /// The join table column referencing this entity's primary key.
        local_column: &'static str,
        /// The join table column referencing the target's primary key.
        remote_column: &'static str,
    },
}

impl RelationKind {
    /// Returns `true` when following this relation can match multiple rows.
    pub const fn is_to_many(&self) -> bool {
        matches!(self, Self::ReverseForeignKey { .. } | Self::ManyToMany { .. })
    }
}

/// One resolved relation hop along a field path.
#[derive(Debug, Clone)]
pub struct Hop {
    /// The relation name as written in the path.
    pub relation: &'static str,
    /// The relation storage kind.
    pub kind: RelationKind,
    /// The table the hop starts from.
    pub source_table: &'static str,
    /// The primary key column of the source table.
    pub source_pk: &'static str,
    /// The entity the hop arrives at.
    pub target_entity: &'static str,
    /// The table the hop arrives at.
    pub target_table: &'static str,
    /// The primary key column of the target table.
    pub target_pk: &'static str,
}

/// A dotted field path resolved against a [`Schema`].
///
/// Resolution happens once, at predicate construction; the compiler only
/// consumes the recorded hops and terminal column.
#[derive(Debug, Clone)]
pub struct FieldPath {
    /// The root entity name.
    pub entity: &'static str,
    /// The path as written by the caller.
    pub raw: String,
    /// The resolved relation hops (empty for a local field).
    pub hops: Vec<Hop>,
    /// The terminal column name.
    pub column: String,
    /// The terminal field's value kind.
    pub kind: FieldKind,
}

impl FieldPath {
    /// Returns `true` when the path stays on the root entity's table.
    pub fn is_local(&self) -> bool {
        self.hops.is_empty()
    }

    /// Returns `true` when any hop traverses a to-many relation.
    pub fn crosses_to_many(&self) -> bool {
        self.hops.iter().any(|h| h.kind.is_to_many())
    }
}
