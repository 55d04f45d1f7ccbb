//! Shared bookstore fixture for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use relq_core::QueryResult;
use relq_db::{
    EntityDef, FieldDef, FieldKind, Gateway, Planner, Record, RelationDef, RelationKind, Row,
    Schema, Value,
};
use relq_sqlite::SqliteStorage;

pub fn bookstore_schema() -> Schema {
    Schema::new(vec![
        EntityDef {
            name: "author",
            table: "author",
            pk_column: "id",
            fields: vec![
                FieldDef::new("name", FieldKind::Text),
                FieldDef::new("birth_day", FieldKind::Date),
            ],
            relations: vec![RelationDef::new(
                "books",
                "book",
                RelationKind::ManyToMany {
                    join_table: "book_authors",
                    local_column: "author_id",
                    remote_column: "book_id",
                },
            )],
            latest_by: Some("birth_day"),
        },
        EntityDef {
            name: "book",
            table: "book",
            pk_column: "id",
            fields: vec![
                FieldDef::new("name", FieldKind::Text),
                FieldDef::new("publish_date", FieldKind::Date),
                FieldDef::new("price", FieldKind::Float),
                FieldDef::new("publisher_id", FieldKind::Integer),
            ],
            relations: vec![
                RelationDef::new(
                    "publisher",
                    "publisher",
                    RelationKind::ForeignKey {
                        column: "publisher_id",
                    },
                ),
                RelationDef::new(
                    "authors",
                    "author",
                    RelationKind::ManyToMany {
                        join_table: "book_authors",
                        local_column: "book_id",
                        remote_column: "author_id",
                    },
                ),
            ],
            latest_by: Some("publish_date"),
        },
        EntityDef {
            name: "publisher",
            table: "publisher",
            pk_column: "id",
            fields: vec![FieldDef::new("name", FieldKind::Text)],
            relations: vec![RelationDef::new(
                "books",
                "book",
                RelationKind::ReverseForeignKey {
                    remote_column: "publisher_id",
                },
            )],
            latest_by: None,
        },
        EntityDef {
            name: "sales",
            table: "sales",
            pk_column: "id",
            fields: vec![
                FieldDef::new("date", FieldKind::Date),
                FieldDef::new("total_sold_usd", FieldKind::Float),
            ],
            relations: vec![],
            latest_by: Some("date"),
        },
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub birth_day: NaiveDate,
}

impl Record for Author {
    const ENTITY: &'static str = "author";

    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            birth_day: row.get("birth_day")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(self.name.clone())),
            ("birth_day", Value::from(self.birth_day)),
        ]
    }

    fn set_pk(&mut self, pk: Value) {
        self.id = pk.as_int();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<i64>,
    pub name: String,
    pub publish_date: NaiveDate,
    pub price: f64,
    pub publisher_id: i64,
}

impl Record for Book {
    const ENTITY: &'static str = "book";

    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            publish_date: row.get("publish_date")?,
            price: row.get("price")?,
            publisher_id: row.get("publisher_id")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(self.name.clone())),
            ("publish_date", Value::from(self.publish_date)),
            ("price", Value::from(self.price)),
            ("publisher_id", Value::from(self.publisher_id)),
        ]
    }

    fn set_pk(&mut self, pk: Value) {
        self.id = pk.as_int();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Publisher {
    pub id: Option<i64>,
    pub name: String,
}

impl Record for Publisher {
    const ENTITY: &'static str = "publisher";

    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![("name", Value::from(self.name.clone()))]
    }

    fn set_pk(&mut self, pk: Value) {
        self.id = pk.as_int();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub total_sold_usd: f64,
}

impl Record for Sale {
    const ENTITY: &'static str = "sales";

    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            date: row.get("date")?,
            total_sold_usd: row.get("total_sold_usd")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("date", Value::from(self.date)),
            ("total_sold_usd", Value::from(self.total_sold_usd)),
        ]
    }

    fn set_pk(&mut self, pk: Value) {
        self.id = pk.as_int();
    }
}

const DDL: &str = "
CREATE TABLE publisher (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE author (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    birth_day TEXT NOT NULL
);
CREATE TABLE book (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    publish_date TEXT NOT NULL,
    price REAL NOT NULL,
    publisher_id INTEGER NOT NULL REFERENCES publisher(id)
);
CREATE TABLE book_authors (
    book_id INTEGER NOT NULL REFERENCES book(id),
    author_id INTEGER NOT NULL REFERENCES author(id),
    PRIMARY KEY (book_id, author_id)
);
CREATE TABLE sales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    total_sold_usd REAL NOT NULL
);
";

const SEED: &str = "
INSERT INTO publisher (id, name) VALUES (1, 'Riverrun'), (2, 'Smallhouse');
INSERT INTO author (id, name, birth_day) VALUES
    (1, 'Leo Old', '1550-06-01'),
    (2, 'Mary Middle', '1750-03-10'),
    (3, 'Nina New', '1950-09-05');
INSERT INTO book (id, name, publish_date, price, publisher_id) VALUES
    (1, 'Tidewater', '1995-05-01', 12.5, 1),
    (2, 'Clockmaker', '1995-05-01', 8.0, 1),
    (3, 'Ironwood', '2000-02-02', 15.0, 1),
    (4, 'Gullwing', '2000-11-11', 9.5, 1),
    (5, 'Lanterns', '2005-07-07', 20.0, 1),
    (6, 'Quarry', '2010-01-01', 5.0, 1),
    (7, 'Driftless', '2010-03-03', 30.0, 2),
    (8, 'Halfmoon', '2010-09-09', 8.0, 2);
INSERT INTO book_authors (book_id, author_id) VALUES
    (1, 1), (2, 1), (3, 1), (3, 2), (7, 3);
INSERT INTO sales (id, date, total_sold_usd) VALUES
    (1, '2020-01-01', 100.0),
    (2, '2020-01-02', 250.5),
    (3, '2020-02-01', 0.0);
";

pub struct Fixture {
    pub storage: Arc<SqliteStorage>,
    pub planner: Planner,
    pub gateway: Gateway,
    pub schema: Arc<Schema>,
}

/// Opens an in-memory database with the bookstore schema and seed data.
pub async fn seeded() -> Fixture {
    relq_core::logging::setup_logging("relq_db=debug", true);
    let storage = Arc::new(SqliteStorage::memory().expect("open :memory:"));
    storage.execute_batch(DDL).await.expect("create tables");
    storage.execute_batch(SEED).await.expect("seed data");
    fixture_around(storage)
}

/// Opens an in-memory database with the schema but no data.
pub async fn empty() -> Fixture {
    let storage = Arc::new(SqliteStorage::memory().expect("open :memory:"));
    storage.execute_batch(DDL).await.expect("create tables");
    fixture_around(storage)
}

fn fixture_around(storage: Arc<SqliteStorage>) -> Fixture {
    let schema = Arc::new(bookstore_schema());
    let planner = Planner::new(Arc::clone(&schema), Arc::clone(&storage) as _);
    let gateway = Gateway::new(Arc::clone(&schema), Arc::clone(&storage) as _);
    Fixture {
        storage,
        planner,
        gateway,
        schema,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
