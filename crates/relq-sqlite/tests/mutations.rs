//! Write-path integration tests against in-memory SQLite.

mod common;

use common::{date, empty, seeded, Author, Sale};
use relq_core::QueryError;
use relq_db::{Predicate, RawQuery, Value};

#[tokio::test]
async fn get_or_create_inserts_once() {
    let fx = seeded().await;
    let unique = [("name", Value::from("Borges"))];
    let defaults = [("birth_day", Value::from(date(1899, 8, 24)))];

    let (author, created) = fx
        .gateway
        .get_or_create::<Author>(&unique, &defaults)
        .await
        .unwrap();
    assert!(created);
    assert!(author.id.is_some());
    assert_eq!(author.birth_day, date(1899, 8, 24));

    let (again, created) = fx
        .gateway
        .get_or_create::<Author>(&unique, &defaults)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, author.id);

    let count = fx.planner.query::<Author>().count().await.unwrap();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn concurrent_get_or_create_creates_at_most_one_row() {
    let fx = seeded().await;
    let left = fx.gateway.clone();
    let right = fx.gateway.clone();
    let unique = [("name", Value::from("Calvino"))];
    let defaults = [("birth_day", Value::from(date(1923, 10, 15)))];

    let (a, b) = tokio::join!(
        left.get_or_create::<Author>(&unique, &defaults),
        right.get_or_create::<Author>(&unique, &defaults),
    );
    let (author_a, created_a) = a.unwrap();
    let (author_b, created_b) = b.unwrap();

    assert_eq!(author_a.id, author_b.id);
    assert_eq!(
        u8::from(created_a) + u8::from(created_b),
        1,
        "exactly one caller creates the row"
    );
    let count = fx.planner.query::<Author>().count().await.unwrap();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn bulk_create_assigns_identities() {
    let fx = empty().await;
    let sales = vec![
        Sale {
            id: None,
            date: date(2021, 1, 1),
            total_sold_usd: 10.0,
        },
        Sale {
            id: None,
            date: date(2021, 1, 2),
            total_sold_usd: 20.0,
        },
        Sale {
            id: None,
            date: date(2021, 1, 3),
            total_sold_usd: 30.0,
        },
    ];

    let created = fx.gateway.bulk_create(sales).await.unwrap();
    let ids: Vec<i64> = created.iter().map(|s| s.id.unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(fx.planner.query::<Sale>().count().await.unwrap(), 3);
}

#[tokio::test]
async fn bulk_create_fails_as_a_unit() {
    let fx = seeded().await;
    let before = fx.planner.query::<Sale>().count().await.unwrap();

    let sales = vec![
        Sale {
            id: None,
            date: date(2021, 6, 1),
            total_sold_usd: 10.0,
        },
        // Collides with the seeded 2020-01-01 row.
        Sale {
            id: None,
            date: date(2020, 1, 1),
            total_sold_usd: 20.0,
        },
    ];
    let err = fx.gateway.bulk_create(sales).await.unwrap_err();
    assert!(matches!(err, QueryError::Storage(_)));

    let after = fx.planner.query::<Sale>().count().await.unwrap();
    assert_eq!(before, after, "a failed bulk insert writes nothing");
}

#[tokio::test]
async fn raw_statements_reach_the_database_unmodified() {
    let fx = seeded().await;
    let affected = RawQuery::new("UPDATE sales SET total_sold_usd = total_sold_usd * 2 WHERE date < ?")
        .bind(date(2020, 2, 1))
        .execute(&*fx.storage)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let doubled = fx
        .planner
        .query::<Sale>()
        .filter(Predicate::eq(&fx.schema, "sales", "date", date(2020, 1, 2)).unwrap())
        .get()
        .await
        .unwrap();
    assert_eq!(doubled.total_sold_usd, 501.0);
}

#[tokio::test]
async fn raw_failures_keep_the_statement_context() {
    let fx = seeded().await;
    let err = RawQuery::new("SELECT * FROM nowhere")
        .fetch_rows(&*fx.storage)
        .await
        .unwrap_err();
    match err {
        QueryError::RawExecution { statement, .. } => {
            assert_eq!(statement, "SELECT * FROM nowhere");
        }
        other => panic!("expected RawExecution, got {other:?}"),
    }
}
