//! Read-path integration tests against in-memory SQLite.

mod common;

use common::{date, seeded, Author, Book, Publisher, Sale};
use relq_core::QueryError;
use relq_db::{
    AggregateCmp, AggregateOp, DistinctKey, GroupKey, OrderBy, Predicate, Projection, RawQuery,
    Value, Which,
};

#[tokio::test]
async fn count_books_sharing_a_publish_date() {
    let fx = seeded().await;
    let spec = fx.planner.query::<Book>().filter(
        Predicate::eq(&fx.schema, "book", "publish_date", date(1995, 5, 1)).unwrap(),
    );
    assert_eq!(spec.count().await.unwrap(), 2);
    assert_eq!(spec.fetch_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn exists_agrees_with_count() {
    let fx = seeded().await;
    let matching = fx
        .planner
        .query::<Book>()
        .filter(Predicate::gt(&fx.schema, "book", "price", 25.0).unwrap());
    assert!(matching.exists().await.unwrap());
    assert!(matching.count().await.unwrap() > 0);

    let none = fx
        .planner
        .query::<Book>()
        .filter(Predicate::gt(&fx.schema, "book", "price", 1000.0).unwrap());
    assert!(!none.exists().await.unwrap());
    assert_eq!(none.count().await.unwrap(), 0);
}

#[tokio::test]
async fn authors_born_in_either_century() {
    let fx = seeded().await;
    let sixteenth = Predicate::range(
        &fx.schema,
        "author",
        "birth_day",
        date(1500, 1, 1),
        date(1599, 12, 31),
    )
    .unwrap();
    let eighteenth = Predicate::range(
        &fx.schema,
        "author",
        "birth_day",
        date(1700, 1, 1),
        date(1799, 12, 31),
    )
    .unwrap();

    let both = fx
        .planner
        .query::<Author>()
        .filter(sixteenth.clone() | eighteenth.clone());
    let mut names: Vec<String> = both
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Leo Old", "Mary Middle"]);

    let outside = fx.planner.query::<Author>().exclude(sixteenth | eighteenth);
    let names: Vec<String> = outside
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Nina New"]);
}

#[tokio::test]
async fn double_negation_selects_the_same_rows() {
    let fx = seeded().await;
    let p = Predicate::contains_ci(&fx.schema, "author", "name", "o").unwrap();
    let plain: Vec<Option<i64>> = fx
        .planner
        .query::<Author>()
        .filter(p.clone())
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    let doubled: Vec<Option<i64>> = fx
        .planner
        .query::<Author>()
        .filter(!!p)
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert!(!plain.is_empty());
    assert_eq!(plain, doubled);
}

#[tokio::test]
async fn to_many_filter_never_duplicates_books() {
    let fx = seeded().await;
    // Ironwood has two authors born before 1800; it must come back once.
    let books = fx
        .planner
        .query::<Book>()
        .filter(Predicate::lt(&fx.schema, "book", "authors.birth_day", date(1800, 1, 1)).unwrap())
        .order_by(OrderBy::asc("id"))
        .fetch_all()
        .await
        .unwrap();
    let ids: Vec<Option<i64>> = books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn contains_ci_ignores_case() {
    let fx = seeded().await;
    let authors = fx
        .planner
        .query::<Author>()
        .filter(Predicate::contains_ci(&fx.schema, "author", "name", "LEO").unwrap())
        .fetch_all()
        .await
        .unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "Leo Old");
}

#[tokio::test]
async fn membership_and_the_empty_list() {
    let fx = seeded().await;
    let some = fx
        .planner
        .query::<Book>()
        .filter(Predicate::is_in(&fx.schema, "book", "price", vec![5.0, 30.0]).unwrap());
    assert_eq!(some.count().await.unwrap(), 2);

    let none = fx
        .planner
        .query::<Book>()
        .filter(Predicate::is_in(&fx.schema, "book", "price", Vec::<f64>::new()).unwrap());
    assert_eq!(none.count().await.unwrap(), 0);
}

#[tokio::test]
async fn distinct_by_year_keeps_one_book_per_year() {
    let fx = seeded().await;
    let books = fx
        .planner
        .query::<Book>()
        .distinct_by(DistinctKey::Year("publish_date".into()))
        .order_by(OrderBy::asc("id"))
        .fetch_all()
        .await
        .unwrap();
    // Four publish years; within each the lowest id survives.
    let ids: Vec<Option<i64>> = books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![Some(1), Some(3), Some(5), Some(6)]);
}

#[tokio::test]
async fn latest_and_earliest_pick_extremal_rows() {
    let fx = seeded().await;
    let latest = fx
        .planner
        .query::<Book>()
        .fetch_one(Which::Latest(None))
        .await
        .unwrap();
    assert_eq!(latest.publish_date, date(2010, 9, 9));

    let earliest = fx
        .planner
        .query::<Book>()
        .fetch_one(Which::Earliest(None))
        .await
        .unwrap();
    assert_eq!(earliest.publish_date, date(1995, 5, 1));

    let latest_sale = fx
        .planner
        .query::<Sale>()
        .fetch_one(Which::Latest(None))
        .await
        .unwrap();
    assert_eq!(latest_sale.date, date(2020, 2, 1));

    let err = fx
        .planner
        .query::<Publisher>()
        .fetch_one(Which::Latest(None))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::MissingOrderingField { .. }));
}

#[tokio::test]
async fn first_and_last_follow_the_spec_ordering() {
    let fx = seeded().await;
    let cheapest = fx
        .planner
        .query::<Book>()
        .order_by(OrderBy::asc("price"))
        .fetch_one(Which::First)
        .await
        .unwrap();
    assert_eq!(cheapest.name, "Quarry");

    let priciest = fx
        .planner
        .query::<Book>()
        .order_by(OrderBy::asc("price"))
        .fetch_one(Which::Last)
        .await
        .unwrap();
    assert_eq!(priciest.name, "Driftless");
}

#[tokio::test]
async fn get_requires_a_unique_match() {
    let fx = seeded().await;
    let sale = fx
        .planner
        .query::<Sale>()
        .filter(Predicate::eq(&fx.schema, "sales", "date", date(2020, 1, 2)).unwrap())
        .get()
        .await
        .unwrap();
    assert_eq!(sale.total_sold_usd, 250.5);

    let err = fx
        .planner
        .query::<Book>()
        .filter(Predicate::eq(&fx.schema, "book", "price", 8.0).unwrap())
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::MultipleRows { .. }));

    let err = fx
        .planner
        .query::<Sale>()
        .filter(Predicate::eq(&fx.schema, "sales", "date", date(1999, 1, 1)).unwrap())
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::NotFound { .. }));
}

#[tokio::test]
async fn aggregates_over_full_and_empty_sets() {
    let fx = seeded().await;
    let total = fx
        .planner
        .query::<Book>()
        .aggregate(AggregateOp::Sum("price".into()))
        .await
        .unwrap();
    assert_eq!(total, Value::Float(108.0));

    let count = fx
        .planner
        .query::<Book>()
        .aggregate(AggregateOp::Count)
        .await
        .unwrap();
    assert_eq!(count, Value::Int(8));

    // SUM over zero rows is SQL NULL, not zero.
    let empty = fx
        .planner
        .query::<Book>()
        .filter(Predicate::gt(&fx.schema, "book", "price", 1000.0).unwrap())
        .aggregate(AggregateOp::Sum("price".into()))
        .await
        .unwrap();
    assert_eq!(empty, Value::Null);
}

#[tokio::test]
async fn books_grouped_by_publish_year() {
    let fx = seeded().await;
    let groups = fx
        .planner
        .query::<Book>()
        .aggregate_by(AggregateOp::Count, GroupKey::Year("publish_date".into()))
        .await
        .unwrap();
    assert_eq!(
        groups,
        vec![
            (Value::Int(1995), Value::Int(2)),
            (Value::Int(2000), Value::Int(2)),
            (Value::Int(2005), Value::Int(1)),
            (Value::Int(2010), Value::Int(3)),
        ]
    );
}

#[tokio::test]
async fn publishers_with_more_than_five_books() {
    let fx = seeded().await;
    let spec = fx
        .planner
        .query::<Publisher>()
        .annotate_count("books", "book_count")
        .filter_annotation("book_count", AggregateCmp::Gt, 5);
    let publishers = spec.fetch_all().await.unwrap();
    assert_eq!(publishers.len(), 1);
    assert_eq!(publishers[0].name, "Riverrun");

    let rows = spec.fetch_rows().await.unwrap();
    assert_eq!(rows[0].get::<i64>("book_count").unwrap(), 6);
}

#[tokio::test]
async fn publishers_ordered_by_total_book_price() {
    let fx = seeded().await;
    let rows = fx
        .planner
        .query::<Publisher>()
        .annotate_sum("books.price", "total_price")
        .order_by(OrderBy::desc("total_price"))
        .fetch_rows()
        .await
        .unwrap();
    assert_eq!(rows[0].get::<String>("name").unwrap(), "Riverrun");
    assert_eq!(rows[0].get::<f64>("total_price").unwrap(), 70.0);
    assert_eq!(rows[1].get::<f64>("total_price").unwrap(), 38.0);
}

#[tokio::test]
async fn authors_with_more_than_two_books() {
    let fx = seeded().await;
    let spec = fx
        .planner
        .query::<Author>()
        .annotate_count("books", "book_count")
        .filter_annotation("book_count", AggregateCmp::Gt, 2);
    let authors = spec.fetch_all().await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "Leo Old");

    let rows = spec.fetch_rows().await.unwrap();
    assert_eq!(rows[0].get::<i64>("book_count").unwrap(), 3);
}

#[tokio::test]
async fn authors_ordered_by_total_book_price() {
    let fx = seeded().await;
    let rows = fx
        .planner
        .query::<Author>()
        .annotate_sum("books.price", "total_price")
        .order_by(OrderBy::desc("total_price"))
        .fetch_rows()
        .await
        .unwrap();
    assert_eq!(rows[0].get::<String>("name").unwrap(), "Leo Old");
    assert_eq!(rows[0].get::<f64>("total_price").unwrap(), 35.5);
    assert_eq!(rows[1].get::<String>("name").unwrap(), "Nina New");
    assert_eq!(rows[1].get::<f64>("total_price").unwrap(), 30.0);
    assert_eq!(rows[2].get::<f64>("total_price").unwrap(), 15.0);
}

#[tokio::test]
async fn count_books_published_after_a_cutoff() {
    let fx = seeded().await;
    let count = fx
        .planner
        .query::<Book>()
        .filter(Predicate::gt(&fx.schema, "book", "publish_date", date(2004, 12, 31)).unwrap())
        .count()
        .await
        .unwrap();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn projection_narrows_columns_and_joins_to_one_relations() {
    let fx = seeded().await;
    let rows = fx
        .planner
        .query::<Book>()
        .filter(Predicate::eq(&fx.schema, "book", "name", "Driftless").unwrap())
        .project(Projection::Only(vec![
            "name".into(),
            "publisher.name".into(),
        ]))
        .fetch_rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let columns: Vec<&str> = rows[0].columns().iter().map(String::as_str).collect();
    assert_eq!(columns, vec!["id", "name", "publisher.name"]);
    assert_eq!(rows[0].get::<String>("publisher.name").unwrap(), "Smallhouse");
}

#[tokio::test]
async fn lazy_rows_observe_writes_between_fetches() {
    let fx = seeded().await;
    let rows = fx.planner.query::<Book>().rows().unwrap();
    assert_eq!(rows.fetch().await.unwrap().len(), 8);

    RawQuery::new(
        "INSERT INTO book (name, publish_date, price, publisher_id) VALUES (?, ?, ?, ?)",
    )
    .bind("Afterword")
    .bind(date(2011, 1, 1))
    .bind(3.0)
    .bind(2_i64)
    .execute(&*fx.storage)
    .await
    .unwrap();

    assert_eq!(rows.fetch().await.unwrap().len(), 9);
}

#[tokio::test]
async fn raw_query_maps_rows_through_records() {
    let fx = seeded().await;
    let sales: Vec<Sale> = RawQuery::new(
        "SELECT id, date, total_sold_usd FROM sales WHERE total_sold_usd > ? ORDER BY id",
    )
    .bind(50.0)
    .fetch(&*fx.storage)
    .await
    .unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].total_sold_usd, 100.0);
}
