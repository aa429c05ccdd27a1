//! Postgres ledger tests gated by TEST_DATABASE_URL.
//! Use `cargo test -- --ignored` with `TEST_DATABASE_URL=postgres://...` to run them.

use std::sync::Arc;

use footprint_backend::database::{Database, DbPool, PgLedger};
use footprint_backend::{AppError, PointsLedger};

async fn connect() -> Option<DbPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("SKIP-PG-LEDGER: set TEST_DATABASE_URL to run");
        return None;
    };
    Some(Database::init(&url, 4).await.expect("test database should accept connections"))
}

/// Usernames unique to one test run so reruns start from empty records.
fn run_prefix(test: &str) -> String {
    format!("{}-{}", test, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn cleanup(pool: &DbPool, prefix: &str) {
    sqlx::query("DELETE FROM points WHERE username LIKE $1")
        .bind(format!("{}%", prefix))
        .execute(pool)
        .await
        .expect("cleanup should succeed");
}

#[tokio::test]
#[ignore = "requires a Postgres server; opt-in via TEST_DATABASE_URL"]
async fn pg_first_insert_then_update() {
    let Some(pool) = connect().await else { return };
    let ledger = PgLedger::new(pool.clone());
    let prefix = run_prefix("insert-update");
    let user = format!("{}-alice", prefix);

    let first = ledger.record(&user, 10.0).await.unwrap();
    assert_eq!((first.points, first.prevpts), (10.0, 10.0));

    let second = ledger.record(&user, 4.0).await.unwrap();
    assert_eq!((second.points, second.prevpts), (4.0, 6.0));
    assert!(second.updated_at >= first.updated_at);

    let stored = ledger.find(&user).await.unwrap().unwrap();
    assert_eq!((stored.points, stored.prevpts), (4.0, 6.0));
    assert!(ledger.find(&format!("{}-nobody", prefix)).await.unwrap().is_none());

    cleanup(&pool, &prefix).await;
}

#[tokio::test]
#[ignore = "requires a Postgres server; opt-in via TEST_DATABASE_URL"]
async fn pg_leaderboard_lowest_points_first() {
    let Some(pool) = connect().await else { return };
    let ledger = PgLedger::new(pool.clone());
    let prefix = run_prefix("leaderboard");

    // Far below any realistic footprint so these rows lead the board.
    for (name, points) in [("carol", -1.0e12), ("alice", -3.0e12), ("bob", -2.0e12)] {
        ledger.record(&format!("{}-{}", prefix, name), points).await.unwrap();
    }

    let names: Vec<String> = ledger
        .leaderboard(100)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.username.starts_with(&prefix))
        .map(|r| r.username)
        .collect();
    assert_eq!(
        names,
        vec![
            format!("{}-alice", prefix),
            format!("{}-bob", prefix),
            format!("{}-carol", prefix),
        ]
    );
    assert!(ledger.leaderboard(1).await.unwrap().len() <= 1);
    assert!(ledger.ping().await);

    cleanup(&pool, &prefix).await;
}

#[tokio::test]
#[ignore = "requires a Postgres server; opt-in via TEST_DATABASE_URL"]
async fn pg_concurrent_first_submissions() {
    let Some(pool) = connect().await else { return };
    let ledger = Arc::new(PgLedger::new(pool.clone()));
    let prefix = run_prefix("race");
    let user = format!("{}-dana", prefix);

    let tasks: Vec<_> = [5.0, 7.0]
        .into_iter()
        .map(|carbon| {
            let ledger = ledger.clone();
            let user = user.clone();
            tokio::spawn(async move { ledger.record(&user, carbon).await })
        })
        .collect();

    let mut written = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => written += 1,
            Err(AppError::WriteConflict(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert!(written >= 1);

    // The loser either conflicted or was applied on top of the winner.
    let stored = ledger.find(&user).await.unwrap().unwrap();
    assert!(stored.points == 5.0 || stored.points == 7.0);
    if written == 1 {
        assert_eq!(stored.prevpts, stored.points);
    } else {
        assert_eq!(stored.prevpts, 12.0 - 2.0 * stored.points);
    }

    cleanup(&pool, &prefix).await;
}
