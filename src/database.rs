// PostgreSQL-backed points ledger

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::{debug, info};

use crate::error::AppError;
use crate::ledger::{apply_carbon, PointsLedger};
use crate::models::UserLedgerRecord;

pub type DbPool = Pool<Postgres>;

pub struct Database;

impl Database {
    /// Initialize database connection pool
    pub async fn init(database_url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
        info!("Connecting to database");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(pool)
    }
}

/// Ledger stored in the `points` table.
///
/// Each update runs in one transaction holding a row lock, so concurrent
/// submissions for the same username are applied one after the other.
#[derive(Clone)]
pub struct PgLedger {
    pool: DbPool,
}

impl PgLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PointsLedger for PgLedger {
    async fn record(&self, username: &str, carbon: f64) -> Result<UserLedgerRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<UserLedgerRecord> = sqlx::query_as(
            r#"
            SELECT username, points, prevpts, updated_at
            FROM points
            WHERE username = $1
            FOR UPDATE
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *tx)
        .await?;

        let next = apply_carbon(existing.as_ref(), username, carbon, Utc::now());

        let written: Option<UserLedgerRecord> = match existing {
            None => {
                sqlx::query_as(
                    r#"
                    INSERT INTO points (username, points, prevpts, updated_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (username) DO NOTHING
                    RETURNING username, points, prevpts, updated_at
                    "#,
                )
                .bind(&next.username)
                .bind(next.points)
                .bind(next.prevpts)
                .bind(next.updated_at)
                .fetch_optional(&mut *tx)
                .await?
            }
            Some(_) => {
                sqlx::query_as(
                    r#"
                    UPDATE points
                    SET points = $2, prevpts = $3, updated_at = $4
                    WHERE username = $1
                    RETURNING username, points, prevpts, updated_at
                    "#,
                )
                .bind(&next.username)
                .bind(next.points)
                .bind(next.prevpts)
                .bind(next.updated_at)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        // No row back means a concurrent first submission created the record.
        let record = written.ok_or_else(|| {
            AppError::WriteConflict(format!("concurrent update for '{}'", username))
        })?;

        tx.commit().await?;
        debug!(
            "Ledger updated for '{}': points={}, prevpts={}",
            record.username, record.points, record.prevpts
        );
        Ok(record)
    }

    async fn find(&self, username: &str) -> Result<Option<UserLedgerRecord>, AppError> {
        let record: Option<UserLedgerRecord> = sqlx::query_as(
            r#"
            SELECT username, points, prevpts, updated_at
            FROM points
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserLedgerRecord>, AppError> {
        let records: Vec<UserLedgerRecord> = sqlx::query_as(
            r#"
            SELECT username, points, prevpts, updated_at
            FROM points
            ORDER BY points ASC, username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
