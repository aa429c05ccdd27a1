// Points ledger: the per-user points/prevpts transition and its stores

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::UserLedgerRecord;

/// Persistent per-username points records.
#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Apply a new carbon value for `username` atomically and return the
    /// stored record.
    async fn record(&self, username: &str, carbon: f64) -> Result<UserLedgerRecord, AppError>;

    async fn find(&self, username: &str) -> Result<Option<UserLedgerRecord>, AppError>;

    /// Records with the lowest points first, ties broken by username.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserLedgerRecord>, AppError>;

    /// Whether the backing store answers.
    async fn ping(&self) -> bool;
}

/// The ledger transition.
///
/// A first submission stores `points = prevpts = carbon`. Afterwards
/// `prevpts = old points - carbon` and `points = carbon`; the old `prevpts`
/// is dropped.
pub fn apply_carbon(
    existing: Option<&UserLedgerRecord>,
    username: &str,
    carbon: f64,
    now: DateTime<Utc>,
) -> UserLedgerRecord {
    let prevpts = match existing {
        Some(record) => record.points - carbon,
        None => carbon,
    };

    UserLedgerRecord {
        username: username.to_string(),
        points: carbon,
        prevpts,
        updated_at: now,
    }
}

/// Process-local ledger. All updates are serialized behind one lock.
#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<String, UserLedgerRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointsLedger for InMemoryLedger {
    async fn record(&self, username: &str, carbon: f64) -> Result<UserLedgerRecord, AppError> {
        let mut records = self.records.lock().await;
        let next = apply_carbon(records.get(username), username, carbon, Utc::now());
        records.insert(username.to_string(), next.clone());
        Ok(next)
    }

    async fn find(&self, username: &str) -> Result<Option<UserLedgerRecord>, AppError> {
        Ok(self.records.lock().await.get(username).cloned())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserLedgerRecord>, AppError> {
        let records = self.records.lock().await;
        let mut ranked: Vec<UserLedgerRecord> = records.values().cloned().collect();
        ranked.sort_by(|a, b| {
            a.points
                .total_cmp(&b.points)
                .then_with(|| a.username.cmp(&b.username))
        });
        ranked.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    async fn ping(&self) -> bool {
        true
    }
}
