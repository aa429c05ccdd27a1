// Request, response and ledger models for the footprint backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Raw `POST /calculate` body. Every field is optional here so that
/// validation can report all missing fields at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FootprintSubmission {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub commute_mode: Option<String>,
    #[serde(default)]
    pub commute_distance: Option<f64>,
    #[serde(default)]
    pub food_type: Option<String>,
    #[serde(default)]
    pub takeout_packaging: Option<String>,
    #[serde(default)]
    pub pages_used: Option<u32>,
    #[serde(default)]
    pub reusable_items: Option<u32>,
    #[serde(default)]
    pub participation: Option<String>,
    #[serde(default)]
    pub shopping_habits: Option<String>,
    #[serde(default)]
    pub flights_per_month: Option<u32>,
    #[serde(default)]
    pub train_trips_per_month: Option<u32>,
}

/// Lifestyle answers after validation. This is what the prompt renders.
#[derive(Debug, Clone, PartialEq)]
pub struct LifestyleInputs {
    pub commute_mode: String,
    pub commute_distance: f64,
    pub food_type: String,
    pub takeout_packaging: String,
    pub pages_used: u32,
    pub reusable_items: u32,
    pub participation: String,
    pub shopping_habits: String,
    pub flights_per_month: u32,
    pub train_trips_per_month: u32,
}

/// A validated submission. `username` is present only when it was required.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub username: Option<String>,
    pub inputs: LifestyleInputs,
}

fn text(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn number<T: Default>(value: Option<T>, name: &'static str, missing: &mut Vec<&'static str>) -> T {
    value.unwrap_or_else(|| {
        missing.push(name);
        T::default()
    })
}

impl FootprintSubmission {
    /// Check that every required field is present.
    ///
    /// `require_username` is set when a ledger is configured; the stateless
    /// variant ignores the username entirely.
    pub fn validate(self, require_username: bool) -> Result<ValidSubmission, AppError> {
        let mut missing = Vec::new();

        let username = if require_username {
            Some(text(self.username, "username", &mut missing))
        } else {
            None
        };

        let inputs = LifestyleInputs {
            commute_mode: text(self.commute_mode, "commute_mode", &mut missing),
            commute_distance: number(self.commute_distance, "commute_distance", &mut missing),
            food_type: text(self.food_type, "food_type", &mut missing),
            takeout_packaging: text(self.takeout_packaging, "takeout_packaging", &mut missing),
            pages_used: number(self.pages_used, "pages_used", &mut missing),
            reusable_items: number(self.reusable_items, "reusable_items", &mut missing),
            participation: text(self.participation, "participation", &mut missing),
            shopping_habits: text(self.shopping_habits, "shopping_habits", &mut missing),
            flights_per_month: number(self.flights_per_month, "flights_per_month", &mut missing),
            train_trips_per_month: number(
                self.train_trips_per_month,
                "train_trips_per_month",
                &mut missing,
            ),
        };

        if !missing.is_empty() {
            return Err(AppError::Validation { missing });
        }

        if !inputs.commute_distance.is_finite() || inputs.commute_distance < 0.0 {
            return Err(AppError::InvalidSubmission(
                "commute_distance must be a non-negative number".to_string(),
            ));
        }

        Ok(ValidSubmission { username, inputs })
    }
}

/// Carbon estimate and challenge extracted from the estimator reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintEstimate {
    /// Daily CO₂ in kilograms
    pub carbon: f64,
    pub challenge: String,
}

/// Row of the `points` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserLedgerRecord {
    pub username: String,
    pub points: f64,
    pub prevpts: f64,
    pub updated_at: DateTime<Utc>,
}

/// Query string for `GET /leaderboard`
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

impl LeaderboardQuery {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub points: f64,
}
