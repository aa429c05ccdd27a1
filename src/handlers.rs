// HTTP handlers for the footprint backend

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::{
    FootprintEstimate, FootprintSubmission, LeaderboardEntry, LeaderboardQuery, UserLedgerRecord,
};
use crate::parser::parse_reply;
use crate::prompt::{render_prompt, SYSTEM_INSTRUCTION};
use crate::AppState;

/// Body returned by `POST /calculate`
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub carbon: f64,
    pub challenge: String,
}

impl From<FootprintEstimate> for CalculateResponse {
    fn from(estimate: FootprintEstimate) -> Self {
        Self {
            carbon: estimate.carbon,
            challenge: estimate.challenge,
        }
    }
}

/// Run one submission through the pipeline:
/// validate, render the prompt, ask the estimator, parse, update the ledger.
///
/// Nothing leaves the process before validation passes, and the ledger is
/// touched at most once and only when one is configured.
pub async fn calculate(
    state: &AppState,
    submission: FootprintSubmission,
) -> Result<FootprintEstimate, AppError> {
    let valid = submission.validate(state.ledger.is_some())?;
    let prompt = render_prompt(&valid.inputs);

    let reply = tokio::time::timeout(
        state.estimator_timeout,
        state.estimator.complete(SYSTEM_INSTRUCTION, &prompt),
    )
    .await
    .map_err(|_| AppError::UpstreamTimeout(state.estimator_timeout))??;

    let estimate = parse_reply(&reply)?;

    if let (Some(ledger), Some(username)) = (&state.ledger, valid.username.as_deref()) {
        let record = ledger.record(username, estimate.carbon).await?;
        info!(
            "Recorded footprint for '{}': points={}, prevpts={}",
            record.username, record.points, record.prevpts
        );
    }

    Ok(estimate)
}

/// POST /calculate
pub async fn calculate_footprint(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FootprintSubmission>, JsonRejection>,
) -> Result<Json<CalculateResponse>, AppError> {
    let Json(submission) = payload.map_err(|e| AppError::InvalidSubmission(e.body_text()))?;

    info!(
        "Footprint submission (user={})",
        submission.username.as_deref().unwrap_or("-")
    );

    let estimate = calculate(&state, submission).await?;
    Ok(Json(estimate.into()))
}

/// GET /points/:username
pub async fn get_points(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserLedgerRecord>, AppError> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| AppError::NotFound("points are not recorded on this server".to_string()))?;

    ledger
        .find(&username)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no points recorded for '{}'", username)))
}

/// GET /leaderboard
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidSubmission(e.body_text()))?;

    let Some(ledger) = state.ledger.as_ref() else {
        return Ok(Json(Vec::new()));
    };

    let entries = ledger
        .leaderboard(query.clamped_limit())
        .await?
        .into_iter()
        .enumerate()
        .map(|(i, record)| LeaderboardEntry {
            rank: i + 1,
            username: record.username,
            points: record.points,
        })
        .collect();

    Ok(Json(entries))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ledger_status = match &state.ledger {
        Some(ledger) => {
            if ledger.ping().await {
                "up"
            } else {
                "down"
            }
        }
        None => "disabled",
    };

    Json(json!({
        "status": if ledger_status == "down" { "unhealthy" } else { "healthy" },
        "ledger": ledger_status,
    }))
}
