// Footprint backend: daily carbon footprint estimates and a per-user points ledger

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod database;
pub mod error;
pub mod estimator;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod parser;
pub mod prompt;

pub use error::AppError;
pub use estimator::{ChatCompletion, OpenAiClient};
pub use ledger::{apply_carbon, InMemoryLedger, PointsLedger};

/// Application state shared across handlers
pub struct AppState {
    pub estimator: Arc<dyn ChatCompletion>,
    /// `None` runs the stateless variant: estimates are returned but nothing is stored.
    pub ledger: Option<Arc<dyn PointsLedger>>,
    pub estimator_timeout: Duration,
}

/// Build the router with every endpoint.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/calculate", post(handlers::calculate_footprint))
        .route("/points/:username", get(handlers::get_points))
        .route("/leaderboard", get(handlers::get_leaderboard))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
