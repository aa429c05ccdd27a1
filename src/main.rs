// Footprint Backend Server
// Estimates daily carbon footprints through a chat-completion model and keeps per-user points

use std::sync::Arc;

use anyhow::Result;
use footprint_backend::config::{Config, LedgerStore};
use footprint_backend::database::{Database, PgLedger};
use footprint_backend::{app_router, AppState, InMemoryLedger, OpenAiClient, PointsLedger};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("footprint_backend=info,sqlx=warn,tower_http=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Footprint Backend Server");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Ledger: {}", config.ledger);
    info!("  Estimator: {} at {}", config.openai_model, config.openai_base_url);
    info!("  Estimator timeout: {:?}", config.estimator_timeout);
    info!("  Server Port: {}", config.port);

    let ledger: Option<Arc<dyn PointsLedger>> = match &config.ledger {
        LedgerStore::Postgres { database_url, max_connections } => {
            let pool = Database::init(database_url, *max_connections).await?;
            Some(Arc::new(PgLedger::new(pool)) as Arc<dyn PointsLedger>)
        }
        LedgerStore::Memory => Some(Arc::new(InMemoryLedger::new()) as Arc<dyn PointsLedger>),
        LedgerStore::Disabled => None,
    };

    let estimator = OpenAiClient::new(
        &config.openai_base_url,
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.estimator_timeout,
    )?;

    let app = app_router(AppState {
        estimator: Arc::new(estimator),
        ledger,
        estimator_timeout: config.estimator_timeout,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Footprint Backend listening on {}", listener.local_addr()?);
    info!("Endpoints:");
    info!("  POST /calculate          - Estimate a daily footprint and record points");
    info!("  GET  /points/:username   - Current points record");
    info!("  GET  /leaderboard        - Lowest footprints first");
    info!("  GET  /health             - Liveness and ledger status");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
