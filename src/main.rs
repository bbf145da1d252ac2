use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info};

mod config;
mod database;
mod handlers;
mod middleware;
mod models;
mod services;

use config::Config;
use database::DatabasePool;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mudra_api=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting Mudra paper-trading API server...");

    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded");

    let db_pool = database::new_pool(&config.database_url).await?;
    info!("Database connection pool created, migrations applied");

    services::seed_data::seed_if_empty(&db_pool).await?;

    let app_state = AppState {
        db_pool: db_pool.clone(),
        config: config.clone(),
    };

    let started_at = Instant::now();

    let app = Router::new()
        .route("/", get(root))
        .route("/api/health", get(move || health_check(started_at)))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/bonds", get(handlers::get_bonds))
        .route("/api/bonds/:id", get(handlers::get_bond))
        .route("/api/paper-trading/buy", post(handlers::buy_bond))
        .route("/api/paper-trading/sell", post(handlers::sell_bond))
        .route(
            "/api/paper-trading/transactions",
            get(handlers::get_paper_trading_transactions),
        )
        .route("/api/portfolio", get(handlers::get_portfolio))
        .route("/api/portfolio/summary", get(handlers::get_portfolio_summary))
        .route(
            "/api/portfolio/transactions",
            get(handlers::get_recent_transactions),
        )
        .route("/api/transactions", get(handlers::get_transactions))
        .route("/api/transactions/:id", get(handlers::get_transaction))
        .route("/api/leaderboard", get(handlers::get_leaderboard))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth_middleware,
        ))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutting down gracefully...");
        }
    }

    Ok(())
}

async fn root() -> axum::response::Json<serde_json::Value> {
    axum::response::Json(serde_json::json!({
        "message": "Mudra Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/api/health", "/api/bonds", "/api/leaderboard"]
    }))
}

async fn health_check(started_at: Instant) -> axum::response::Json<serde_json::Value> {
    axum::response::Json(serde_json::json!({
        "status": "ok",
        "message": "Mudra Backend is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": started_at.elapsed().as_secs_f64()
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
