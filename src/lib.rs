// Library root - exports for integration tests

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use handlers::*;

use database::DatabasePool;
use std::sync::Arc;

// Matches the AppState defined in main.rs
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    pub config: Arc<Config>,
}
