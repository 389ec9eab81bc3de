//! Route modules for the Scriptor server

pub mod health;
pub mod models;
pub mod ocr;

use axum::Router;

use crate::state::AppState;

/// Assemble all application routes.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(models::router())
        .merge(ocr::router())
}
