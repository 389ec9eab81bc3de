//! Supported models route
//!
//! Read-only listing of the recognition model catalog. The response is the
//! same fixed ordered list regardless of which model is currently loaded.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ModelsResponse {
    pub supported_models: Vec<String>,
}

/// Create the models router
pub fn router() -> Router<AppState> {
    Router::new().route("/models", get(list_models))
}

/// GET /models
async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        supported_models: state.registry().supported(),
    })
}
