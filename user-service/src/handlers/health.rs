use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

/// Liveness only; the identity provider is not contacted.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "user-service",
            "version": env!("CARGO_PKG_VERSION"),
            "realm": state.admin.config().realm,
        })),
    )
}
