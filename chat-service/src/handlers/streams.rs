use axum::{extract::State, Json};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::AppState;

/// Last known state of every stream the gateway has touched.
pub async fn list_streams(State(state): State<Arc<AppState>>) -> Json<Value> {
    let streams: Map<String, Value> = state
        .gateway
        .registry()
        .snapshot()
        .await
        .into_iter()
        .map(|(name, stream_state)| (name, json!(stream_state)))
        .collect();

    Json(json!({ "streams": streams }))
}
