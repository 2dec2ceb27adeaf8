use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use shared::errors::VALIDATION_FAILED;
use shared::success::ROLE_CREATED;
use shared::{BusinessError, SuccessResponse};
use std::sync::Arc;

use crate::errors::{success, ApiResult};
use crate::models::CreateRoleRequest;
use crate::AppState;

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if req.name.trim().is_empty() {
        return Err(BusinessError::new(VALIDATION_FAILED)
            .with_arg("reason", "name is required")
            .into());
    }

    state
        .admin
        .add_role(&req.name, &req.description, req.client.as_deref())
        .await?;
    Ok(success(SuccessResponse::new(ROLE_CREATED)))
}
