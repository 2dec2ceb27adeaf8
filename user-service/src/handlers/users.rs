use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use identity_client::UserInfoUpdate;
use serde_json::Value;
use shared::errors::VALIDATION_FAILED;
use shared::success::{ROLE_ASSIGNED, ROLE_REVOKED, USER_ATTRIBUTE_SET, USER_DELETED, USER_UPDATED};
use shared::{BusinessError, SuccessResponse};
use std::sync::Arc;

use crate::errors::{success, ApiResult};
use crate::models::{AssignRoleRequest, RoleScope, SetAttributeRequest};
use crate::AppState;

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(update): Json<UserInfoUpdate>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state.admin.update_user_info(&user_id, &update).await?;
    Ok(success(SuccessResponse::new(USER_UPDATED)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state.admin.delete_user(&user_id).await?;
    Ok(success(SuccessResponse::new(USER_DELETED)))
}

pub async fn set_attribute(
    State(state): State<Arc<AppState>>,
    Path((user_id, name)): Path<(String, String)>,
    Json(req): Json<SetAttributeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state
        .admin
        .set_user_attribute(&user_id, &name, &req.value)
        .await?;
    Ok(success(SuccessResponse::new(USER_ATTRIBUTE_SET)))
}

pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if req.role.trim().is_empty() {
        return Err(BusinessError::new(VALIDATION_FAILED)
            .with_arg("reason", "role is required")
            .into());
    }

    state
        .admin
        .assign_role(&user_id, &req.role, req.client.as_deref())
        .await?;
    Ok(success(SuccessResponse::new(ROLE_ASSIGNED)))
}

pub async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Path((user_id, role_id)): Path<(String, String)>,
    Query(scope): Query<RoleScope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state
        .admin
        .revoke_role(&user_id, &role_id, scope.client.as_deref())
        .await?;
    Ok(success(SuccessResponse::new(ROLE_REVOKED)))
}
