use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use shared::errors::VALIDATION_FAILED;
use shared::success::MESSAGE_SENT;
use shared::{BusinessError, Localizer, SuccessResponse};
use std::sync::Arc;
use tracing::info;

use crate::errors::ApiResult;
use crate::models::{ChatMessage, SendMessageRequest};
use crate::AppState;

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if let Some(reason) = req.validate() {
        return Err(BusinessError::new(VALIDATION_FAILED)
            .with_arg("reason", reason)
            .into());
    }

    let message = ChatMessage::new(room, req.sender, req.content);
    state.gateway.publish(&message.room, &message).await?;
    info!(room = %message.room, message_id = %message.id, "Message published");

    let response = SuccessResponse::new(MESSAGE_SENT).with_data(json!(message));
    let status = StatusCode::from_u16(response.status()).unwrap_or(StatusCode::OK);
    Ok((status, Json(response.to_body(&Localizer::shared()))))
}
