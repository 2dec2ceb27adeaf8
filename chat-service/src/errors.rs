use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::errors::{MESSAGE_INVALID, MESSAGE_PUBLISH_FAILED, STREAM_NOT_FOUND, STREAM_UNAVAILABLE};
use shared::{BusinessError, Localizer};
use stream_gateway::{BrokerError, GatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    /// The user-facing form of the error.
    pub fn into_business(self) -> BusinessError {
        match self {
            ApiError::Business(err) => err,
            ApiError::Gateway(err) => gateway_to_business(err),
        }
    }
}

fn gateway_to_business(err: GatewayError) -> BusinessError {
    let stream = err.stream().to_string();

    if err.is_unavailable() {
        return BusinessError::new(STREAM_UNAVAILABLE).with_arg("stream", stream);
    }

    match err {
        GatewayError::StreamDoesNotExist { .. }
        | GatewayError::Subscribe {
            source: BrokerError::StreamDoesNotExist,
            ..
        } => BusinessError::new(STREAM_NOT_FOUND).with_arg("stream", stream),
        GatewayError::Encode { source, .. } => {
            BusinessError::new(MESSAGE_INVALID).with_arg("reason", source)
        }
        err @ GatewayError::Broker { operation: "send", .. } => {
            BusinessError::with_error_id(MESSAGE_PUBLISH_FAILED, "publishing message", err)
        }
        err => BusinessError::unexpected("stream gateway", err),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.into_business();
        let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_body(&Localizer::shared());

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
